use crate::core::detect::DetectError;
use crate::core::video::FrameError;
use thiserror::Error;

/// Errors that end a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model load failed: {0}")]
    ModelLoad(DetectError),
    #[error("A scan is already running")]
    Busy,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Frame source error: {0}")]
    Source(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ModelLoad(_) => "model_load",
            PipelineError::Busy => "busy",
            PipelineError::InvalidSettings(_) => "invalid_settings",
            PipelineError::Source(_) => "source",
        }
    }
}

/// 单帧错误：记录日志后按零检测处理，不中断本次扫描
#[derive(Debug, Error)]
pub enum FrameProcessingError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Detect(#[from] DetectError),
}
