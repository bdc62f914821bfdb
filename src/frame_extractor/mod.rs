//! 视频目标扫描流水线
//!
//! 核心流程：
//! 1. 按时长采样 - 短视频更密
//! 2. 检测 + 裁剪 + 增强 - 每个目标生成一张裁剪图
//! 3. 零结果重试 - 在 0 / 中点 / 末尾用低阈值再检测一次
//! 4. 网格去重 - 同类同位置只保留最高分

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod source;
pub mod state_machine;

pub use config::{ExtractionConfig, ScanSettings};
pub use error::{FrameProcessingError, PipelineError};
pub use pipeline::{AbortSignal, ObjectPipeline, RunGuard};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use result::{ObjectCrop, RunResult, RunStatus, UniqueObject};
pub use source::{BufferedFrameSource, FrameSource};
pub use state_machine::{RunAction, RunEvent, RunState, RunStateMachine};
