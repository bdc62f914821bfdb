use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectError {
    #[error("Model load failed ({model}): {reason}")]
    ModelLoad { model: String, reason: String },
    #[error("Inference error: {0}")]
    Inference(String),
    #[error("Classification error: {0}")]
    Classification(String),
}
