//! 检测后端接口 - 推理实现由宿主或外部库提供

use super::error::DetectError;
use super::result::{Classification, Prediction};
use crate::core::video::{Frame, PixelBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object detector capability.
///
/// `max_results` of `None` leaves the limit to the model; `min_score` of
/// `None` uses the model's own threshold.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        frame: &Frame,
        max_results: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Prediction>, DetectError>;
}

/// 二级分类器：对增强后的裁剪图给出细分类别（按概率降序）
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &PixelBuffer) -> Result<Vec<Classification>, DetectError>;
}

pub trait DetectorLoader: Send + Sync {
    fn load(&self, config: &ModelConfig) -> Result<Box<dyn Detector>, DetectError>;

    /// Loaders without a secondary classifier keep the default.
    fn load_classifier(&self) -> Result<Box<dyn Classifier>, DetectError> {
        Err(DetectError::ModelLoad {
            model: "classifier".to_string(),
            reason: "no secondary classifier available".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Lite,
    Standard,
    #[default]
    Accurate,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Lite => "lite",
            ModelType::Standard => "standard",
            ModelType::Accurate => "accurate",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub model_type: ModelType,
    /// Backbone name passed to the loader
    pub base: String,
    /// 模型自带的最低分数；注册表据此过滤预测
    pub score_threshold: Option<f32>,
    pub secondary_classifier: bool,
}

impl ModelConfig {
    pub fn for_type(model_type: ModelType) -> Self {
        match model_type {
            ModelType::Lite => Self {
                model_type,
                base: "lite_mobilenet_v2".to_string(),
                score_threshold: None,
                secondary_classifier: false,
            },
            ModelType::Standard => Self {
                model_type,
                base: "mobilenet_v2".to_string(),
                score_threshold: None,
                secondary_classifier: false,
            },
            ModelType::Accurate => Self {
                model_type,
                base: "efficientdet/d2".to_string(),
                score_threshold: Some(0.3),
                secondary_classifier: true,
            },
        }
    }
}
