use crate::core::video::{BoundingBox, DedupCandidate};
use serde::{Deserialize, Serialize};

/// Raw detector output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
    pub bbox: BoundingBox,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }
}

/// 单帧检测结果（带时间戳）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub score: f32,
    pub bbox: BoundingBox,
    pub frame_time: f64,
}

impl Detection {
    pub fn from_prediction(prediction: Prediction, frame_time: f64) -> Self {
        Self {
            label: prediction.label,
            score: prediction.score,
            bbox: prediction.bbox,
            frame_time,
        }
    }
}

impl DedupCandidate for Detection {
    fn label(&self) -> &str {
        &self.label
    }

    fn score(&self) -> f32 {
        self.score
    }

    fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}

/// 二级分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,
    pub probability: f32,
}

impl Classification {
    pub fn new(name: impl Into<String>, probability: f32) -> Self {
        Self {
            name: name.into(),
            probability,
        }
    }

    /// Classifier names look like "tabby, tabby cat"; keep the first part.
    pub fn short_name(raw: &str) -> String {
        raw.split(',').next().unwrap_or(raw).trim().to_string()
    }
}
