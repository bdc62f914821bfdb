use crate::core::detect::{Classification, Detection};
use crate::core::video::{BoundingBox, DedupCandidate, EncodedImage, EnhancementLevel};
use serde::{Deserialize, Serialize};

/// 一个检测目标的裁剪图（增强、编码后）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCrop {
    pub detection: Detection,
    pub image: EncodedImage,
    pub enhancement_level: EnhancementLevel,
    pub refined_label: Option<String>,
    pub subcategories: Vec<Classification>,
}

impl DedupCandidate for ObjectCrop {
    fn label(&self) -> &str {
        &self.detection.label
    }

    fn score(&self) -> f32 {
        self.detection.score
    }

    fn bbox(&self) -> BoundingBox {
        self.detection.bbox
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueObject {
    pub label: String,
    pub confidence: f32,
    pub frame_time: f64,
    pub bbox: BoundingBox,
    pub image: EncodedImage,
    pub enhancement_level: EnhancementLevel,
    pub refined_label: Option<String>,
    pub subcategories: Vec<Classification>,
}

impl From<ObjectCrop> for UniqueObject {
    fn from(crop: ObjectCrop) -> Self {
        Self {
            label: crop.detection.label,
            confidence: crop.detection.score,
            frame_time: crop.detection.frame_time,
            bbox: crop.detection.bbox,
            image: crop.image,
            enhancement_level: crop.enhancement_level,
            refined_label: crop.refined_label,
            subcategories: crop.subcategories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub duration: f64,
    /// First captured frame, JPEG
    pub thumbnail: Option<EncodedImage>,
    pub object_count: usize,
    pub objects: Vec<UniqueObject>,
    pub status: RunStatus,
    pub frames_processed: usize,
    pub frames_failed: usize,
    /// Whether the low-threshold retry pass ran
    pub retried: bool,
}

impl RunResult {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
