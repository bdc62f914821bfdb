use crate::core::detect::Prediction;
use crate::core::report::{HistoryEntry, ReportError};
use crate::core::video::{BoundingBox, EnhanceError, FrameError, TrackError};
use crate::frame_extractor::{PipelineError, RunResult, RunStatus, UniqueObject};
use serde::{Deserialize, Serialize};

/// 扫描 API 错误类型，FRB 友好的设计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanApiError {
    pub error_type: String,
    pub message: String,
}

impl ScanApiError {
    pub(crate) fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn no_result() -> Self {
        Self::new("NoResult", "没有可导出的扫描结果")
    }
}

impl std::fmt::Display for ScanApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ScanApiError {}

impl From<PipelineError> for ScanApiError {
    fn from(e: PipelineError) -> Self {
        let error_type = match e {
            PipelineError::ModelLoad(_) => "ModelLoad",
            PipelineError::Busy => "Busy",
            PipelineError::InvalidSettings(_) => "InvalidSettings",
            PipelineError::Source(_) => "Source",
        };
        Self::new(error_type, e.to_string())
    }
}

impl From<ReportError> for ScanApiError {
    fn from(e: ReportError) -> Self {
        Self::new("Report", e.to_string())
    }
}

impl From<FrameError> for ScanApiError {
    fn from(e: FrameError) -> Self {
        Self::new("Frame", e.to_string())
    }
}

impl From<EnhanceError> for ScanApiError {
    fn from(e: EnhanceError) -> Self {
        Self::new("Enhance", e.to_string())
    }
}

impl From<TrackError> for ScanApiError {
    fn from(e: TrackError) -> Self {
        Self::new("Track", e.to_string())
    }
}

/// 宿主端模型对某一帧给出的原始预测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPrediction {
    pub label: String,
    pub score: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<HostPrediction> for Prediction {
    fn from(p: HostPrediction) -> Self {
        Prediction::new(p.label, p.score, BoundingBox::new(p.x, p.y, p.width, p.height))
    }
}

/// 宿主已解码的一帧 RGBA + 该帧的预测
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub timestamp: f64,
    pub frame_number: u64,
    pub predictions: Vec<HostPrediction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanObject {
    pub label: String,
    pub refined_label: Option<String>,
    pub subcategories: Vec<String>,
    pub confidence: f32,
    pub frame_time: f64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub jpeg_data: Vec<u8>,
}

impl From<&UniqueObject> for ScanObject {
    fn from(o: &UniqueObject) -> Self {
        Self {
            label: o.label.clone(),
            refined_label: o.refined_label.clone(),
            subcategories: o.subcategories.iter().map(|c| c.name.clone()).collect(),
            confidence: o.confidence,
            frame_time: o.frame_time,
            x: o.bbox.x,
            y: o.bbox.y,
            width: o.bbox.width,
            height: o.bbox.height,
            jpeg_data: o.image.bytes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub duration: f64,
    pub aborted: bool,
    pub retried: bool,
    pub frames_processed: u32,
    pub frames_failed: u32,
    pub thumbnail: Option<Vec<u8>>,
    pub objects: Vec<ScanObject>,
    pub categories: Vec<CategoryCount>,
}

impl From<&RunResult> for ScanReport {
    fn from(run: &RunResult) -> Self {
        Self {
            duration: run.duration,
            aborted: run.status == RunStatus::Aborted,
            retried: run.retried,
            frames_processed: run.frames_processed as u32,
            frames_failed: run.frames_failed as u32,
            thumbnail: run.thumbnail.as_ref().map(|t| t.bytes.clone()),
            objects: run.objects.iter().map(ScanObject::from).collect(),
            categories: crate::core::report::category_counts(&run.objects)
                .into_iter()
                .map(|(label, count)| CategoryCount {
                    label,
                    count: count as u32,
                })
                .collect(),
        }
    }
}

/// 历史列表项（不含目标图片）
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub id: String,
    pub date: String,
    pub file_name: String,
    pub object_count: u32,
    pub duration: f64,
    pub thumbnail: Option<Vec<u8>>,
}

impl From<&HistoryEntry> for HistoryItem {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            id: e.id.to_string(),
            date: e.date.to_rfc3339(),
            file_name: e.file_name.clone(),
            object_count: e.object_count as u32,
            duration: e.duration,
            thumbnail: e.thumbnail.as_ref().map(|t| t.bytes.clone()),
        }
    }
}
