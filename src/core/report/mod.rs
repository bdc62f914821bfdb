//! 扫描结果导出 - JSON 报告、分类统计、时间格式

pub mod history;

pub use history::{HistoryEntry, HistoryStore, RunHistory, HISTORY_LIMIT};

use crate::core::detect::Classification;
use crate::core::video::{BoundingBox, EncodedFormat};
use crate::frame_extractor::{RunResult, ScanSettings, UniqueObject};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const SOFTWARE_NAME: &str = "AI Vision Pro";
pub const REPORT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub date: DateTime<Utc>,
    pub object_count: usize,
    pub software: String,
    pub version: String,
}

/// One object as written to the JSON export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedObject {
    pub class_name: String,
    pub refined_class_name: Option<String>,
    pub confidence: f32,
    pub frame_time: f64,
    pub bbox: BoundingBox,
    pub subcategories: Vec<Classification>,
    /// 编码后的裁剪图字节
    pub image: Vec<u8>,
    pub image_format: EncodedFormat,
}

impl From<&UniqueObject> for ExportedObject {
    fn from(object: &UniqueObject) -> Self {
        Self {
            class_name: object.label.clone(),
            refined_class_name: object.refined_label.clone(),
            confidence: object.confidence,
            frame_time: object.frame_time,
            bbox: object.bbox,
            subcategories: object.subcategories.clone(),
            image: object.image.bytes.clone(),
            image_format: object.image.format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub metadata: ReportMetadata,
    pub settings: ScanSettings,
    pub objects: Vec<ExportedObject>,
}

impl JsonReport {
    pub fn from_run(run: &RunResult, settings: &ScanSettings) -> Self {
        Self::from_run_at(run, settings, Utc::now())
    }

    pub fn from_run_at(run: &RunResult, settings: &ScanSettings, date: DateTime<Utc>) -> Self {
        Self {
            metadata: ReportMetadata {
                date,
                object_count: run.objects.len(),
                software: SOFTWARE_NAME.to_string(),
                version: REPORT_VERSION.to_string(),
            },
            settings: settings.clone(),
            objects: run.objects.iter().map(ExportedObject::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!("📝 Report written: {} ({} objects)", path.display(), self.objects.len());
        Ok(())
    }
}

/// 每个类别的目标数，按类别名排序
pub fn category_counts(objects: &[UniqueObject]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for object in objects {
        *counts.entry(object.label.clone()).or_insert(0) += 1;
    }
    counts
}

/// `m:ss`, seconds rounded down. Negative or non-finite input shows as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
