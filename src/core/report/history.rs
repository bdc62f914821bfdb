//! 扫描历史 - 最新在前，最多保留 20 条，持久化为 JSON 文件

use super::ReportError;
use crate::core::video::EncodedImage;
use crate::frame_extractor::{RunResult, UniqueObject};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub thumbnail: Option<EncodedImage>,
    pub file_name: String,
    pub object_count: usize,
    pub duration: f64,
    pub objects: Vec<UniqueObject>,
}

impl HistoryEntry {
    pub fn from_run(file_name: impl Into<String>, run: &RunResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            thumbnail: run.thumbnail.clone(),
            file_name: file_name.into(),
            object_count: run.object_count,
            duration: run.duration,
            objects: run.objects.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory {
    entries: Vec<HistoryEntry>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the front and drops the oldest entries beyond the limit.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File-backed history. Every mutation is written through immediately.
pub struct HistoryStore {
    path: PathBuf,
    data: RwLock<RunHistory>,
}

impl HistoryStore {
    /// 文件不存在时从空历史开始；内容损坏时丢弃并记录警告
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            match serde_json::from_str::<RunHistory>(&contents) {
                Ok(mut history) => {
                    history.entries.truncate(HISTORY_LIMIT);
                    history
                }
                Err(e) => {
                    warn!("⚠️ History file {} unreadable, starting empty: {}", path.display(), e);
                    RunHistory::default()
                }
            }
        } else {
            RunHistory::default()
        };

        info!("📚 History loaded: {} entries", data.len());
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).entries().to_vec()
    }

    pub fn get(&self, id: Uuid) -> Option<HistoryEntry> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    pub fn record(&self, entry: HistoryEntry) -> Result<(), ReportError> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.push(entry);
        self.persist(&guard)
    }

    pub fn remove(&self, id: Uuid) -> Result<Option<HistoryEntry>, ReportError> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let removed = guard.remove(id);
        if removed.is_some() {
            self.persist(&guard)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), ReportError> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        self.persist(&guard)
    }

    fn persist(&self, data: &RunHistory) -> Result<(), ReportError> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}
