use super::frame::BoundingBox;
use log::warn;
use std::collections::HashMap;

/// 空间网格边长（像素）
pub const GRID_SIZE: f32 = 30.0;

/// Anything the deduplicator can group: a label, a score and a box.
pub trait DedupCandidate {
    fn label(&self) -> &str;
    fn score(&self) -> f32;
    fn bbox(&self) -> BoundingBox;
}

/// 去重键：小写标签 + 网格坐标
///
/// Width is part of the key, height is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridKey {
    pub label: String,
    pub gx: i64,
    pub gy: i64,
    pub gw: i64,
}

impl GridKey {
    pub fn new(label: &str, bbox: &BoundingBox) -> Self {
        Self {
            label: label.to_lowercase(),
            gx: (bbox.x / GRID_SIZE).floor() as i64,
            gy: (bbox.y / GRID_SIZE).floor() as i64,
            gw: (bbox.width / GRID_SIZE).floor() as i64,
        }
    }
}

/// 跨帧目标去重器 - 每个 (标签, 网格) 只保留置信度最高的实例
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectDeduplicator;

impl ObjectDeduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Returns at most one candidate per [`GridKey`], sorted by descending
    /// score. Equal scores keep the earlier candidate. If any candidate has a
    /// non-finite score or box the input is returned unchanged.
    pub fn dedupe<T: DedupCandidate>(&self, mut candidates: Vec<T>) -> Vec<T> {
        if candidates.len() <= 1 {
            return candidates;
        }

        if let Some(bad) = candidates
            .iter()
            .position(|c| !c.score().is_finite() || !c.bbox().is_finite())
        {
            warn!("⚠️ Dedup skipped: candidate {} has non-finite geometry or score", bad);
            return candidates;
        }

        // 稳定排序，同分保持原顺序
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

        // 按小写标签分组，保持首次出现的顺序
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<T>> = HashMap::new();
        for candidate in candidates {
            let label = candidate.label().to_lowercase();
            groups
                .entry(label.clone())
                .or_insert_with(|| {
                    group_order.push(label);
                    Vec::new()
                })
                .push(candidate);
        }

        let mut unique: Vec<T> = Vec::new();
        for label in group_order {
            if let Some(members) = groups.remove(&label) {
                unique.extend(Self::unique_instances(members));
            }
        }

        unique.sort_by(|a, b| b.score().total_cmp(&a.score()));
        unique
    }

    fn unique_instances<T: DedupCandidate>(members: Vec<T>) -> Vec<T> {
        if members.len() <= 1 {
            return members;
        }

        let mut slots: Vec<T> = Vec::new();
        let mut index: HashMap<GridKey, usize> = HashMap::new();

        for candidate in members {
            let key = GridKey::new(candidate.label(), &candidate.bbox());
            match index.get(&key) {
                None => {
                    index.insert(key, slots.len());
                    slots.push(candidate);
                }
                Some(&i) => {
                    if candidate.score() > slots[i].score() {
                        slots[i] = candidate;
                    }
                }
            }
        }

        slots
    }
}
