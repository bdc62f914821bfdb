//! 块匹配跟踪 - 在下一帧的邻域内穷举搜索最相似的位置

use super::frame::{PixelBuffer, PixelRect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("frame sizes differ: {0}x{1} vs {2}x{3}")]
    SizeMismatch(u32, u32, u32, u32),
    #[error("malformed pixel buffer")]
    MalformedBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    pub bbox: PixelRect,
    /// Mean per-channel similarity / 255, in [0, 1]
    pub confidence: f32,
}

const MIN_SEARCH_MARGIN: u32 = 10;
const SEARCH_MARGIN_RATIO: f32 = 0.2;
const SAMPLE_STEP: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectTracker;

impl ObjectTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn search_margin(width: u32, height: u32) -> u32 {
        MIN_SEARCH_MARGIN.max((width.max(height) as f32 * SEARCH_MARGIN_RATIO).floor() as u32)
    }

    /// Estimates where `prev_bbox` moved to in `curr`.
    ///
    /// Ties keep the first position in row-major order; when nothing scores
    /// above zero the previous position is returned.
    pub fn track(&self, prev: &PixelBuffer, curr: &PixelBuffer, prev_bbox: PixelRect) -> Result<TrackResult, TrackError> {
        if !prev.is_valid() || !curr.is_valid() {
            return Err(TrackError::MalformedBuffer);
        }
        if prev.width != curr.width || prev.height != curr.height {
            return Err(TrackError::SizeMismatch(prev.width, prev.height, curr.width, curr.height));
        }

        let frame_w = prev.width;
        let frame_h = prev.height;

        // 模板限制在画面内
        let x = prev_bbox.x.min(frame_w);
        let y = prev_bbox.y.min(frame_h);
        let w = prev_bbox.width.min(frame_w - x);
        let h = prev_bbox.height.min(frame_h - y);

        let mut best = TrackResult {
            bbox: PixelRect::new(x, y, w, h),
            confidence: 0.0,
        };
        if w == 0 || h == 0 {
            return Ok(best);
        }

        let margin = Self::search_margin(w, h);
        let search_x = x.saturating_sub(margin);
        let search_y = y.saturating_sub(margin);
        let search_w = (frame_w - search_x).min(w + 2 * margin);
        let search_h = (frame_h - search_y).min(h + 2 * margin);

        let mut best_similarity = 0.0f64;
        for ty in search_y..=search_y + search_h - h {
            for tx in search_x..=search_x + search_w - w {
                let similarity = Self::similarity(prev, curr, x, y, tx, ty, w, h);
                if similarity > best_similarity {
                    best_similarity = similarity;
                    best.bbox = PixelRect::new(tx, ty, w, h);
                }
            }
        }

        best.confidence = (best_similarity / 255.0) as f32;
        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    fn similarity(prev: &PixelBuffer, curr: &PixelBuffer, x: u32, y: u32, tx: u32, ty: u32, w: u32, h: u32) -> f64 {
        let mut total = 0u64;
        let mut count = 0u64;

        for sy in (0..h).step_by(SAMPLE_STEP) {
            for sx in (0..w).step_by(SAMPLE_STEP) {
                let a = prev.offset(x + sx, y + sy);
                let b = curr.offset(tx + sx, ty + sy);
                for c in 0..3 {
                    let diff = (prev.data[a + c] as i32 - curr.data[b + c] as i32).unsigned_abs();
                    total += (255 - diff) as u64;
                }
                count += 3;
            }
        }

        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }
}
