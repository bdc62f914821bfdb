//! 目标裁剪 - 在检测框四周留出边距后截取

use super::frame::{BoundingBox, PixelBuffer, PixelRect};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("bounding box {0:?} has non-finite or non-positive geometry")]
    InvalidBox(BoundingBox),
    #[error("bounding box {bbox:?} lies outside the {width}x{height} frame")]
    OutsideFrame {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
}

pub const DEFAULT_MARGIN_RATIO: f32 = 0.15;
pub const DEFAULT_MIN_MARGIN: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct ObjectExtractor {
    margin_ratio: f32,
    min_margin: f32,
}

impl ObjectExtractor {
    pub fn new() -> Self {
        Self {
            margin_ratio: DEFAULT_MARGIN_RATIO,
            min_margin: DEFAULT_MIN_MARGIN,
        }
    }

    /// `min_margin` replaces the 10 px floor
    pub fn with_min_margin(min_margin: f32) -> Self {
        Self {
            min_margin: min_margin.max(0.0),
            ..Self::new()
        }
    }

    pub fn min_margin(&self) -> f32 {
        self.min_margin
    }

    /// Padded source rect for `bbox`, clamped to the frame.
    pub fn source_rect(&self, bbox: &BoundingBox, frame_w: u32, frame_h: u32) -> Result<PixelRect, ExtractError> {
        if !bbox.is_finite() || bbox.width <= 0.0 || bbox.height <= 0.0 {
            return Err(ExtractError::InvalidBox(*bbox));
        }

        let fw = frame_w as f32;
        let fh = frame_h as f32;
        let outside = || ExtractError::OutsideFrame {
            bbox: *bbox,
            width: frame_w,
            height: frame_h,
        };

        if bbox.x >= fw || bbox.y >= fh || bbox.x + bbox.width <= 0.0 || bbox.y + bbox.height <= 0.0 {
            return Err(outside());
        }

        let margin_x = self.min_margin.max(bbox.width * self.margin_ratio);
        let margin_y = self.min_margin.max(bbox.height * self.margin_ratio);

        let sx = (bbox.x - margin_x).max(0.0).floor();
        let sy = (bbox.y - margin_y).max(0.0).floor();
        let sw = (fw - sx).min((bbox.width + margin_x * 2.0).round());
        let sh = (fh - sy).min((bbox.height + margin_y * 2.0).round());

        let rect = PixelRect::new(sx as u32, sy as u32, sw.max(0.0) as u32, sh.max(0.0) as u32);
        if rect.is_empty() {
            return Err(outside());
        }
        Ok(rect)
    }

    /// 按原始分辨率截取，不做缩放
    pub fn extract(&self, frame: &PixelBuffer, bbox: &BoundingBox) -> Result<PixelBuffer, ExtractError> {
        let rect = self.source_rect(bbox, frame.width, frame.height)?;
        Ok(frame.crop(rect))
    }
}

impl Default for ObjectExtractor {
    fn default() -> Self {
        Self::new()
    }
}
