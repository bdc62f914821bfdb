use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("seek to {time:.2}s failed: {reason}")]
    Seek { time: f64, reason: String },
    #[error("no frame available at {0:.2}s")]
    Unavailable(f64),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// RGBA8 像素缓冲区（行优先，每像素 4 字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let buffer = Self {
            width,
            height,
            data,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::expected_len(width, height))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FrameError::InvalidBuffer {
                width: self.width,
                height: self.height,
                expected: Self::expected_len(self.width, self.height),
                actual: self.data.len(),
            })
        }
    }

    /// Byte offset of pixel (x, y)
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = self.offset(x, y);
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = self.offset(x, y);
        self.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Copies `rect` out of the buffer. The rect is clipped to the buffer bounds.
    pub fn crop(&self, rect: PixelRect) -> PixelBuffer {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let w = rect.width.min(self.width - x0);
        let h = rect.height.min(self.height - y0);

        let mut data = Vec::with_capacity(Self::expected_len(w, h));
        for y in y0..y0 + h {
            let start = self.offset(x0, y);
            data.extend_from_slice(&self.data[start..start + w as usize * 4]);
        }

        PixelBuffer {
            width: w,
            height: h,
            data,
        }
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<EncodedImage, FrameError> {
        // JPEG 不支持 alpha，先转 RGB
        let rgb = DynamicImage::ImageRgba8(self.to_rgba_image()?).to_rgb8();
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(EncodedImage {
            format: EncodedFormat::Jpeg,
            width: self.width,
            height: self.height,
            bytes: buffer.into_inner(),
        })
    }

    pub fn encode_png(&self) -> Result<EncodedImage, FrameError> {
        let mut buffer = Cursor::new(Vec::new());
        self.to_rgba_image()?
            .write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(EncodedImage {
            format: EncodedFormat::Png,
            width: self.width,
            height: self.height,
            bytes: buffer.into_inner(),
        })
    }

    fn to_rgba_image(&self) -> Result<RgbaImage, FrameError> {
        self.validate()?;
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::InvalidBuffer {
                width: self.width,
                height: self.height,
                expected: Self::expected_len(self.width, self.height),
                actual: self.data.len(),
            },
        )
    }
}

/// 采样帧
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: PixelBuffer,
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(pixels: PixelBuffer, timestamp_secs: f64, frame_number: u64) -> Self {
        Self {
            pixels,
            timestamp: Duration::try_from_secs_f64(timestamp_secs.max(0.0)).unwrap_or_default(),
            frame_number,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width
    }

    pub fn height(&self) -> u32 {
        self.pixels.height
    }

    pub fn time_secs(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }
}

/// Bounding box in source-frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

impl From<PixelRect> for BoundingBox {
    fn from(rect: PixelRect) -> Self {
        Self::new(
            rect.x as f32,
            rect.y as f32,
            rect.width as f32,
            rect.height as f32,
        )
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodedFormat {
    Jpeg,
    Png,
}

/// 编码后的图像（JPEG/PNG）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub format: EncodedFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}
