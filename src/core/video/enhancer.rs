//! 图像增强 - none / basic / advanced / ultra 四档

use super::filters::{self, BilateralParams, SHARPEN_KERNEL};
use super::frame::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnhanceError {
    #[error("malformed pixel buffer: {actual} bytes for {width}x{height}")]
    MalformedBuffer {
        width: u32,
        height: u32,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementLevel {
    None,
    Basic,
    #[default]
    Advanced,
    Ultra,
}

impl EnhancementLevel {
    /// advanced/ultra 计算量大，交给 worker 线程池
    pub fn is_offloadable(&self) -> bool {
        matches!(self, EnhancementLevel::Advanced | EnhancementLevel::Ultra)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementLevel::None => "none",
            EnhancementLevel::Basic => "basic",
            EnhancementLevel::Advanced => "advanced",
            EnhancementLevel::Ultra => "ultra",
        }
    }
}

impl fmt::Display for EnhancementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BASIC_CONTRAST: f64 = 1.15;
const BASIC_SATURATION: f64 = 1.2;

const ADVANCED_CONTRAST: f64 = 1.15;
const ADVANCED_SATURATION: f64 = 1.3;

const ULTRA_BLUR_SIGMA: f64 = 1.5;
const ULTRA_SHARPEN_AMOUNT: f64 = 1.25;
const ULTRA_CONTRAST: f64 = 1.25;
const ULTRA_SATURATION: f64 = 1.35;

/// Deterministic pixel enhancement. Pure: the input is never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEnhancer;

impl ImageEnhancer {
    pub fn new() -> Self {
        Self
    }

    pub fn enhance(&self, image: &PixelBuffer, level: EnhancementLevel) -> Result<PixelBuffer, EnhanceError> {
        if !image.is_valid() {
            return Err(EnhanceError::MalformedBuffer {
                width: image.width,
                height: image.height,
                actual: image.data.len(),
            });
        }

        let width = image.width as usize;
        let height = image.height as usize;
        let mut out = image.clone();

        match level {
            EnhancementLevel::None => {}
            EnhancementLevel::Basic => {
                filters::contrast_saturation(&mut out.data, BASIC_CONTRAST, BASIC_SATURATION);
            }
            EnhancementLevel::Advanced => {
                filters::sharpen_3x3(&mut out.data, width, height, &SHARPEN_KERNEL);
                filters::contrast_saturation(&mut out.data, ADVANCED_CONTRAST, ADVANCED_SATURATION);
            }
            EnhancementLevel::Ultra => {
                let denoised = filters::bilateral(&image.data, width, height, BilateralParams::default());
                let blurred = filters::gaussian_blur(&denoised, width, height, ULTRA_BLUR_SIGMA);
                filters::unsharp_contrast_saturation(
                    &denoised,
                    &blurred,
                    &mut out.data,
                    ULTRA_SHARPEN_AMOUNT,
                    ULTRA_CONTRAST,
                    ULTRA_SATURATION,
                );
                filters::auto_levels(&mut out.data);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::filled(width, height, [0, 0, 0, 200]);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 180 } else { 60 };
                buffer.set_pixel(x, y, [v, (v / 2) + (x as u8), 255 - v, 200]);
            }
        }
        buffer
    }

    #[test]
    fn test_none_is_identity() {
        let enhancer = ImageEnhancer::new();
        let input = checker(7, 5);
        let once = enhancer.enhance(&input, EnhancementLevel::None).unwrap();
        let twice = enhancer.enhance(&once, EnhancementLevel::None).unwrap();
        assert_eq!(once, input);
        assert_eq!(twice, input);
    }

    #[test]
    fn test_basic_single_pixel() {
        let enhancer = ImageEnhancer::new();
        let input = PixelBuffer::filled(1, 1, [200, 100, 50, 255]);
        let out = enhancer.enhance(&input, EnhancementLevel::Basic).unwrap();
        assert_eq!(out.data, vec![228, 90, 21, 255]);
    }

    #[test]
    fn test_advanced_sharpens_centre() {
        let enhancer = ImageEnhancer::new();
        let mut input = PixelBuffer::filled(3, 3, [100, 100, 100, 255]);
        input.set_pixel(1, 1, [200, 200, 200, 255]);

        let out = enhancer.enhance(&input, EnhancementLevel::Advanced).unwrap();
        assert_eq!(out.pixel(1, 1), [255, 255, 255, 255]);
        assert_eq!(out.pixel(0, 0), [96, 96, 96, 255]);
        assert_eq!(out.pixel(2, 1), [96, 96, 96, 255]);
    }

    #[test]
    fn test_ultra_uniform_stretches_to_white() {
        let enhancer = ImageEnhancer::new();
        let input = PixelBuffer::filled(6, 6, [100, 100, 100, 77]);
        let out = enhancer.enhance(&input, EnhancementLevel::Ultra).unwrap();
        assert!(out.data.chunks_exact(4).all(|px| px == [255, 255, 255, 77]));
    }

    /// 左两列冷色、右三列暖色的 5x4 图，带纵向渐变
    fn two_tone_edge() -> PixelBuffer {
        let mut buffer = PixelBuffer::filled(5, 4, [0, 0, 0, 255]);
        for y in 0..4u8 {
            for x in 0..5u8 {
                let px = if x < 2 {
                    [40 + 7 * y, 90 + 5 * x, 160 - 9 * y, 255]
                } else {
                    [210 - 6 * y, 120 + 11 * x, 30 + 13 * (x + y), 255]
                };
                buffer.set_pixel(x as u32, y as u32, px);
            }
        }
        buffer
    }

    #[test]
    fn test_ultra_textured_golden() {
        let enhancer = ImageEnhancer::new();
        let out = enhancer.enhance(&two_tone_edge(), EnhancementLevel::Ultra).unwrap();

        #[rustfmt::skip]
        let expected: [[u8; 4]; 20] = [
            [0, 47, 225, 255], [0, 2, 255, 255], [255, 251, 0, 255], [255, 228, 0, 255], [248, 236, 32, 255],
            [0, 49, 210, 255], [0, 4, 245, 255], [255, 255, 0, 255], [255, 232, 11, 255], [237, 236, 54, 255],
            [0, 47, 189, 255], [0, 0, 219, 255], [255, 253, 0, 255], [255, 232, 44, 255], [227, 232, 83, 255],
            [1, 47, 172, 255], [0, 2, 200, 255], [255, 249, 24, 255], [252, 239, 70, 255], [217, 239, 100, 255],
        ];
        for (i, px) in expected.iter().enumerate() {
            let (x, y) = ((i % 5) as u32, (i / 5) as u32);
            assert_eq!(out.pixel(x, y), *px, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn test_ultra_denoise_stage_golden() {
        let denoised = filters::bilateral(&two_tone_edge().data, 5, 4, BilateralParams::default());
        let first_row: Vec<u8> = denoised[..20].chunks_exact(4).flat_map(|px| px[..3].to_vec()).collect();
        assert_eq!(
            first_row,
            vec![43, 91, 156, 43, 92, 156, 208, 148, 68, 208, 154, 75, 207, 160, 83]
        );
    }

    #[test]
    fn test_levels_are_pure_and_keep_alpha() {
        let enhancer = ImageEnhancer::new();
        let input = checker(9, 6);
        let snapshot = input.clone();

        for level in [EnhancementLevel::Basic, EnhancementLevel::Advanced, EnhancementLevel::Ultra] {
            let a = enhancer.enhance(&input, level).unwrap();
            let b = enhancer.enhance(&input, level).unwrap();
            assert_eq!(a, b, "{level} not deterministic");
            assert_eq!((a.width, a.height), (9, 6));
            assert!(a.data.chunks_exact(4).all(|px| px[3] == 200), "{level} touched alpha");
        }
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_malformed_buffer_rejected() {
        let enhancer = ImageEnhancer::new();
        let broken = PixelBuffer {
            width: 4,
            height: 4,
            data: vec![0; 10],
        };
        let err = enhancer.enhance(&broken, EnhancementLevel::Basic).unwrap_err();
        assert_eq!(
            err,
            EnhanceError::MalformedBuffer {
                width: 4,
                height: 4,
                actual: 10
            }
        );
    }

    #[test]
    fn test_level_serde() {
        assert_eq!(serde_json::to_string(&EnhancementLevel::Ultra).unwrap(), "\"ultra\"");
        let level: EnhancementLevel = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(level, EnhancementLevel::None);
        assert_eq!(EnhancementLevel::default(), EnhancementLevel::Advanced);
        assert!(EnhancementLevel::Ultra.is_offloadable());
        assert!(!EnhancementLevel::Basic.is_offloadable());
    }
}
