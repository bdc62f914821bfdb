//! 检测前预处理 - 3x3 均值降噪 + 亮度归一化

use super::filters::clamp_byte;
use super::frame::PixelBuffer;

const TARGET_BRIGHTNESS: f64 = 128.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct FramePreparer;

impl FramePreparer {
    pub fn new() -> Self {
        Self
    }

    pub fn average_brightness(image: &PixelBuffer) -> f64 {
        let count = image.pixel_count();
        if count == 0 {
            return 0.0;
        }
        let total: f64 = image
            .data
            .chunks_exact(4)
            .map(|px| (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0)
            .sum();
        total / count as f64
    }

    /// Interior pixels become the brightness-scaled 3x3 mean; the one-pixel
    /// border is black. Alpha is always 255.
    pub fn prepare(&self, image: &PixelBuffer) -> PixelBuffer {
        let width = image.width as usize;
        let height = image.height as usize;
        let mut out = PixelBuffer::filled(image.width, image.height, [0, 0, 0, 255]);
        if !image.is_valid() || width < 3 || height < 3 {
            return out;
        }

        let ratio = TARGET_BRIGHTNESS / Self::average_brightness(image).max(1.0);
        let src = &image.data;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let idx = (y * width + x) * 4;
                for c in 0..3 {
                    let mut sum = 0u32;
                    for dy in 0..3 {
                        for dx in 0..3 {
                            sum += src[((y + dy - 1) * width + (x + dx - 1)) * 4 + c] as u32;
                        }
                    }
                    out.data[idx + c] = clamp_byte(sum as f64 / 9.0 * ratio);
                }
            }
        }

        out
    }
}
