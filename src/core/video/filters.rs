//! 像素滤波器 - RGBA8 缓冲区上的确定性运算
//!
//! 所有写回都经过 [`clamp_byte`]：先截断到 [0, 255] 再按"四舍六入五成双"取整。

use rayon::prelude::*;

/// Quantises a channel value the way a clamped byte array stores it.
/// NaN becomes 0.
#[inline]
pub fn clamp_byte(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0).round_ties_even() as u8
}

#[inline]
fn luma(r: f64, g: f64, b: f64) -> f64 {
    0.3 * r + 0.59 * g + 0.11 * b
}

/// 饱和度：以亮度为中心拉伸每个通道，读取已量化的像素
#[inline]
fn saturate_pixel(px: &mut [u8], saturation: f64) {
    let r = px[0] as f64;
    let g = px[1] as f64;
    let b = px[2] as f64;
    let gray = luma(r, g, b);
    px[0] = clamp_byte(gray + saturation * (r - gray));
    px[1] = clamp_byte(gray + saturation * (g - gray));
    px[2] = clamp_byte(gray + saturation * (b - gray));
}

/// Contrast around 128 followed by saturation, alpha untouched
pub fn contrast_saturation(data: &mut [u8], contrast: f64, saturation: f64) {
    for px in data.chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            *c = clamp_byte((*c as f64 - 128.0) * contrast + 128.0);
        }
        saturate_pixel(px, saturation);
    }
}

/// 3x3 sharpen weights, row-major. Sums to 1.
pub const SHARPEN_KERNEL: [f64; 9] = [-0.1, -0.15, -0.1, -0.15, 2.0, -0.15, -0.1, -0.15, -0.1];

/// Applies `kernel` to interior pixels only, reading from an unmodified copy.
/// Border pixels are left as they are.
pub fn sharpen_3x3(data: &mut [u8], width: usize, height: usize, kernel: &[f64; 9]) {
    if width < 3 || height < 3 {
        return;
    }
    let original = data.to_vec();
    let stride = width * 4;

    data.par_chunks_mut(stride)
        .enumerate()
        .filter(|(y, _)| *y >= 1 && *y < height - 1)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                for c in 0..3 {
                    let mut acc = 0.0;
                    for ky in 0..3 {
                        for kx in 0..3 {
                            let idx = ((y + ky - 1) * width + (x + kx - 1)) * 4 + c;
                            acc += original[idx] as f64 * kernel[ky * 3 + kx];
                        }
                    }
                    row[x * 4 + c] = clamp_byte(acc);
                }
            }
        });
}

#[derive(Debug, Clone, Copy)]
pub struct BilateralParams {
    pub radius: i64,
    pub sigma_space: f64,
    pub sigma_color: f64,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            radius: 2,
            sigma_space: 2.0,
            sigma_color: 25.0,
        }
    }
}

#[inline]
fn clamp_coord(v: i64, len: usize) -> usize {
    v.clamp(0, len as i64 - 1) as usize
}

/// 双边滤波（保边降噪），边缘像素按夹取采样
pub fn bilateral(data: &[u8], width: usize, height: usize, params: BilateralParams) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    if width == 0 || height == 0 {
        return out;
    }

    let r = params.radius;
    let space_denom = 2.0 * params.sigma_space * params.sigma_space;
    let color_denom = 2.0 * params.sigma_color * params.sigma_color;

    // 空间权重只和偏移有关，预先算好
    let side = (2 * r + 1) as usize;
    let spatial: Vec<f64> = (-r..=r)
        .flat_map(|ky| (-r..=r).map(move |kx| (-((kx * kx + ky * ky) as f64) / space_denom).exp()))
        .collect();

    out.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let idx = (y * width + x) * 4;
                let center = [data[idx] as f64, data[idx + 1] as f64, data[idx + 2] as f64];
                let mut sum = [0.0f64; 3];
                let mut total = 0.0;

                for ky in -r..=r {
                    let py = clamp_coord(y as i64 + ky, height);
                    for kx in -r..=r {
                        let px = clamp_coord(x as i64 + kx, width);
                        let p = (py * width + px) * 4;
                        let rgb = [data[p] as f64, data[p + 1] as f64, data[p + 2] as f64];

                        let color_dist: f64 = rgb
                            .iter()
                            .zip(center.iter())
                            .map(|(v, c)| (v - c) * (v - c))
                            .sum();
                        let sw = spatial[(ky + r) as usize * side + (kx + r) as usize];
                        let weight = sw * (-color_dist / color_denom).exp();

                        for c in 0..3 {
                            sum[c] += rgb[c] * weight;
                        }
                        total += weight;
                    }
                }

                let o = x * 4;
                for c in 0..3 {
                    // 中心点权重恒为 1，total > 0；这里是 round-half-up
                    row[o + c] = clamp_byte((sum[c] / total + 0.5).floor());
                }
                row[o + 3] = data[idx + 3];
            }
        });

    out
}

/// Kernel side for a Gaussian of `sigma`: `max(3, ceil(3σ) | 1)`
pub fn gaussian_kernel_size(sigma: f64) -> usize {
    let base = (sigma * 3.0).ceil() as usize;
    (base | 1).max(3)
}

fn gaussian_kernel(sigma: f64) -> (Vec<f64>, usize) {
    let size = gaussian_kernel_size(sigma);
    let half = (size / 2) as i64;
    let denom = 2.0 * sigma * sigma;

    let mut kernel = Vec::with_capacity(size * size);
    for i in 0..size as i64 {
        for j in 0..size as i64 {
            let x = i - half;
            let y = j - half;
            kernel.push((-((x * x + y * y) as f64) / denom).exp());
        }
    }
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    (kernel, size)
}

/// 高斯模糊，边缘夹取，alpha 原样保留
pub fn gaussian_blur(data: &[u8], width: usize, height: usize, sigma: f64) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    if width == 0 || height == 0 {
        return out;
    }

    let (kernel, size) = gaussian_kernel(sigma);
    let half = (size / 2) as i64;
    let kernel_sum: f64 = kernel.iter().sum();

    out.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let o = x * 4;
                for c in 0..3 {
                    let mut acc = 0.0;
                    for ky in -half..=half {
                        let py = clamp_coord(y as i64 + ky, height);
                        for kx in -half..=half {
                            let px = clamp_coord(x as i64 + kx, width);
                            let k = kernel[(ky + half) as usize * size + (kx + half) as usize];
                            acc += data[(py * width + px) * 4 + c] as f64 * k;
                        }
                    }
                    row[o + c] = clamp_byte(acc / kernel_sum);
                }
                row[o + 3] = data[(y * width + x) * 4 + 3];
            }
        });

    out
}

/// Unsharp mask then contrast, quantised once per channel, then saturation.
/// `sharp`, `blurred` and `out` must have the same length.
pub fn unsharp_contrast_saturation(
    sharp: &[u8],
    blurred: &[u8],
    out: &mut [u8],
    amount: f64,
    contrast: f64,
    saturation: f64,
) {
    for ((px, s), b) in out
        .chunks_exact_mut(4)
        .zip(sharp.chunks_exact(4))
        .zip(blurred.chunks_exact(4))
    {
        for c in 0..3 {
            let original = s[c] as f64;
            let v = original + (original - b[c] as f64) * amount;
            px[c] = clamp_byte((v - 128.0) * contrast + 128.0);
        }
        saturate_pixel(px, saturation);
    }
}

/// 自动色阶：每个通道 [min, max] 拉伸到 [0, 255]
///
/// 常量通道把 min 当作 0；全零通道结果为 0（0/0 按 NaN 处理）。
pub fn auto_levels(data: &mut [u8]) {
    let mut min = [255u8; 3];
    let mut max = [0u8; 3];
    for px in data.chunks_exact(4) {
        for c in 0..3 {
            min[c] = min[c].min(px[c]);
            max[c] = max[c].max(px[c]);
        }
    }

    // 空缓冲区：min > max，什么都不做
    if data.len() < 4 {
        return;
    }

    for c in 0..3 {
        if min[c] == max[c] {
            min[c] = 0;
        }
    }

    for px in data.chunks_exact_mut(4) {
        for c in 0..3 {
            let range = max[c] as f64 - min[c] as f64;
            px[c] = clamp_byte(255.0 * (px[c] as f64 - min[c] as f64) / range);
        }
    }
}
