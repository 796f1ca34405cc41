// SPDX-License-Identifier: GPL-3.0-only

//! Separable Gaussian blur
//!
//! Border handling: clamp (replicate edge pixels). Every output pixel, including
//! those within `size / 2` of the border, is a full weighted average.

/// Normalized 1D Gaussian kernel with `size` taps
pub fn kernel_1d(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Blur a `width` x `height` luma plane; output is rounded back to u8
pub fn blur(src: &[u8], width: usize, height: usize, size: usize, sigma: f32) -> Vec<u8> {
    if size <= 1 || sigma <= 0.0 {
        return src.to_vec();
    }

    let kernel = kernel_1d(size, sigma);
    let half = (size / 2) as isize;
    let max_x = width as isize - 1;
    let max_y = height as isize - 1;

    // Horizontal pass
    let mut rows = vec![0f32; width * height];
    for y in 0..height {
        let line = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half).clamp(0, max_x) as usize;
                acc += line[sx] as f32 * weight;
            }
            rows[y * width + x] = acc;
        }
    }

    // Vertical pass
    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half).clamp(0, max_y) as usize;
                acc += rows[sy * width + x] * weight;
            }
            out[y * width + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_properties() {
        let k = kernel_1d(5, 1.5);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        // Symmetric and peaked at the center
        assert!((k[0] - k[4]).abs() < 1e-7);
        assert!((k[1] - k[3]).abs() < 1e-7);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn test_flat_stays_flat() {
        let src = vec![200u8; 7 * 5];
        assert_eq!(blur(&src, 7, 5, 5, 1.5), src);
    }

    #[test]
    fn test_impulse_spreads_and_conserves() {
        let mut src = vec![0u8; 9 * 9];
        src[4 * 9 + 4] = 255;
        let out = blur(&src, 9, 9, 5, 1.5);

        let center = out[4 * 9 + 4];
        assert!(center > 0 && center < 255);
        assert!(out[4 * 9 + 5] > 0);
        // Outside the 5x5 footprint nothing changes
        assert_eq!(out[0], 0);
        assert_eq!(out[4 * 9 + 7], 0);
    }

    #[test]
    fn test_clamped_border() {
        // Step at the very edge: clamping replicates the first column so it stays dark
        let mut src = vec![0u8; 8 * 3];
        for y in 0..3 {
            src[y * 8 + 7] = 255;
        }
        let out = blur(&src, 8, 3, 5, 1.5);
        assert_eq!(out[0], 0);
        assert!(out[7] > 128);
    }
}
