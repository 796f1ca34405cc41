// SPDX-License-Identifier: GPL-3.0-only

//! Canny edge detector
//!
//! blur -> Sobel gradients -> non-maximum suppression -> hysteresis.
//!
//! Threshold semantics: a magnitude above `high` is a strong edge, one in
//! `[low, high]` is weak and survives only when 8-connected (possibly through other
//! weak pixels) to a strong edge, anything below `low` is dropped.

use super::CannyParams;
use super::gaussian;
use super::sobel;

const EDGE: u8 = 255;

/// tan(22.5°) and tan(67.5°) for direction quantization
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_7;

/// Full pipeline on a `width` x `height` luma plane; output is 0 / 255
pub fn detect(src: &[u8], width: usize, height: usize, params: &CannyParams) -> Vec<u8> {
    let blurred = gaussian::blur(src, width, height, params.blur_size, params.blur_sigma);
    let (gx, gy) = sobel::gradients(&blurred, width, height);
    let magnitude = sobel::l2_magnitude(&gx, &gy);
    let thinned = non_max_suppression(&magnitude, &gx, &gy, width, height);
    hysteresis(
        &thinned,
        width,
        height,
        params.low_threshold,
        params.high_threshold,
    )
}

/// Keep only pixels that are local maxima across the gradient direction
///
/// The direction is quantized to 0/45/90/135 degrees. A pixel must be strictly
/// greater than its "previous" neighbor and at least equal to its "next" one, so a
/// perfectly symmetric two-pixel ridge keeps exactly one pixel.
pub fn non_max_suppression(
    magnitude: &[f32],
    gx: &[f32],
    gy: &[f32],
    width: usize,
    height: usize,
) -> Vec<f32> {
    let mut out = vec![0f32; width * height];
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let m = magnitude[i];
            if m == 0.0 {
                continue;
            }

            let (dx, dy) = (gx[i], gy[i]);
            let (ax, ay) = (dx.abs(), dy.abs());

            let (prev, next) = if ay <= ax * TAN_22_5 {
                // Gradient roughly horizontal: compare left/right
                (magnitude[i - 1], magnitude[i + 1])
            } else if ay >= ax * TAN_67_5 {
                // Roughly vertical: compare up/down
                (magnitude[i - width], magnitude[i + width])
            } else if (dx > 0.0) == (dy > 0.0) {
                // Down-right diagonal (y grows downward)
                (magnitude[i - width - 1], magnitude[i + width + 1])
            } else {
                (magnitude[i - width + 1], magnitude[i + width - 1])
            };

            if m > prev && m >= next {
                out[i] = m;
            }
        }
    }
    out
}

/// Double-threshold hysteresis over a magnitude field
///
/// Strong pixels seed a flood fill through 8-connected weak pixels.
pub fn hysteresis(magnitude: &[f32], width: usize, height: usize, low: f32, high: f32) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    let mut stack: Vec<usize> = magnitude
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > high)
        .map(|(i, _)| i)
        .collect();

    for &i in &stack {
        out[i] = EDGE;
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % width) as isize, (i / width) as isize);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let j = ny as usize * width + nx as usize;
                if out[j] == 0 && magnitude[j] >= low && magnitude[j] <= high {
                    out[j] = EDGE;
                    stack.push(j);
                }
            }
        }
    }
    out
}
