// SPDX-License-Identifier: GPL-3.0-only

//! 3x3 Sobel gradients
//!
//! ```text
//! gx: [-1 0 1; -2 0 2; -1 0 1]
//! gy: [-1 -2 -1; 0 0 0; 1 2 1]
//! ```
//!
//! Only interior pixels are computed; the 1-pixel frame border stays 0.

/// Horizontal and vertical gradients, unnormalized
pub fn gradients(src: &[u8], width: usize, height: usize) -> (Vec<f32>, Vec<f32>) {
    let mut gx = vec![0f32; width * height];
    let mut gy = vec![0f32; width * height];
    if width < 3 || height < 3 {
        return (gx, gy);
    }

    let at = |x: usize, y: usize| src[y * width + x] as f32;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let tl = at(x - 1, y - 1);
            let tm = at(x, y - 1);
            let tr = at(x + 1, y - 1);
            let ml = at(x - 1, y);
            let mr = at(x + 1, y);
            let bl = at(x - 1, y + 1);
            let bm = at(x, y + 1);
            let br = at(x + 1, y + 1);

            let i = y * width + x;
            gx[i] = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
            gy[i] = (bl + 2.0 * bm + br) - (tl + 2.0 * tm + tr);
        }
    }
    (gx, gy)
}

/// L2 magnitude per pixel, unclamped
pub fn l2_magnitude(gx: &[f32], gy: &[f32]) -> Vec<f32> {
    gx.iter()
        .zip(gy)
        .map(|(x, y)| (x * x + y * y).sqrt())
        .collect()
}

/// Smoothed edge map: `sqrt(gx^2 + gy^2)` clamped to 255
pub fn magnitude(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let (gx, gy) = gradients(src, width, height);
    l2_magnitude(&gx, &gy)
        .into_iter()
        .map(|m| m.round().clamp(0.0, 255.0) as u8)
        .collect()
}
