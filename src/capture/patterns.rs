// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic test images for the synthetic camera and tests

use crate::frame::{FrameFormat, RawFrame};
use serde::{Deserialize, Serialize};

/// Picture produced by the synthetic camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPattern {
    /// 8x8 pixel black/white blocks
    Checkerboard,
    /// Colour bars scrolling one pixel per frame
    #[default]
    Bars,
    /// Left half black, right half white
    Step,
    /// Uniform mid gray
    Flat,
}

impl std::str::FromStr for TestPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checkerboard" | "checker" => Ok(TestPattern::Checkerboard),
            "bars" => Ok(TestPattern::Bars),
            "step" => Ok(TestPattern::Step),
            "flat" => Ok(TestPattern::Flat),
            other => Err(format!("unknown pattern '{}'", other)),
        }
    }
}

/// Block size of [`TestPattern::Checkerboard`]
pub const CHECKER_BLOCK: usize = 8;

/// Y, U, V of the eight classic colour bars
const BARS_YUV: [(u8, u8, u8); 8] = [
    (235, 128, 128), // white
    (210, 16, 146),  // yellow
    (170, 166, 16),  // cyan
    (145, 54, 34),   // green
    (106, 202, 222), // magenta
    (81, 90, 240),   // red
    (41, 240, 110),  // blue
    (16, 128, 128),  // black
];

/// Checkerboard luma, top-left block black
pub fn checkerboard(width: usize, height: usize, block: usize) -> Vec<u8> {
    let block = block.max(1);
    (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            if ((x / block) + (y / block)) % 2 == 0 { 0 } else { 255 }
        })
        .collect()
}

/// Vertical step: columns `< width / 2` are `low`, the rest `high`
pub fn vertical_step(width: usize, height: usize, low: u8, high: u8) -> Vec<u8> {
    (0..width * height)
        .map(|i| if i % width < width / 2 { low } else { high })
        .collect()
}

/// Render frame `index` of `pattern` in the given 4:2:0 layout
pub fn render(
    pattern: TestPattern,
    width: u32,
    height: u32,
    format: FrameFormat,
    index: u64,
) -> RawFrame {
    let (w, h) = (width as usize, height as usize);
    match pattern {
        TestPattern::Checkerboard => {
            RawFrame::from_luma(width, height, format, &checkerboard(w, h, CHECKER_BLOCK))
        }
        TestPattern::Step => RawFrame::from_luma(width, height, format, &vertical_step(w, h, 0, 255)),
        TestPattern::Flat => RawFrame::from_luma(width, height, format, &vec![128; w * h]),
        TestPattern::Bars => {
            let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
            let bar_width = w.div_ceil(BARS_YUV.len()).max(1);
            let shift = index as usize;
            let bar_at = |x: usize| BARS_YUV[((x + shift) / bar_width) % BARS_YUV.len()];

            let y: Vec<u8> = (0..w * h).map(|i| bar_at(i % w).0).collect();
            let u: Vec<u8> = (0..cw * ch).map(|i| bar_at((i % cw) * 2).1).collect();
            let v: Vec<u8> = (0..cw * ch).map(|i| bar_at((i % cw) * 2).2).collect();
            RawFrame::pack(width, height, format, &y, &u, &v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_blocks() {
        let board = checkerboard(16, 16, 8);
        assert_eq!(board[0], 0);
        assert_eq!(board[7], 0);
        assert_eq!(board[8], 255);
        assert_eq!(board[8 * 16], 255);
        assert_eq!(board[8 * 16 + 8], 0);
    }

    #[test]
    fn test_bars_scroll() {
        let a = render(TestPattern::Bars, 64, 8, FrameFormat::I420, 0);
        let b = render(TestPattern::Bars, 64, 8, FrameFormat::I420, 4);
        assert_ne!(a.planes[0].data, b.planes[0].data);
    }

    #[test]
    fn test_pattern_parsing() {
        assert_eq!("checker".parse::<TestPattern>(), Ok(TestPattern::Checkerboard));
        assert!("noise".parse::<TestPattern>().is_err());
    }
}
