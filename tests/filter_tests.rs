// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for conversion and edge detection

use openedge::capture::TestPattern;
use openedge::capture::patterns;
use openedge::convert;
use openedge::filter::{self, CannyParams, EdgeVariant, canny};
use openedge::frame::{EdgeMap, FrameFormat, RawFrame};

fn edges_of(frame: &RawFrame, variant: EdgeVariant) -> EdgeMap {
    let luma = convert::to_luma(frame).expect("convertible frame");
    filter::detect_edges(&luma, variant, &CannyParams::default()).expect("large enough frame")
}

#[test]
fn test_any_valid_frame_yields_full_size_map() {
    let sizes = [(3, 3), (4, 7), (17, 9), (64, 48)];
    let formats = [FrameFormat::I420, FrameFormat::Nv12, FrameFormat::Nv21];
    let patterns = [
        TestPattern::Checkerboard,
        TestPattern::Bars,
        TestPattern::Step,
        TestPattern::Flat,
    ];

    for &(w, h) in &sizes {
        for &format in &formats {
            for &pattern in &patterns {
                let frame = patterns::render(pattern, w, h, format, 3);
                let edges = edges_of(&frame, EdgeVariant::Sobel);
                assert_eq!(
                    edges.data.len(),
                    (w * h) as usize,
                    "{}x{} {} {:?}",
                    w,
                    h,
                    format,
                    pattern
                );
            }
        }
    }
}

#[test]
fn test_flat_frame_has_no_edges() {
    for value in [0u8, 77, 128, 255] {
        let frame = RawFrame::from_luma(32, 24, FrameFormat::Nv21, &vec![value; 32 * 24]);
        for variant in EdgeVariant::ALL {
            let edges = edges_of(&frame, variant);
            assert_eq!(edges.count_nonzero(), 0, "value {} under {}", value, variant);
        }
    }
}

#[test]
fn test_vertical_step_sobel() {
    let (w, h) = (32u32, 16u32);
    let frame = patterns::render(TestPattern::Step, w, h, FrameFormat::I420, 0);
    let edges = edges_of(&frame, EdgeVariant::Sobel);

    for y in 0..h {
        for x in 0..w {
            let value = edges.get(x, y);
            let interior = y > 0 && y < h - 1 && x > 0 && x < w - 1;
            if interior && (x == 15 || x == 16) {
                assert_eq!(value, 255, "step response at ({}, {})", x, y);
            } else {
                assert_eq!(value, 0, "no response at ({}, {})", x, y);
            }
        }
    }
}

#[test]
fn test_vertical_step_canny_is_thin_line() {
    let (w, h) = (32u32, 16u32);
    let frame = patterns::render(TestPattern::Step, w, h, FrameFormat::Nv12, 0);
    let edges = edges_of(&frame, EdgeVariant::Canny);

    let mut columns = Vec::new();
    for y in 1..h - 1 {
        let row: Vec<u32> = (0..w).filter(|&x| edges.get(x, y) > 0).collect();
        assert_eq!(row.len(), 1, "row {} should hold exactly one edge pixel: {:?}", y, row);
        assert!((14..=17).contains(&row[0]), "edge at column {}", row[0]);
        columns.push(row[0]);
    }
    // One straight, connected line
    assert!(columns.windows(2).all(|pair| pair[0].abs_diff(pair[1]) <= 1));

    for x in (0..12).chain(20..w) {
        for y in 0..h {
            assert_eq!(edges.get(x, y), 0);
        }
    }
}

#[test]
fn test_hysteresis_threshold_boundaries() {
    // Row 1: strong 151 followed by 150, 50 and 49; a lone weak 150 at the end.
    // Row 3: a lone strong 151.
    let (w, h) = (8, 5);
    let mut magnitude = vec![0.0f32; w * h];
    let row = w;
    magnitude[row] = 151.0;
    magnitude[row + 1] = 150.0;
    magnitude[row + 2] = 50.0;
    magnitude[row + 3] = 49.0;
    magnitude[row + 7] = 150.0;
    magnitude[3 * w + 5] = 151.0;

    let out = canny::hysteresis(&magnitude, w, h, 50.0, 150.0);

    assert_eq!(out[row], 255, "151 is always kept");
    assert_eq!(out[row + 1], 255, "150 connected to a strong pixel is kept");
    assert_eq!(out[row + 2], 255, "50 connected through weak pixels is kept");
    assert_eq!(out[row + 3], 0, "49 is below the low threshold");
    assert_eq!(out[row + 7], 0, "unconnected weak pixel is dropped");
    assert_eq!(out[3 * w + 5], 255, "isolated strong pixel is kept");
    assert_eq!(out.iter().filter(|&&v| v > 0).count(), 4);
}

#[test]
fn test_checkerboard_edges_at_block_boundaries() {
    let frame = patterns::render(TestPattern::Checkerboard, 64, 64, FrameFormat::I420, 0);
    let edges = edges_of(&frame, EdgeVariant::Sobel);
    let on_boundary = |v: u32| v % 8 == 0 || v % 8 == 7;

    for y in 0..64 {
        for x in 0..64 {
            let value = edges.get(x, y);
            if x == 0 || y == 0 || x == 63 || y == 63 {
                assert_eq!(value, 0, "border pixel ({}, {})", x, y);
            } else if on_boundary(x) || on_boundary(y) {
                assert!(value > 0, "boundary pixel ({}, {}) has no response", x, y);
            } else {
                assert_eq!(value, 0, "block interior ({}, {})", x, y);
            }
        }
    }
}

#[test]
fn test_semi_planar_orders_agree_on_luma() {
    let a = patterns::render(TestPattern::Bars, 24, 10, FrameFormat::Nv12, 5);
    let b = patterns::render(TestPattern::Bars, 24, 10, FrameFormat::Nv21, 5);
    let c = patterns::render(TestPattern::Bars, 24, 10, FrameFormat::I420, 5);

    let luma = convert::to_luma(&a).unwrap();
    assert_eq!(luma, convert::to_luma(&b).unwrap());
    assert_eq!(luma, convert::to_luma(&c).unwrap());

    // Colour survives whichever chroma order the planes describe
    let rgba = convert::to_rgba(&a).unwrap();
    assert_eq!(rgba, convert::to_rgba(&b).unwrap());
    assert_eq!(rgba, convert::to_rgba(&c).unwrap());
}
