// SPDX-License-Identifier: GPL-3.0-only

//! YUV 4:2:0 to luma / RGBA conversion
//!
//! All readers honor per-plane `row_stride` and `pixel_stride`, so padded rows and
//! interleaved chroma (NV12/NV21) go through the same code as tightly packed I420.
//! Inputs are never mutated.

use crate::errors::ConvertError;
use crate::frame::{EdgeMap, LumaBuffer, RawFrame, RgbaBuffer};

/// Check that a frame can be read safely with its declared geometry
pub fn validate(frame: &RawFrame) -> Result<(), ConvertError> {
    if !frame.format.is_yuv420() {
        return Err(ConvertError::UnsupportedFormat(format!(
            "{} is not a 4:2:0 YUV layout",
            frame.format
        )));
    }
    if frame.planes.len() != 3 {
        return Err(ConvertError::UnsupportedFormat(format!(
            "expected 3 planes, got {}",
            frame.planes.len()
        )));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(ConvertError::DimensionMismatch(format!(
            "{}x{} frame",
            frame.width, frame.height
        )));
    }

    let (w, h) = (frame.width as usize, frame.height as usize);
    let (cw, ch) = frame.chroma_size();

    for (index, plane) in frame.planes.iter().enumerate() {
        let (cols, rows) = if index == 0 { (w, h) } else { (cw, ch) };
        let allowed = if index == 0 { 1..=1 } else { 1..=2 };
        if !allowed.contains(&plane.pixel_stride) {
            return Err(ConvertError::UnsupportedFormat(format!(
                "plane {} pixel stride {}",
                index, plane.pixel_stride
            )));
        }
        if plane.row_stride < (cols - 1) * plane.pixel_stride + 1 {
            return Err(ConvertError::DimensionMismatch(format!(
                "plane {} row stride {} too small for {} samples",
                index, plane.row_stride, cols
            )));
        }
        let Some(required) = plane.required_len(cols, rows) else {
            return Err(ConvertError::DimensionMismatch(format!(
                "plane {} row stride {} overflows {} rows",
                index, plane.row_stride, rows
            )));
        };
        if plane.offset > plane.data.len() || plane.len() < required {
            return Err(ConvertError::DimensionMismatch(format!(
                "plane {} holds {} bytes past offset {}, {}x{} needs {}",
                index,
                plane.len(),
                plane.offset,
                cols,
                rows,
                required
            )));
        }
    }

    Ok(())
}

/// Copy plane 0 into a dense luma buffer, dropping row padding
pub fn to_luma(frame: &RawFrame) -> Result<LumaBuffer, ConvertError> {
    validate(frame)?;

    let (w, h) = (frame.width as usize, frame.height as usize);
    let y_plane = &frame.planes[0];

    let data = if y_plane.row_stride == w && y_plane.offset == 0 {
        y_plane.data[..w * h].to_vec()
    } else {
        let mut data = Vec::with_capacity(w * h);
        for row in 0..h {
            let bytes = y_plane.row(row, w).ok_or_else(|| {
                ConvertError::DimensionMismatch(format!("luma row {} out of bounds", row))
            })?;
            data.extend_from_slice(bytes);
        }
        data
    };

    Ok(LumaBuffer::new(frame.width, frame.height, data))
}

/// Full-color conversion (BT.601, full range)
pub fn to_rgba(frame: &RawFrame) -> Result<RgbaBuffer, ConvertError> {
    validate(frame)?;

    let (w, h) = (frame.width as usize, frame.height as usize);
    let (y_plane, u_plane, v_plane) = (&frame.planes[0], &frame.planes[1], &frame.planes[2]);
    let mut rgba = Vec::with_capacity(w * h * 4);

    for row in 0..h {
        for col in 0..w {
            let y = y_plane.sample(col, row) as f32;
            let u = u_plane.sample(col / 2, row / 2) as f32 - 128.0;
            let v = v_plane.sample(col / 2, row / 2) as f32 - 128.0;
            rgba.extend_from_slice(&yuv_to_rgba(y, u, v));
        }
    }

    Ok(RgbaBuffer::new(frame.width, frame.height, rgba))
}

#[inline]
fn yuv_to_rgba(y: f32, u: f32, v: f32) -> [u8; 4] {
    let r = (y + 1.402 * v).round().clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).round().clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).round().clamp(0.0, 255.0) as u8;
    [r, g, b, 255]
}

/// Gray as RGBA (R = G = B = luma, A = 255)
pub fn luma_to_rgba(luma: &LumaBuffer) -> RgbaBuffer {
    RgbaBuffer::new(luma.width, luma.height, expand_gray(&luma.data))
}

/// Edge map as RGBA, white where the response is 255 and black where it is 0
pub fn edges_to_rgba(edges: &EdgeMap) -> RgbaBuffer {
    RgbaBuffer::new(edges.width, edges.height, expand_gray(&edges.data))
}

fn expand_gray(values: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(values.len() * 4);
    for &v in values {
        rgba.extend_from_slice(&[v, v, v, 255]);
    }
    rgba
}

/// Luma from already-decoded RGBA (BT.601 weights)
pub fn rgba_to_luma(rgba: &RgbaBuffer) -> Result<LumaBuffer, ConvertError> {
    let expected = rgba.width as usize * rgba.height as usize * 4;
    if rgba.width == 0 || rgba.height == 0 || rgba.data.len() != expected {
        return Err(ConvertError::DimensionMismatch(format!(
            "{}x{} RGBA with {} bytes",
            rgba.width,
            rgba.height,
            rgba.data.len()
        )));
    }

    let data = rgba
        .data
        .chunks_exact(4)
        .map(|px| {
            let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    Ok(LumaBuffer::new(rgba.width, rgba.height, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameFormat, Plane};
    use std::sync::Arc;

    #[test]
    fn test_luma_drops_row_padding() {
        // 3x2 luma stored with a 5 byte row stride
        let y: Arc<[u8]> = Arc::from(vec![1u8, 2, 3, 0, 0, 4, 5, 6, 0, 0]);
        let chroma: Arc<[u8]> = Arc::from(vec![128u8; 2]);
        let frame = RawFrame::new(
            3,
            2,
            FrameFormat::I420,
            vec![
                Plane::new(y, 0, 5, 1),
                Plane::new(chroma.clone(), 0, 2, 1),
                Plane::new(chroma, 0, 2, 1),
            ],
        );

        let luma = to_luma(&frame).unwrap();
        assert_eq!(luma.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_luma_ignores_chroma_layout() {
        let y: Vec<u8> = (0..16).collect();
        for format in [FrameFormat::I420, FrameFormat::Nv12, FrameFormat::Nv21] {
            let frame = RawFrame::from_luma(4, 4, format, &y);
            assert_eq!(to_luma(&frame).unwrap().data, y);
        }
    }

    #[test]
    fn test_rgba_neutral_chroma_is_gray() {
        let frame = RawFrame::from_luma(2, 2, FrameFormat::Nv21, &[0, 64, 128, 255]);
        let rgba = to_rgba(&frame).unwrap();

        assert_eq!(rgba.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(rgba.pixel(1, 0), [64, 64, 64, 255]);
        assert_eq!(rgba.pixel(1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn test_rgba_nv12_and_nv21_agree() {
        // Strong red: Y=76, U=85, V=255
        let y = [76u8; 4];
        let frame_nv12 = RawFrame::pack(2, 2, FrameFormat::Nv12, &y, &[85], &[255]);
        let frame_nv21 = RawFrame::pack(2, 2, FrameFormat::Nv21, &y, &[85], &[255]);
        let frame_i420 = RawFrame::pack(2, 2, FrameFormat::I420, &y, &[85], &[255]);

        let a = to_rgba(&frame_nv12).unwrap();
        let b = to_rgba(&frame_nv21).unwrap();
        let c = to_rgba(&frame_i420).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);

        let [r, g, b, alpha] = a.pixel(0, 0);
        assert!(r > 240);
        assert!(g < 10);
        assert!(b < 10);
        assert_eq!(alpha, 255);
    }

    #[test]
    fn test_rejects_non_yuv() {
        let mut frame = RawFrame::from_luma(2, 2, FrameFormat::I420, &[0; 4]);
        frame.format = FrameFormat::Rgba;
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_missing_plane() {
        let mut frame = RawFrame::from_luma(2, 2, FrameFormat::I420, &[0; 4]);
        frame.planes.pop();
        assert!(matches!(
            to_rgba(&frame),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let frame = RawFrame::from_luma(0, 4, FrameFormat::I420, &[]);
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_short_plane() {
        // Declares 4x4 but only carries 3 rows of luma
        let mut frame = RawFrame::from_luma(4, 4, FrameFormat::I420, &[0; 16]);
        frame.planes[0] = Plane::new(Arc::from(vec![0u8; 12]), 0, 4, 1);
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_odd_pixel_stride() {
        let mut frame = RawFrame::from_luma(4, 4, FrameFormat::I420, &[0; 16]);
        frame.planes[1].pixel_stride = 3;
        assert!(matches!(
            to_rgba(&frame),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    fn padded_frame(y_plane: Plane) -> RawFrame {
        let mut frame = RawFrame::from_luma(4, 5, FrameFormat::I420, &[9; 20]);
        frame.planes[0] = y_plane;
        frame
    }

    #[test]
    fn test_rejects_overflowing_row_stride() {
        let frame = padded_frame(Plane::new(Arc::from(vec![0u8; 20]), 0, 1 << 62, 1));
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));
        assert!(matches!(
            to_rgba(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));

        let frame = padded_frame(Plane::new(Arc::from(vec![0u8; 20]), 0, usize::MAX, 1));
        assert!(to_luma(&frame).is_err());
    }

    #[test]
    fn test_rejects_offset_past_buffer() {
        let frame = padded_frame(Plane::new(Arc::from(vec![0u8; 20]), 64, 4, 1));
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));

        let frame = padded_frame(Plane::new(Arc::from(vec![0u8; 20]), usize::MAX, 4, 1));
        assert!(to_rgba(&frame).is_err());
    }

    #[test]
    fn test_rejects_row_stride_narrower_than_row() {
        let frame = padded_frame(Plane::new(Arc::from(vec![0u8; 20]), 0, 3, 1));
        assert!(matches!(
            to_luma(&frame),
            Err(ConvertError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_offset_luma_plane() {
        // Two bytes of header before a 4x5 plane with a 6 byte stride
        let mut bytes = vec![0u8; 2 + 6 * 5];
        for row in 0..5 {
            for col in 0..4 {
                bytes[2 + row * 6 + col] = (row * 4 + col) as u8;
            }
        }
        let frame = padded_frame(Plane::new(Arc::from(bytes), 2, 6, 1));
        let expected: Vec<u8> = (0..20).collect();
        assert_eq!(to_luma(&frame).unwrap().data, expected);
    }

    #[test]
    fn test_gray_and_edge_expansion() {
        let luma = LumaBuffer::new(2, 1, vec![7, 200]);
        assert_eq!(luma_to_rgba(&luma).data, vec![7, 7, 7, 255, 200, 200, 200, 255]);

        let edges = EdgeMap::new(2, 1, vec![255, 0]);
        assert_eq!(edges_to_rgba(&edges).data, vec![255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn test_rgba_to_luma_weights() {
        let rgba = RgbaBuffer::new(3, 1, vec![255, 255, 255, 255, 0, 0, 0, 255, 255, 0, 0, 255]);
        let luma = rgba_to_luma(&rgba).unwrap();
        assert_eq!(luma.data, vec![255, 0, 76]);
    }
}
