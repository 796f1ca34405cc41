// SPDX-License-Identifier: GPL-3.0-only

//! Frame data model
//!
//! A [`RawFrame`] is what the capture side hands over: three YUV 4:2:0 planes with
//! their own row and pixel strides. The derived buffers ([`LumaBuffer`], [`EdgeMap`],
//! [`RgbaBuffer`]) are dense and owned by whoever is processing the current frame.

mod buffers;

pub use buffers::{EdgeMap, LumaBuffer, RgbaBuffer};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a raw capture frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Planar 4:2:0 (separate Y, U, V planes)
    I420,
    /// Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    Nv12,
    /// Semi-planar 4:2:0 (Y plane + interleaved VU plane)
    /// Default output of most Android-style camera HALs
    Nv21,
    /// Packed RGBA; valid for display but not a capture input
    Rgba,
    /// Anything the capture side could not describe
    Unknown,
}

impl FrameFormat {
    /// Whether the converter accepts this layout
    pub fn is_yuv420(&self) -> bool {
        matches!(self, FrameFormat::I420 | FrameFormat::Nv12 | FrameFormat::Nv21)
    }

}

impl std::str::FromStr for FrameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i420" => Ok(FrameFormat::I420),
            "nv12" => Ok(FrameFormat::Nv12),
            "nv21" => Ok(FrameFormat::Nv21),
            other => Err(format!("unsupported capture format '{}'", other)),
        }
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrameFormat::I420 => "I420",
            FrameFormat::Nv12 => "NV12",
            FrameFormat::Nv21 => "NV21",
            FrameFormat::Rgba => "RGBA",
            FrameFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One image plane
///
/// `offset` lets the U and V planes of a semi-planar frame share the same
/// interleaved buffer (offsets 0 and 1, pixel stride 2).
#[derive(Clone)]
pub struct Plane {
    pub data: Arc<[u8]>,
    pub offset: usize,
    /// Bytes between the starts of consecutive rows
    pub row_stride: usize,
    /// Bytes between horizontally adjacent samples
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Arc<[u8]>, offset: usize, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            offset,
            row_stride,
            pixel_stride,
        }
    }

    /// Bytes reachable from this plane's start
    pub fn len(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Minimum byte length needed to address `cols` x `rows` samples
    ///
    /// `None` when the declared strides overflow the address space.
    pub fn required_len(&self, cols: usize, rows: usize) -> Option<usize> {
        if cols == 0 || rows == 0 {
            return Some(0);
        }
        (rows - 1)
            .checked_mul(self.row_stride)?
            .checked_add((cols - 1).checked_mul(self.pixel_stride)?)?
            .checked_add(1)
    }

    /// Sample at (x, y); caller must have validated the geometry
    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.data[self.offset + y * self.row_stride + x * self.pixel_stride]
    }

    /// Contiguous bytes of row `y` (only meaningful for pixel stride 1)
    pub fn row(&self, y: usize, cols: usize) -> Option<&[u8]> {
        let start = y.checked_mul(self.row_stride)?.checked_add(self.offset)?;
        self.data.get(start..start.checked_add(cols)?)
    }
}

impl std::fmt::Debug for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plane")
            .field("len", &self.len())
            .field("offset", &self.offset)
            .field("row_stride", &self.row_stride)
            .field("pixel_stride", &self.pixel_stride)
            .finish()
    }
}

/// Returns a frame's buffer to its capture pool
///
/// Runs its callback at most once: either through [`RawFrame::release`] or when
/// the frame is dropped on any other path.
pub struct ReleaseGuard {
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseGuard {
    pub fn new(on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_release: Some(Box::new(on_release)),
        }
    }

    fn fire(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Frame as delivered by the capture side
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// Y, U, V in that order regardless of the memory layout
    pub planes: Vec<Plane>,
    /// Monotonic sequence number assigned by the capture source
    pub frame_id: u64,
    /// Capture timestamp
    pub captured_at: Instant,
    guard: Option<ReleaseGuard>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, format: FrameFormat, planes: Vec<Plane>) -> Self {
        Self {
            width,
            height,
            format,
            planes,
            frame_id: 0,
            captured_at: Instant::now(),
            guard: None,
        }
    }

    pub fn with_frame_id(mut self, frame_id: u64) -> Self {
        self.frame_id = frame_id;
        self
    }

    pub fn with_timestamp(mut self, captured_at: Instant) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Attach the callback that hands the buffer back to the capture pool
    pub fn with_release(mut self, guard: ReleaseGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Pack tightly laid out planes into the requested 4:2:0 layout
    ///
    /// `u` and `v` are `ceil(w/2) x ceil(h/2)` planes. Semi-planar formats interleave
    /// them into one buffer and expose U/V as strided views into it.
    pub fn pack(width: u32, height: u32, format: FrameFormat, y: &[u8], u: &[u8], v: &[u8]) -> Self {
        let w = width as usize;
        let cw = w.div_ceil(2);
        let luma = Plane::new(Arc::from(y), 0, w, 1);

        let planes = match format {
            FrameFormat::Nv12 | FrameFormat::Nv21 => {
                let (first, second) = if format == FrameFormat::Nv12 {
                    (u, v)
                } else {
                    (v, u)
                };
                let interleaved: Vec<u8> = first
                    .iter()
                    .zip(second.iter())
                    .flat_map(|(a, b)| [*a, *b])
                    .collect();
                let shared: Arc<[u8]> = Arc::from(interleaved);
                let (u_off, v_off) = if format == FrameFormat::Nv12 {
                    (0, 1)
                } else {
                    (1, 0)
                };
                vec![
                    luma,
                    Plane::new(shared.clone(), u_off, cw * 2, 2),
                    Plane::new(shared, v_off, cw * 2, 2),
                ]
            }
            _ => vec![
                luma,
                Plane::new(Arc::from(u), 0, cw, 1),
                Plane::new(Arc::from(v), 0, cw, 1),
            ],
        };

        Self::new(width, height, format, planes)
    }

    /// Frame with the given luma and neutral chroma (a pure gray image)
    pub fn from_luma(width: u32, height: u32, format: FrameFormat, y: &[u8]) -> Self {
        let chroma_len = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
        let neutral = vec![128u8; chroma_len];
        Self::pack(width, height, format, y, &neutral, &neutral)
    }

    /// Dimensions of the chroma planes
    pub fn chroma_size(&self) -> (usize, usize) {
        (
            (self.width as usize).div_ceil(2),
            (self.height as usize).div_ceil(2),
        )
    }

    /// Hand the buffer back to the capture pool now
    pub fn release(mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.fire();
        }
    }

    /// Whether this frame still holds a pool buffer
    pub fn holds_buffer(&self) -> bool {
        self.guard
            .as_ref()
            .is_some_and(|guard| guard.on_release.is_some())
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("frame_id", &self.frame_id)
            .field("planes", &self.planes)
            .finish()
    }
}
