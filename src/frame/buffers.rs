// SPDX-License-Identifier: GPL-3.0-only

//! Dense single-owner pixel buffers produced while processing a frame

/// 8-bit intensity, one byte per pixel, no row padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Constant-intensity buffer
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Edge response, same geometry as the luma it came from
///
/// Binary (0/255) for the Canny variant, a clamped magnitude for Sobel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EdgeMap {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// No edges anywhere
    pub fn zeros(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; width as usize * height as usize])
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// Packed RGBA, 4 bytes per pixel, ready for texture upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    /// Bytes per row
    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// True when every pixel has R == G == B
    pub fn is_gray(&self) -> bool {
        self.data
            .chunks_exact(4)
            .all(|px| px[0] == px[1] && px[1] == px[2])
    }
}
