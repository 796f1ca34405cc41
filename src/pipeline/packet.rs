// SPDX-License-Identifier: GPL-3.0-only

//! What the coordinator hands to the display side

use super::PipelineMode;
use crate::capture::LiveTextureBinding;
use crate::display::{TextureId, TextureTransform};
use crate::errors::DisplayError;
use crate::frame::RgbaBuffer;
use std::time::Duration;

/// Unit of work for the display sink
///
/// Pixel buffers are moved, never shared: once submitted, the processing thread
/// has no handle to the bytes and can start on the next frame immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayPacket {
    /// Zero-copy RAW: draw the capture-fed texture with its reported transform
    LiveTexture {
        texture: TextureId,
        transform: TextureTransform,
        frame_id: u64,
    },
    /// CPU-produced image (GRAY/EDGES, or RAW on the CPU path)
    Pixels {
        buffer: RgbaBuffer,
        mode: PipelineMode,
        frame_id: u64,
    },
}

impl DisplayPacket {
    pub fn frame_id(&self) -> u64 {
        match self {
            DisplayPacket::LiveTexture { frame_id, .. } | DisplayPacket::Pixels { frame_id, .. } => {
                *frame_id
            }
        }
    }

    pub fn mode(&self) -> PipelineMode {
        match self {
            DisplayPacket::LiveTexture { .. } => PipelineMode::Raw,
            DisplayPacket::Pixels { mode, .. } => *mode,
        }
    }
}

/// Reported after each frame reaches the display side
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub frame_id: u64,
    pub mode: PipelineMode,
    pub width: u32,
    pub height: u32,
    /// Time spent converting/filtering on the processing thread
    pub processing_time: Duration,
}

/// The render side as seen from the coordinator
pub trait DisplayTarget: Send + Sync {
    /// Hand over a packet and request a redraw; never blocks on the GPU
    fn submit(&self, packet: DisplayPacket);

    /// Allocate a texture the capture source can stream into
    ///
    /// Blocks until the render thread answers or `timeout` expires.
    fn create_live_texture(
        &self,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<LiveTextureBinding, DisplayError>;

    /// Free a texture from [`create_live_texture`](Self::create_live_texture)
    fn release_live_texture(&self, texture: TextureId);
}
