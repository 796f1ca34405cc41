// SPDX-License-Identifier: GPL-3.0-only

//! Texture/display sink
//!
//! [`DisplaySink::present`] turns a [`DisplayPacket`] into one drawn frame:
//!
//! - Live texture (RAW zero-copy): draw with the external-texture shader and the
//!   transform the capture source reported.
//! - CPU pixels (GRAY/EDGES): upload into one lazily allocated 2D texture that is
//!   reused across frames and only reallocated when the size changes, then draw with
//!   the plain shader.
//!
//! The sink has no render loop of its own; [`RenderThread`] calls it whenever new
//! content arrives.

pub mod backend;
pub mod render_thread;
pub mod shaders;
pub mod transform;
pub mod wgpu_backend;

pub use backend::{GpuBackend, RecordedFrame, RecordingBackend, RecordingLog};
pub use render_thread::{RenderHandle, RenderStats, RenderThread};
pub use transform::{Rotation, TextureTransform};
pub use wgpu_backend::WgpuBackend;

use crate::errors::DisplayError;
use crate::frame::RgbaBuffer;
use crate::pipeline::DisplayPacket;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Handle to a texture owned by the render thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Which quad shader to draw with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    /// Samples an ordinary 2D texture with identity texture coordinates
    Plain2d,
    /// Samples a capture-fed texture through its transform matrix
    External,
}

/// The texture that CPU packets are uploaded into
#[derive(Debug, Clone, Copy)]
struct PixelTexture {
    id: TextureId,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy)]
struct DrawCall {
    variant: ShaderVariant,
    texture: TextureId,
    transform: TextureTransform,
}

pub struct DisplaySink<B: GpuBackend> {
    backend: B,
    pixel_texture: Option<PixelTexture>,
    live_textures: HashSet<TextureId>,
    last_draw: Option<DrawCall>,
}

impl<B: GpuBackend> DisplaySink<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pixel_texture: None,
            live_textures: HashSet::new(),
            last_draw: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Draw and present one packet
    pub fn present(&mut self, packet: &DisplayPacket) -> Result<(), DisplayError> {
        let call = match packet {
            DisplayPacket::LiveTexture {
                texture,
                transform,
                frame_id,
            } => {
                if !self.live_textures.contains(texture) {
                    return Err(DisplayError::UnknownTexture(texture.0));
                }
                trace!(frame_id, texture = texture.0, "Presenting live texture");
                DrawCall {
                    variant: ShaderVariant::External,
                    texture: *texture,
                    transform: *transform,
                }
            }
            DisplayPacket::Pixels {
                buffer, frame_id, ..
            } => {
                let texture = self.upload_pixels(buffer)?;
                trace!(frame_id, texture = texture.0, "Presenting pixel buffer");
                DrawCall {
                    variant: ShaderVariant::Plain2d,
                    texture,
                    transform: TextureTransform::IDENTITY,
                }
            }
        };

        self.draw(call)
    }

    /// Repeat the last draw, e.g. after a live texture received new content
    pub fn redraw(&mut self) -> Result<bool, DisplayError> {
        match self.last_draw {
            Some(call) => self.draw(call).map(|_| true),
            None => Ok(false),
        }
    }

    /// Allocate a texture a capture source can stream into
    pub fn create_live_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DisplayError> {
        let id = self.backend.create_texture(width, height)?;
        self.live_textures.insert(id);
        debug!(texture = id.0, width, height, "Live texture allocated");
        Ok(id)
    }

    pub fn release_live_texture(&mut self, texture: TextureId) {
        if self.live_textures.remove(&texture) {
            self.backend.destroy_texture(texture);
            if self.last_draw.is_some_and(|call| call.texture == texture) {
                self.last_draw = None;
            }
            debug!(texture = texture.0, "Live texture released");
        }
    }

    /// New capture output for a live texture; redraws if it is on screen
    pub fn update_live_texture(
        &mut self,
        texture: TextureId,
        image: &RgbaBuffer,
    ) -> Result<(), DisplayError> {
        if !self.live_textures.contains(&texture) {
            return Err(DisplayError::UnknownTexture(texture.0));
        }
        self.backend.upload(texture, image)?;
        if self.last_draw.is_some_and(|call| call.texture == texture) {
            self.redraw()?;
        }
        Ok(())
    }

    fn upload_pixels(&mut self, buffer: &RgbaBuffer) -> Result<TextureId, DisplayError> {
        let expected = buffer.width as usize * buffer.height as usize * 4;
        if buffer.data.len() != expected {
            return Err(DisplayError::InvalidBuffer(format!(
                "{}x{} RGBA needs {} bytes, got {}",
                buffer.width,
                buffer.height,
                expected,
                buffer.data.len()
            )));
        }

        let reusable = self
            .pixel_texture
            .filter(|t| t.width == buffer.width && t.height == buffer.height);

        let texture = match reusable {
            Some(texture) => texture,
            None => {
                if let Some(old) = self.pixel_texture.take() {
                    self.backend.destroy_texture(old.id);
                }
                debug!(
                    width = buffer.width,
                    height = buffer.height,
                    "Allocating pixel texture"
                );
                let id = self.backend.create_texture(buffer.width, buffer.height)?;
                let texture = PixelTexture {
                    id,
                    width: buffer.width,
                    height: buffer.height,
                };
                self.pixel_texture = Some(texture);
                texture
            }
        };

        self.backend.upload(texture.id, buffer)?;
        Ok(texture.id)
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), DisplayError> {
        self.backend
            .draw(call.variant, call.texture, &call.transform)?;
        self.backend.present()?;
        self.last_draw = Some(call);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineMode;

    fn pixels(width: u32, height: u32, value: u8, frame_id: u64) -> DisplayPacket {
        DisplayPacket::Pixels {
            buffer: RgbaBuffer::new(
                width,
                height,
                vec![value; width as usize * height as usize * 4],
            ),
            mode: PipelineMode::Grayscale,
            frame_id,
        }
    }

    #[test]
    fn test_pixel_texture_allocated_once() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut sink = DisplaySink::new(backend);

        for i in 0..5 {
            sink.present(&pixels(4, 4, i as u8, i)).unwrap();
        }
        assert_eq!(log.allocations(), 1);
        assert_eq!(log.uploads(), 5);
        assert_eq!(log.presented(), 5);

        let last = log.last_frame().unwrap();
        assert_eq!(last.variant, ShaderVariant::Plain2d);
        assert!(last.transform.is_identity());
        assert_eq!(last.content.data[0], 4);
    }

    #[test]
    fn test_size_change_reallocates() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut sink = DisplaySink::new(backend);

        sink.present(&pixels(4, 4, 1, 0)).unwrap();
        sink.present(&pixels(8, 4, 1, 1)).unwrap();
        sink.present(&pixels(8, 4, 1, 2)).unwrap();
        assert_eq!(log.allocations(), 2);
    }

    #[test]
    fn test_live_texture_uses_external_variant() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut sink = DisplaySink::new(backend);

        let texture = sink.create_live_texture(2, 2).unwrap();
        let transform = TextureTransform::from_rotation(270, true);
        let packet = DisplayPacket::LiveTexture {
            texture,
            transform,
            frame_id: 1,
        };
        sink.present(&packet).unwrap();

        let frame = log.last_frame().unwrap();
        assert_eq!(frame.variant, ShaderVariant::External);
        assert_eq!(frame.transform, transform);
    }

    #[test]
    fn test_live_update_redraws_on_screen_texture() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut sink = DisplaySink::new(backend);

        let texture = sink.create_live_texture(1, 1).unwrap();
        sink.present(&DisplayPacket::LiveTexture {
            texture,
            transform: TextureTransform::IDENTITY,
            frame_id: 0,
        })
        .unwrap();

        let image = RgbaBuffer::new(1, 1, vec![9, 8, 7, 255]);
        sink.update_live_texture(texture, &image).unwrap();
        assert_eq!(log.presented(), 2);
        assert_eq!(log.last_frame().unwrap().content, image);
    }

    #[test]
    fn test_unknown_live_texture_rejected() {
        let mut sink = DisplaySink::new(RecordingBackend::new());
        let packet = DisplayPacket::LiveTexture {
            texture: TextureId(42),
            transform: TextureTransform::IDENTITY,
            frame_id: 0,
        };
        assert!(matches!(
            sink.present(&packet),
            Err(DisplayError::UnknownTexture(42))
        ));
    }

    #[test]
    fn test_malformed_buffer_rejected() {
        let mut sink = DisplaySink::new(RecordingBackend::new());
        let packet = DisplayPacket::Pixels {
            buffer: RgbaBuffer {
                width: 4,
                height: 4,
                data: vec![0; 10],
            },
            mode: PipelineMode::Edges,
            frame_id: 0,
        };
        assert!(matches!(
            sink.present(&packet),
            Err(DisplayError::InvalidBuffer(_))
        ));
    }
}
