// SPDX-License-Identifier: GPL-3.0-only

//! GPU backend seam
//!
//! [`DisplaySink`](super::DisplaySink) drives any [`GpuBackend`]. The wgpu
//! implementation renders for real; [`RecordingBackend`] keeps texture contents in
//! memory and records each presented frame, for machines without a GPU and for
//! tests.

use super::{ShaderVariant, TextureId, TextureTransform};
use crate::errors::DisplayError;
use crate::frame::RgbaBuffer;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Graphics calls the sink needs; always invoked from the render thread
pub trait GpuBackend {
    /// Allocate an RGBA texture
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DisplayError>;

    fn destroy_texture(&mut self, texture: TextureId);

    /// Replace the texture's contents; dimensions must match its allocation
    fn upload(&mut self, texture: TextureId, image: &RgbaBuffer) -> Result<(), DisplayError>;

    /// Draw the full-screen quad sampling `texture`
    fn draw(
        &mut self,
        variant: ShaderVariant,
        texture: TextureId,
        transform: &TextureTransform,
    ) -> Result<(), DisplayError>;

    /// Flush the frame to the output
    fn present(&mut self) -> Result<(), DisplayError>;
}

/// One presented frame as seen by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub variant: ShaderVariant,
    pub texture: TextureId,
    pub transform: TextureTransform,
    /// Texture contents at draw time
    pub content: RgbaBuffer,
}

/// Number of frames [`RecordingBackend`] keeps
const RECORDING_DEPTH: usize = 64;

#[derive(Default)]
struct Recording {
    frames: VecDeque<RecordedFrame>,
    presented: u64,
    uploads: u64,
    allocations: u64,
}

/// Shared view of what a [`RecordingBackend`] presented
#[derive(Clone, Default)]
pub struct RecordingLog {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingLog {
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .frames
            .iter()
            .cloned()
            .collect()
    }

    pub fn last_frame(&self) -> Option<RecordedFrame> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .frames
            .back()
            .cloned()
    }

    pub fn presented(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).presented
    }

    pub fn uploads(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).uploads
    }

    /// Texture allocations so far
    pub fn allocations(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).allocations
    }
}

/// CPU-only backend
#[derive(Default)]
pub struct RecordingBackend {
    textures: HashMap<TextureId, RgbaBuffer>,
    next_id: u64,
    pending: Option<RecordedFrame>,
    log: RecordingLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }
}

impl GpuBackend for RecordingBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DisplayError> {
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidBuffer(format!(
                "cannot allocate {}x{} texture",
                width, height
            )));
        }
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(
            id,
            RgbaBuffer::new(width, height, vec![0; width as usize * height as usize * 4]),
        );
        self.log
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .allocations += 1;
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn upload(&mut self, texture: TextureId, image: &RgbaBuffer) -> Result<(), DisplayError> {
        let slot = self
            .textures
            .get_mut(&texture)
            .ok_or(DisplayError::UnknownTexture(texture.0))?;
        if slot.width != image.width || slot.height != image.height {
            return Err(DisplayError::InvalidBuffer(format!(
                "{}x{} image into {}x{} texture",
                image.width, image.height, slot.width, slot.height
            )));
        }
        slot.data.copy_from_slice(&image.data);
        self.log
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .uploads += 1;
        Ok(())
    }

    fn draw(
        &mut self,
        variant: ShaderVariant,
        texture: TextureId,
        transform: &TextureTransform,
    ) -> Result<(), DisplayError> {
        let content = self
            .textures
            .get(&texture)
            .ok_or(DisplayError::UnknownTexture(texture.0))?
            .clone();
        self.pending = Some(RecordedFrame {
            variant,
            texture,
            transform: *transform,
            content,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        let mut recording = self.log.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(frame) = self.pending.take() {
            if recording.frames.len() >= RECORDING_DEPTH {
                recording.frames.pop_front();
            }
            recording.frames.push_back(frame);
        }
        recording.presented += 1;
        Ok(())
    }
}
