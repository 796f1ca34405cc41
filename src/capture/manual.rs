// SPDX-License-Identifier: GPL-3.0-only

//! Push-driven capture source
//!
//! The embedding code (or a test) owns a [`ManualFeed`] and pushes frames by hand.
//! Useful when frames come from somewhere the pipeline does not control.

use super::{CaptureSession, CaptureSource, FrameSink, LiveTextureBinding};
use crate::display::TextureTransform;
use crate::errors::PipelineError;
use crate::frame::RawFrame;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
struct Shared {
    sink: Option<FrameSink>,
    session: Option<CaptureSession>,
    opened: u32,
}

pub struct ManualCapture {
    name: String,
    available: bool,
    permission_denied: bool,
    texture_binding: bool,
    transform: TextureTransform,
    shared: Arc<Mutex<Shared>>,
}

/// Producer handle for a [`ManualCapture`]
#[derive(Clone)]
pub struct ManualFeed {
    shared: Arc<Mutex<Shared>>,
}

impl ManualCapture {
    pub fn new(name: &str) -> (Self, ManualFeed) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let capture = Self {
            name: name.to_string(),
            available: true,
            permission_denied: false,
            texture_binding: false,
            transform: TextureTransform::IDENTITY,
            shared: Arc::clone(&shared),
        };
        (capture, ManualFeed { shared })
    }

    /// Report no device
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Refuse to open, as if the user denied camera access
    pub fn permission_denied(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    /// Accept a live texture binding and report `transform` for it
    pub fn with_texture_binding(mut self, transform: TextureTransform) -> Self {
        self.texture_binding = true;
        self.transform = transform;
        self
    }
}

impl CaptureSource for ManualCapture {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn supports_texture_binding(&self) -> bool {
        self.texture_binding
    }

    fn texture_transform(&self) -> TextureTransform {
        self.transform
    }

    fn open(&mut self, session: CaptureSession, sink: FrameSink) -> Result<(), PipelineError> {
        if self.permission_denied {
            return Err(PipelineError::PermissionDenied);
        }
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        debug!(name = %self.name, width = session.width, height = session.height, "Manual capture opened");
        shared.sink = Some(sink);
        shared.session = Some(session);
        shared.opened += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        if shared.sink.take().is_some() {
            debug!(name = %self.name, "Manual capture closed");
        }
        shared.session = None;
    }
}

impl ManualFeed {
    /// Deliver a frame; returns false (and releases it) when the source is closed
    pub fn push(&self, frame: RawFrame) -> bool {
        // Held across delivery so close() cannot complete mid-push
        let shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        match &shared.sink {
            Some(sink) => sink.deliver(frame),
            None => {
                frame.release();
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sink
            .is_some()
    }

    /// Live texture of the current session, if one was bound
    pub fn live_texture(&self) -> Option<LiveTextureBinding> {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .session
            .as_ref()
            .and_then(|session| session.texture.clone())
    }

    /// Session size requested by the pipeline
    pub fn session_size(&self) -> Option<(u32, u32)> {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .session
            .as_ref()
            .map(|session| (session.width, session.height))
    }

    /// How many times the source has been opened
    pub fn open_count(&self) -> u32 {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).opened
    }
}
