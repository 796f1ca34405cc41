// SPDX-License-Identifier: GPL-3.0-only

//! Capture side of the pipeline
//!
//! A [`CaptureSource`] pushes [`RawFrame`]s into a [`FrameSink`] from its own
//! thread. Frames carry a release guard tied to the source's [`BufferPool`]; the
//! pipeline guarantees every frame is released exactly once.

pub mod manual;
pub mod patterns;
pub mod pool;
pub mod synthetic;

pub use manual::{ManualCapture, ManualFeed};
pub use patterns::TestPattern;
pub use pool::{BufferPool, PoolStats};
pub use synthetic::{SyntheticCamera, SyntheticSettings};

use crate::display::{TextureId, TextureTransform};
use crate::errors::PipelineError;
use crate::frame::{RawFrame, RgbaBuffer};
use crate::pipeline::{FrameCounters, LatestSlot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// Parameters for one capture session
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub width: u32,
    pub height: u32,
    /// Texture to stream into for zero-copy RAW display
    pub texture: Option<LiveTextureBinding>,
}

/// A GPU texture the capture source writes its continuous output into
#[derive(Clone)]
pub struct LiveTextureBinding {
    pub texture: TextureId,
    pub feed: LiveTextureFeed,
}

impl std::fmt::Debug for LiveTextureBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTextureBinding")
            .field("texture", &self.texture)
            .finish()
    }
}

/// Write end of a live texture
///
/// Pushing never blocks; if the render side is busy the image is dropped, the same
/// way a camera surface drops buffers nobody consumed.
#[derive(Clone)]
pub struct LiveTextureFeed {
    push: Arc<dyn Fn(RgbaBuffer) + Send + Sync>,
}

impl LiveTextureFeed {
    pub fn new(push: impl Fn(RgbaBuffer) + Send + Sync + 'static) -> Self {
        Self {
            push: Arc::new(push),
        }
    }

    pub fn push(&self, image: RgbaBuffer) {
        (self.push)(image);
    }
}

/// Platform camera boundary
pub trait CaptureSource: Send {
    fn name(&self) -> &str;

    /// False when no device exists or access was refused
    fn is_available(&self) -> bool {
        true
    }

    /// Whether the source can stream into a [`LiveTextureBinding`]
    fn supports_texture_binding(&self) -> bool {
        false
    }

    /// Transform the display must apply to the live texture (sensor orientation)
    fn texture_transform(&self) -> TextureTransform {
        TextureTransform::IDENTITY
    }

    /// Start delivering frames into `sink`
    fn open(&mut self, session: CaptureSession, sink: FrameSink) -> Result<(), PipelineError>;

    /// Stop delivering frames
    ///
    /// Synchronous: no frame reaches the sink after this returns. Must be safe to
    /// call when the source is not open.
    fn close(&mut self);
}

/// Inbox of the frame pipeline, handed to the capture source
///
/// Newer frames replace older unprocessed ones; the replaced frame is dropped and
/// thereby released back to its pool.
#[derive(Clone)]
pub struct FrameSink {
    slot: Arc<LatestSlot<RawFrame>>,
    counters: Arc<FrameCounters>,
    open: Arc<AtomicBool>,
}

impl FrameSink {
    pub fn new(slot: Arc<LatestSlot<RawFrame>>, counters: Arc<FrameCounters>) -> Self {
        Self {
            slot,
            counters,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Hand a frame to the pipeline; returns false (and releases it) when closed
    pub fn deliver(&self, frame: RawFrame) -> bool {
        if !self.is_open() {
            trace!(frame_id = frame.frame_id, "Sink closed, releasing frame");
            frame.release();
            return false;
        }

        self.counters.record_received();
        if let Some(stale) = self.slot.put(frame) {
            trace!(frame_id = stale.frame_id, "Frame superseded before processing");
            self.counters.record_superseded();
            stale.release();
        }
        true
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;

    #[test]
    fn test_sink_supersedes_and_releases() {
        let pool = BufferPool::new(4);
        let slot = Arc::new(LatestSlot::new());
        let counters = Arc::new(FrameCounters::default());
        let sink = FrameSink::new(Arc::clone(&slot), Arc::clone(&counters));

        for id in 0..3 {
            let guard = pool.try_acquire().unwrap();
            let frame = RawFrame::from_luma(4, 4, FrameFormat::I420, &[0; 16])
                .with_frame_id(id)
                .with_release(guard);
            assert!(sink.deliver(frame));
        }

        // Two superseded frames went back to the pool, the newest waits in the slot
        assert_eq!(pool.stats().outstanding, 1);
        assert_eq!(counters.snapshot().superseded, 2);
        assert_eq!(slot.take().map(|f| f.frame_id), Some(2));
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_closed_sink_releases() {
        let pool = BufferPool::new(1);
        let sink = FrameSink::new(
            Arc::new(LatestSlot::new()),
            Arc::new(FrameCounters::default()),
        );
        sink.close();

        let guard = pool.try_acquire().unwrap();
        let frame = RawFrame::from_luma(4, 4, FrameFormat::I420, &[0; 16]).with_release(guard);
        assert!(!sink.deliver(frame));
        assert_eq!(pool.stats().outstanding, 0);
        assert_eq!(pool.stats().released, 1);
    }
}
