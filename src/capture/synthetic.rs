// SPDX-License-Identifier: GPL-3.0-only

//! Software camera producing test patterns at a fixed frame interval
//!
//! Stands in for a platform camera: frames come from its own thread, through a
//! finite buffer pool, in a configurable 4:2:0 layout. When a live texture is bound
//! it also streams RGBA into it, like a camera HAL writing its preview surface.

use super::patterns::{self, TestPattern};
use super::pool::{BufferPool, PoolStats};
use super::{CaptureSession, CaptureSource, FrameSink};
use crate::constants::{CAPTURE_POOL_SIZE, SYNTHETIC_FRAME_INTERVAL};
use crate::convert;
use crate::display::TextureTransform;
use crate::errors::PipelineError;
use crate::frame::FrameFormat;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    pub pattern: TestPattern,
    pub format: FrameFormat,
    /// Reported sensor orientation in degrees (0, 90, 180, 270)
    pub rotation: u32,
    /// Front-facing style horizontal mirror
    pub mirror: bool,
    pub frame_interval_ms: u64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            pattern: TestPattern::default(),
            format: FrameFormat::Nv21,
            rotation: 0,
            mirror: false,
            frame_interval_ms: SYNTHETIC_FRAME_INTERVAL.as_millis() as u64,
        }
    }
}

/// Producer thread; dropping `stop_tx` disconnects its tick wait
struct Producer {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SyntheticCamera {
    settings: SyntheticSettings,
    pool: BufferPool,
    producer: Option<Producer>,
}

impl SyntheticCamera {
    pub fn new(settings: SyntheticSettings) -> Self {
        Self::with_pool_size(settings, CAPTURE_POOL_SIZE)
    }

    pub fn with_pool_size(settings: SyntheticSettings, pool_size: usize) -> Self {
        Self {
            settings,
            pool: BufferPool::new(pool_size),
            producer: None,
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl CaptureSource for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn supports_texture_binding(&self) -> bool {
        true
    }

    fn texture_transform(&self) -> TextureTransform {
        TextureTransform::from_rotation(self.settings.rotation, self.settings.mirror)
    }

    fn open(&mut self, session: CaptureSession, sink: FrameSink) -> Result<(), PipelineError> {
        if !self.settings.format.is_yuv420() {
            return Err(PipelineError::Capture(format!(
                "synthetic camera cannot produce {}",
                self.settings.format
            )));
        }
        self.close();

        info!(
            width = session.width,
            height = session.height,
            pattern = ?self.settings.pattern,
            format = %self.settings.format,
            "Opening synthetic camera"
        );

        let settings = self.settings.clone();
        let pool = self.pool.clone();
        let (stop_tx, stop_rx) = bounded(0);
        let handle = thread::Builder::new()
            .name("synthetic-camera".to_string())
            .spawn(move || produce(settings, session, pool, sink, stop_rx))
            .map_err(|e| PipelineError::Spawn(e.to_string()))?;

        self.producer = Some(Producer { stop_tx, handle });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(Producer { stop_tx, handle }) = self.producer.take() {
            debug!("Closing synthetic camera");
            drop(stop_tx);
            if handle.join().is_err() {
                warn!("Synthetic camera thread panicked");
            }
        }
    }
}

/// Emit one frame per interval until `stop_rx` disconnects or the sink closes
fn produce(
    settings: SyntheticSettings,
    session: CaptureSession,
    pool: BufferPool,
    sink: FrameSink,
    stop_rx: Receiver<()>,
) {
    let interval = Duration::from_millis(settings.frame_interval_ms.max(1));
    let mut next_due = Instant::now();
    let mut index: u64 = 0;

    loop {
        match stop_rx.recv_deadline(next_due) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        // Skip ticks missed under load instead of bursting to catch up
        next_due = (next_due + interval).max(now);

        let Some(guard) = pool.try_acquire() else {
            warn!(frame_id = index, "Capture buffer pool exhausted, dropping frame");
            index += 1;
            continue;
        };

        let frame = patterns::render(
            settings.pattern,
            session.width,
            session.height,
            settings.format,
            index,
        )
        .with_frame_id(index)
        .with_timestamp(now)
        .with_release(guard);

        if let Some(binding) = &session.texture {
            match convert::to_rgba(&frame) {
                Ok(rgba) => binding.feed.push(rgba),
                Err(e) => debug!(error = %e, "Skipping live texture update"),
            }
        }

        trace!(frame_id = index, "Synthetic frame captured");
        index += 1;
        if !sink.deliver(frame) {
            break;
        }
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.close();
    }
}
