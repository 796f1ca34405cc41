// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline coordinator
//!
//! Owns the capture session, the processing thread and the hand-off to the display
//! side. Frames arrive through a [`FrameSink`] into a single latest-wins slot; the
//! processing thread takes one at a time, reads the mode once, runs the
//! [`Dispatcher`], releases the frame and submits the packet.

use super::dispatch::{Dispatcher, RawPath};
use super::fps::FpsTracker;
use super::packet::{DisplayTarget, FrameInfo};
use super::slot::LatestSlot;
use super::state::{AtomicState, PipelineState};
use super::worker::SlotWorker;
use super::{AtomicMode, PipelineMode};
use crate::capture::{CaptureSession, CaptureSource, FrameSink, LiveTextureBinding};
use crate::config::Config;
use crate::constants::{FPS_REPORT_INTERVAL, FPS_WINDOW, RENDER_SETUP_TIMEOUT};
use crate::errors::{FrameError, PipelineError};
use crate::filter::{CannyParams, EdgeVariant};
use crate::frame::RawFrame;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Coordinator tuning, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub initial_mode: PipelineMode,
    pub edge_variant: EdgeVariant,
    pub canny: CannyParams,
    pub raw_path: RawPath,
    pub fps_window: usize,
    pub fps_report_interval: Duration,
    pub setup_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_mode: config.mode,
            edge_variant: config.live_variant,
            canny: config.canny,
            raw_path: config.raw_path,
            fps_window: config.fps_window,
            fps_report_interval: Duration::from_millis(config.fps_report_interval_ms),
            setup_timeout: Duration::from_millis(config.render_setup_timeout_ms),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            initial_mode: PipelineMode::default(),
            edge_variant: EdgeVariant::Sobel,
            canny: CannyParams::default(),
            raw_path: RawPath::default(),
            fps_window: FPS_WINDOW,
            fps_report_interval: FPS_REPORT_INTERVAL,
            setup_timeout: RENDER_SETUP_TIMEOUT,
        }
    }
}

/// Frame counters shared between the capture side and the processing thread
#[derive(Debug, Default)]
pub struct FrameCounters {
    received: AtomicU64,
    processed: AtomicU64,
    dropped_errors: AtomicU64,
    superseded: AtomicU64,
}

impl FrameCounters {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.dropped_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameStats {
        FrameStats {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            dropped_errors: self.dropped_errors.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FrameCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames delivered by the capture source
    pub received: u64,
    /// Frames turned into a display packet
    pub processed: u64,
    /// Frames skipped because conversion or filtering failed
    pub dropped_errors: u64,
    /// Frames replaced in the slot before the processing thread took them
    pub superseded: u64,
}

type FrameCallback = Arc<dyn Fn(&FrameInfo) + Send + Sync>;

/// Everything the processing thread needs, moved into the worker closure
struct FrameContext {
    mode: Arc<AtomicMode>,
    state: Arc<AtomicState>,
    dispatcher: Dispatcher,
    display: Arc<dyn DisplayTarget>,
    fps: FpsTracker,
    counters: Arc<FrameCounters>,
    callbacks: Arc<Mutex<Vec<FrameCallback>>>,
}

impl FrameContext {
    fn process(&self, frame: RawFrame) {
        // One snapshot per frame; a concurrent set_mode applies to the next frame
        let mode = self.mode.load();
        let _ = self.state.transition(Dispatcher::state_for(mode));

        let started = Instant::now();
        let (frame_id, width, height) = (frame.frame_id, frame.width, frame.height);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.run(&frame, mode)))
            .unwrap_or_else(|payload| {
                let reason = panic_message(&*payload);
                error!(frame_id, %mode, %reason, "Frame processing panicked");
                Err(FrameError::Panicked(reason))
            });
        frame.release();
        let processing_time = started.elapsed();

        match result {
            Ok(packet) => {
                let _ = self.state.transition(PipelineState::Display);
                self.display.submit(packet);
                self.counters.record_processed();
                self.fps.record(Instant::now());
                trace!(frame_id, %mode, ?processing_time, "Frame submitted");

                let info = FrameInfo {
                    frame_id,
                    mode,
                    width,
                    height,
                    processing_time,
                };
                // Cloned out so a callback can register another
                let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).clone();
                for callback in callbacks {
                    callback(&info);
                }
            }
            Err(e) => {
                warn!(frame_id, %mode, error = %e, "Dropping frame");
                self.counters.record_error();
            }
        }

        let _ = self.state.transition(PipelineState::Capturing);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Capture -> process -> display coordinator
pub struct FramePipeline {
    settings: PipelineSettings,
    source: Box<dyn CaptureSource>,
    display: Arc<dyn DisplayTarget>,
    mode: Arc<AtomicMode>,
    state: Arc<AtomicState>,
    slot: Arc<LatestSlot<RawFrame>>,
    fps: FpsTracker,
    counters: Arc<FrameCounters>,
    callbacks: Arc<Mutex<Vec<FrameCallback>>>,
    worker: Option<SlotWorker>,
    sink: Option<FrameSink>,
    live_texture: Option<(LiveTextureBinding, u32, u32)>,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn CaptureSource>,
        display: Arc<dyn DisplayTarget>,
        settings: PipelineSettings,
    ) -> Self {
        let fps = FpsTracker::new(settings.fps_window, settings.fps_report_interval);
        Self {
            mode: Arc::new(AtomicMode::new(settings.initial_mode)),
            state: Arc::new(AtomicState::new(PipelineState::Idle)),
            slot: Arc::new(LatestSlot::new()),
            fps,
            counters: Arc::new(FrameCounters::default()),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            worker: None,
            sink: None,
            live_texture: None,
            settings,
            source,
            display,
        }
    }

    /// Open the capture session at the requested output size
    ///
    /// On failure the pipeline stays `Idle` and nothing is left running.
    pub fn start(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        info!(
            source = %self.source.name(),
            width,
            height,
            mode = %self.mode.load(),
            "Starting frame pipeline"
        );
        self.open_session(width, height)
    }

    /// Stop capturing and processing; the pipeline can be resumed later
    pub fn pause(&mut self) -> Result<(), PipelineError> {
        match self.state.get() {
            PipelineState::Stopped => Err(PipelineError::InvalidState {
                operation: "pause",
                state: PipelineState::Stopped.to_string(),
            }),
            PipelineState::Idle => Ok(()),
            _ => {
                info!("Pausing frame pipeline");
                self.teardown();
                let _ = self.state.transition(PipelineState::Idle);
                Ok(())
            }
        }
    }

    /// Reopen the capture session after [`pause`](Self::pause)
    pub fn resume(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        info!(width, height, "Resuming frame pipeline");
        self.open_session(width, height)
    }

    /// Tear everything down; terminal
    pub fn stop(&mut self) {
        if self.state.get() == PipelineState::Stopped {
            return;
        }
        info!("Stopping frame pipeline");
        self.teardown();
        if let Some((binding, _, _)) = self.live_texture.take() {
            self.display.release_live_texture(binding.texture);
        }
        let _ = self.state.transition(PipelineState::Stopped);
    }

    /// Takes effect at the next frame boundary
    pub fn set_mode(&self, mode: PipelineMode) {
        let previous = self.mode.swap(mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "Pipeline mode changed");
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode.load()
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn current_fps(&self) -> f32 {
        self.fps.current()
    }

    pub fn stats(&self) -> FrameStats {
        self.counters.snapshot()
    }

    /// Called with the smoothed FPS every report interval
    pub fn on_fps(&self, callback: impl Fn(f32) + Send + Sync + 'static) {
        self.fps.on_update(callback);
    }

    /// Called after each frame has been handed to the display side
    pub fn on_frame(&self, callback: impl Fn(&FrameInfo) + Send + Sync + 'static) {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(callback));
    }

    fn open_session(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        let current = self.state.get();
        if current != PipelineState::Idle {
            return Err(PipelineError::InvalidState {
                operation: "start",
                state: current.to_string(),
            });
        }
        if self.settings.edge_variant == EdgeVariant::Canny {
            self.settings
                .canny
                .validate()
                .map_err(|e| PipelineError::InvalidSettings(e.to_string()))?;
        }
        if !self.source.is_available() {
            warn!(source = %self.source.name(), "Capture source unavailable");
            return Err(PipelineError::NoCaptureSource(self.source.name().to_string()));
        }

        let dispatcher = self.build_dispatcher(width, height)?;
        let texture = self.live_texture.as_ref().map(|(binding, _, _)| binding.clone());

        self.fps.reset();
        let sink = FrameSink::new(Arc::clone(&self.slot), Arc::clone(&self.counters));
        let worker = self.spawn_worker(dispatcher)?;
        self.worker = Some(worker);
        self.sink = Some(sink.clone());

        let _ = self.state.transition(PipelineState::Capturing);

        let session = CaptureSession {
            width,
            height,
            texture,
        };
        if let Err(e) = self.source.open(session, sink) {
            warn!(source = %self.source.name(), error = %e, "Failed to open capture session");
            self.teardown();
            let _ = self.state.transition(PipelineState::Idle);
            return Err(e);
        }

        debug!(source = %self.source.name(), "Capture session open");
        Ok(())
    }

    /// Resolve the RAW path and (re)create the live texture if needed
    fn build_dispatcher(&mut self, width: u32, height: u32) -> Result<Dispatcher, PipelineError> {
        let mut raw_path = self.settings.raw_path;
        if raw_path == RawPath::ZeroCopy && !self.source.supports_texture_binding() {
            warn!(
                source = %self.source.name(),
                "Capture source cannot bind a texture, RAW mode falls back to CPU conversion"
            );
            raw_path = RawPath::Cpu;
        }

        let dispatcher = Dispatcher::new(self.settings.edge_variant, self.settings.canny, raw_path);
        if raw_path == RawPath::Cpu {
            return Ok(dispatcher);
        }

        let reuse = matches!(self.live_texture, Some((_, w, h)) if w == width && h == height);
        if !reuse {
            if let Some((old, _, _)) = self.live_texture.take() {
                self.display.release_live_texture(old.texture);
            }
            let binding =
                self.display
                    .create_live_texture(width, height, self.settings.setup_timeout)?;
            debug!(texture = ?binding.texture, width, height, "Live texture created");
            self.live_texture = Some((binding, width, height));
        }

        let texture = self
            .live_texture
            .as_ref()
            .map(|(binding, _, _)| binding.texture)
            .ok_or_else(|| PipelineError::Capture("live texture missing".to_string()))?;
        Ok(dispatcher.with_live_texture(texture, self.source.texture_transform()))
    }

    fn spawn_worker(&self, dispatcher: Dispatcher) -> Result<SlotWorker, PipelineError> {
        let context = FrameContext {
            mode: Arc::clone(&self.mode),
            state: Arc::clone(&self.state),
            dispatcher,
            display: Arc::clone(&self.display),
            fps: self.fps.clone(),
            counters: Arc::clone(&self.counters),
            callbacks: Arc::clone(&self.callbacks),
        };

        SlotWorker::spawn("frame-processing", Arc::clone(&self.slot), move |frame| {
            context.process(frame)
        })
    }

    /// Close capture, join the processing thread, release anything still queued
    fn teardown(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        self.source.close();

        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }

        if let Some(frame) = self.slot.take() {
            debug!(frame_id = frame.frame_id, "Releasing queued frame on teardown");
            frame.release();
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_payload() {
        let payload = panic::catch_unwind(|| {
            panic!("plane {} out of range", 2);
        })
        .unwrap_err();
        assert_eq!(panic_message(&*payload), "plane 2 out of range");

        let payload = panic::catch_unwind(|| {
            panic!("static message");
        })
        .unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");

        let payload = panic::catch_unwind(|| {
            panic::panic_any(7u8);
        })
        .unwrap_err();
        assert_eq!(panic_message(&*payload), "unknown panic");
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.fps_window = 12;
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.fps_window, 12);
        assert_eq!(settings.edge_variant, config.live_variant);
    }
}
