// SPDX-License-Identifier: GPL-3.0-only

//! Dedicated render thread
//!
//! All GPU state lives on one thread that owns a [`DisplaySink`]. Other threads talk
//! to it through a [`RenderHandle`]: display packets go through a latest-wins slot
//! (a packet nobody drew yet is replaced by a newer one), control requests go
//! through a small bounded command queue.

use super::backend::GpuBackend;
use super::{DisplaySink, TextureId};
use crate::capture::{LiveTextureBinding, LiveTextureFeed};
use crate::constants::RENDER_COMMAND_QUEUE_DEPTH;
use crate::errors::DisplayError;
use crate::frame::RgbaBuffer;
use crate::pipeline::{DisplayPacket, DisplayTarget, LatestSlot};
use crossbeam_channel::{
    Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError, bounded, select,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

enum RenderCommand {
    CreateLiveTexture {
        width: u32,
        height: u32,
        reply: Sender<Result<TextureId, DisplayError>>,
    },
    ReleaseTexture(TextureId),
    UpdateLive {
        texture: TextureId,
        image: RgbaBuffer,
    },
    Shutdown,
}

#[derive(Debug, Default)]
struct RenderCounters {
    presented: AtomicU64,
    superseded: AtomicU64,
    live_updates: AtomicU64,
    live_updates_dropped: AtomicU64,
    present_errors: AtomicU64,
}

/// Snapshot of render thread activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Packets drawn
    pub presented: u64,
    /// Packets replaced before the render thread got to them
    pub superseded: u64,
    /// Live texture images uploaded
    pub live_updates: u64,
    /// Live texture images dropped because the command queue was full
    pub live_updates_dropped: u64,
    /// Packets that could not be drawn
    pub present_errors: u64,
}

/// Cloneable sender side of the render thread; this is the pipeline's display target
#[derive(Clone)]
pub struct RenderHandle {
    commands: Sender<RenderCommand>,
    packets: Arc<LatestSlot<DisplayPacket>>,
    counters: Arc<RenderCounters>,
    alive: Arc<AtomicBool>,
}

impl RenderHandle {
    pub fn stats(&self) -> RenderStats {
        RenderStats {
            presented: self.counters.presented.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            live_updates: self.counters.live_updates.load(Ordering::Relaxed),
            live_updates_dropped: self.counters.live_updates_dropped.load(Ordering::Relaxed),
            present_errors: self.counters.present_errors.load(Ordering::Relaxed),
        }
    }

    /// False once the render loop has exited
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn live_feed(&self, texture: TextureId) -> LiveTextureFeed {
        let commands = self.commands.clone();
        let counters = Arc::clone(&self.counters);
        LiveTextureFeed::new(move |image| {
            match commands.try_send(RenderCommand::UpdateLive { texture, image }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    counters.live_updates_dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        })
    }
}

impl DisplayTarget for RenderHandle {
    fn submit(&self, packet: DisplayPacket) {
        if let Some(stale) = self.packets.put(packet) {
            trace!(frame_id = stale.frame_id(), "Display packet superseded");
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn create_live_texture(
        &self,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<LiveTextureBinding, DisplayError> {
        let (reply, answer) = bounded(1);
        let command = RenderCommand::CreateLiveTexture {
            width,
            height,
            reply,
        };
        match self.commands.send_timeout(command, timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(DisplayError::SetupTimeout(timeout)),
            Err(SendTimeoutError::Disconnected(_)) => return Err(DisplayError::RenderThreadGone),
        }

        let texture = match answer.recv_timeout(timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                warn!(width, height, ?timeout, "Render thread did not answer texture request");
                return Err(DisplayError::SetupTimeout(timeout));
            }
            Err(RecvTimeoutError::Disconnected) => return Err(DisplayError::RenderThreadGone),
        };

        Ok(LiveTextureBinding {
            texture,
            feed: self.live_feed(texture),
        })
    }

    fn release_live_texture(&self, texture: TextureId) {
        // Blocking send; the queue is drained continuously while the loop runs
        let _ = self.commands.send(RenderCommand::ReleaseTexture(texture));
    }
}

/// Owner of the render thread; shuts it down on drop
pub struct RenderThread {
    handle: RenderHandle,
    thread: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Start the render thread, building the backend on it
    ///
    /// Fails with [`DisplayError::SetupTimeout`] if the backend is not ready within
    /// `init_timeout`, or with the factory's own error.
    pub fn spawn<B, F>(factory: F, init_timeout: Duration) -> Result<Self, DisplayError>
    where
        B: GpuBackend + 'static,
        F: FnOnce() -> Result<B, DisplayError> + Send + 'static,
    {
        let (commands_tx, commands_rx) = bounded(RENDER_COMMAND_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = bounded(1);

        let handle = RenderHandle {
            commands: commands_tx,
            packets: Arc::new(LatestSlot::new()),
            counters: Arc::new(RenderCounters::default()),
            alive: Arc::new(AtomicBool::new(true)),
        };

        let packets = Arc::clone(&handle.packets);
        let counters = Arc::clone(&handle.counters);
        let alive = Arc::clone(&handle.alive);

        let thread = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let backend = match factory() {
                    Ok(backend) => backend,
                    Err(e) => {
                        alive.store(false, Ordering::Release);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    // Caller gave up waiting
                    alive.store(false, Ordering::Release);
                    return;
                }
                render_loop(DisplaySink::new(backend), commands_rx, packets, counters);
                alive.store(false, Ordering::Release);
            })
            .map_err(|e| DisplayError::DeviceCreation(format!("failed to spawn render thread: {}", e)))?;

        match ready_rx.recv_timeout(init_timeout) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(?init_timeout, "Render backend setup timed out");
                return Err(DisplayError::SetupTimeout(init_timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                return Err(DisplayError::RenderThreadGone);
            }
        }

        info!("Render thread started");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> RenderStats {
        self.handle.stats()
    }

    /// Stop the loop and join the thread
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            debug!("Shutting down render thread");
            let _ = self.handle.commands.send(RenderCommand::Shutdown);
            if thread.join().is_err() {
                error!("Render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop<B: GpuBackend>(
    mut sink: DisplaySink<B>,
    commands: Receiver<RenderCommand>,
    packets: Arc<LatestSlot<DisplayPacket>>,
    counters: Arc<RenderCounters>,
) {
    let wake = packets.wake_receiver().clone();

    loop {
        let keep_running = select! {
            recv(commands) -> command => match command {
                Ok(command) => handle_command(&mut sink, command, &counters),
                Err(_) => false,
            },
            recv(wake) -> _ => present_latest(&mut sink, &packets, &counters),
        };
        if !keep_running {
            break;
        }
    }

    // Drop anything queued so pixel buffers are freed with the thread
    drop(packets.take());
    debug!("Render loop exited");
}

/// Returns false when the loop should exit
fn handle_command<B: GpuBackend>(
    sink: &mut DisplaySink<B>,
    command: RenderCommand,
    counters: &RenderCounters,
) -> bool {
    match command {
        RenderCommand::CreateLiveTexture {
            width,
            height,
            reply,
        } => {
            let _ = reply.send(sink.create_live_texture(width, height));
        }
        RenderCommand::ReleaseTexture(texture) => sink.release_live_texture(texture),
        RenderCommand::UpdateLive { texture, image } => {
            match sink.update_live_texture(texture, &image) {
                Ok(()) => {
                    counters.live_updates.fetch_add(1, Ordering::Relaxed);
                }
                // Image for a texture released in the meantime
                Err(DisplayError::UnknownTexture(_)) => {}
                Err(e) => warn!(error = %e, "Live texture update failed"),
            }
        }
        RenderCommand::Shutdown => return false,
    }
    true
}

/// Draw the waiting packet, if any; returns false on a fatal backend error
fn present_latest<B: GpuBackend>(
    sink: &mut DisplaySink<B>,
    packets: &LatestSlot<DisplayPacket>,
    counters: &RenderCounters,
) -> bool {
    let Some(packet) = packets.take() else {
        return true;
    };
    match sink.present(&packet) {
        Ok(()) => {
            counters.presented.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(e @ (DisplayError::UnknownTexture(_) | DisplayError::InvalidBuffer(_))) => {
            counters.present_errors.fetch_add(1, Ordering::Relaxed);
            warn!(frame_id = packet.frame_id(), error = %e, "Skipping undrawable packet");
            true
        }
        Err(e) => {
            counters.present_errors.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "Presenting failed, stopping render thread");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{RecordingBackend, ShaderVariant, TextureTransform};
    use crate::pipeline::PipelineMode;
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn gray_packet(frame_id: u64) -> DisplayPacket {
        DisplayPacket::Pixels {
            buffer: RgbaBuffer::new(2, 2, vec![frame_id as u8; 16]),
            mode: PipelineMode::Grayscale,
            frame_id,
        }
    }

    #[test]
    fn test_presents_submitted_packets() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut render = RenderThread::spawn(move || Ok(backend), TIMEOUT).unwrap();
        let handle = render.handle();

        handle.submit(gray_packet(7));
        assert!(wait_for(|| handle.stats().presented == 1));
        assert_eq!(log.last_frame().unwrap().content.data[0], 7);

        render.shutdown();
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_live_texture_round_trip() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let render = RenderThread::spawn(move || Ok(backend), TIMEOUT).unwrap();
        let handle = render.handle();

        let binding = handle.create_live_texture(1, 1, TIMEOUT).unwrap();
        handle.submit(DisplayPacket::LiveTexture {
            texture: binding.texture,
            transform: TextureTransform::IDENTITY,
            frame_id: 0,
        });
        assert!(wait_for(|| handle.stats().presented == 1));

        binding.feed.push(RgbaBuffer::new(1, 1, vec![1, 2, 3, 255]));
        assert!(wait_for(|| handle.stats().live_updates == 1));
        let frame = log.last_frame().unwrap();
        assert_eq!(frame.variant, ShaderVariant::External);
        assert_eq!(frame.content.data, vec![1, 2, 3, 255]);
    }

    #[test]
    fn test_factory_error_is_returned() {
        let result = RenderThread::spawn(
            || -> Result<RecordingBackend, DisplayError> {
                Err(DisplayError::AdapterUnavailable("none".to_string()))
            },
            TIMEOUT,
        );
        assert!(matches!(result, Err(DisplayError::AdapterUnavailable(_))));
    }

    #[test]
    fn test_slow_backend_times_out() {
        let result = RenderThread::spawn(
            || {
                thread::sleep(Duration::from_millis(200));
                Ok(RecordingBackend::new())
            },
            Duration::from_millis(20),
        );
        assert!(matches!(result, Err(DisplayError::SetupTimeout(_))));
    }

    #[test]
    fn test_requests_after_shutdown_fail() {
        let mut render = RenderThread::spawn(|| Ok(RecordingBackend::new()), TIMEOUT).unwrap();
        let handle = render.handle();
        render.shutdown();

        assert!(matches!(
            handle.create_live_texture(4, 4, Duration::from_millis(50)),
            Err(DisplayError::RenderThreadGone)
        ));
    }
}
