// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline coordinator
//!
//! ```text
//!  capture thread          processing thread              render thread
//!  ──────────────          ─────────────────              ─────────────
//!  FrameSink::deliver ──▶ LatestSlot<RawFrame> ──▶ Dispatcher::run ──▶ DisplayTarget::submit
//!                         (newest wins,             (mode read once,
//!                          older frames released)    frame released)
//! ```

mod coordinator;
pub mod dispatch;
pub mod fps;
pub mod mode;
pub mod packet;
pub mod slot;
pub mod state;
pub mod worker;

pub use coordinator::{FrameCounters, FramePipeline, FrameStats, PipelineSettings};
pub use dispatch::{Dispatcher, RawPath};
pub use fps::{FpsTracker, FrameRateSample};
pub use mode::{AtomicMode, PipelineMode};
pub use packet::{DisplayPacket, DisplayTarget, FrameInfo};
pub use slot::LatestSlot;
pub use state::{AtomicState, PipelineState};
pub use worker::SlotWorker;
