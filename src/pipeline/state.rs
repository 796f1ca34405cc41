// SPDX-License-Identifier: GPL-3.0-only

//! Coordinator state machine
//!
//! ```text
//! Idle -> Capturing -> {PassRaw | ProcessGray | ProcessEdges} -> Display -> Capturing
//! ```
//!
//! `Stopped` is reachable from every state and never left.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    /// Waiting for the next frame
    Capturing,
    PassRaw,
    ProcessGray,
    ProcessEdges,
    /// Packet handed to the display side
    Display,
    Stopped,
}

impl PipelineState {
    /// Whether a capture session is open
    pub fn is_running(&self) -> bool {
        !matches!(self, PipelineState::Idle | PipelineState::Stopped)
    }

    /// Whether `self -> to` is an edge of the state machine
    pub fn can_transition(&self, to: PipelineState) -> bool {
        use PipelineState::*;
        match (self, to) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            // pause
            (_, Idle) => true,
            (Idle, Capturing) => true,
            (Capturing, PassRaw | ProcessGray | ProcessEdges) => true,
            (PassRaw | ProcessGray | ProcessEdges, Display) => true,
            // frame dropped after a processing error
            (PassRaw | ProcessGray | ProcessEdges, Capturing) => true,
            (Display, Capturing) => true,
            _ => false,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Capturing => 1,
            PipelineState::PassRaw => 2,
            PipelineState::ProcessGray => 3,
            PipelineState::ProcessEdges => 4,
            PipelineState::Display => 5,
            PipelineState::Stopped => 6,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Capturing,
            2 => PipelineState::PassRaw,
            3 => PipelineState::ProcessGray,
            4 => PipelineState::ProcessEdges,
            5 => PipelineState::Display,
            6 => PipelineState::Stopped,
            _ => PipelineState::Idle,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Capturing => "capturing",
            PipelineState::PassRaw => "passing raw",
            PipelineState::ProcessGray => "processing grayscale",
            PipelineState::ProcessEdges => "processing edges",
            PipelineState::Display => "displaying",
            PipelineState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// State cell written by both the control side and the processing thread
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: PipelineState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `to` if the state machine allows it from the current state
    ///
    /// Returns the previous state on success.
    pub fn transition(&self, to: PipelineState) -> Result<PipelineState, PipelineState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                PipelineState::from_u8(current)
                    .can_transition(to)
                    .then_some(to.to_u8())
            })
            .map(PipelineState::from_u8)
            .map_err(PipelineState::from_u8)
    }
}
