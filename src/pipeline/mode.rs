// SPDX-License-Identifier: GPL-3.0-only

//! Output mode selector shared between the control side and the processing thread

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// What the preview shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Camera output as-is (zero-copy live texture when available)
    #[default]
    Raw,
    /// Luma only
    Grayscale,
    /// Edge map
    Edges,
}

impl PipelineMode {
    pub const ALL: [PipelineMode; 3] = [
        PipelineMode::Raw,
        PipelineMode::Grayscale,
        PipelineMode::Edges,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineMode::Raw => "raw",
            PipelineMode::Grayscale => "grayscale",
            PipelineMode::Edges => "edges",
        }
    }

    /// Next mode in the RAW -> GRAYSCALE -> EDGES cycle
    pub fn next(&self) -> Self {
        match self {
            PipelineMode::Raw => PipelineMode::Grayscale,
            PipelineMode::Grayscale => PipelineMode::Edges,
            PipelineMode::Edges => PipelineMode::Raw,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            PipelineMode::Raw => 0,
            PipelineMode::Grayscale => 1,
            PipelineMode::Edges => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineMode::Grayscale,
            2 => PipelineMode::Edges,
            _ => PipelineMode::Raw,
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(PipelineMode::Raw),
            "gray" | "grey" | "grayscale" | "greyscale" => Ok(PipelineMode::Grayscale),
            "edge" | "edges" => Ok(PipelineMode::Edges),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Lock-free [`PipelineMode`] cell
///
/// Writers publish with `Release`, the processing thread reads with `Acquire` once
/// at the start of each frame and uses that snapshot for the whole frame.
#[derive(Debug)]
pub struct AtomicMode(AtomicU8);

impl AtomicMode {
    pub fn new(mode: PipelineMode) -> Self {
        Self(AtomicU8::new(mode.to_u8()))
    }

    pub fn load(&self) -> PipelineMode {
        PipelineMode::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, mode: PipelineMode) {
        self.0.store(mode.to_u8(), Ordering::Release);
    }

    /// Store and return the previous mode
    pub fn swap(&self, mode: PipelineMode) -> PipelineMode {
        PipelineMode::from_u8(self.0.swap(mode.to_u8(), Ordering::AcqRel))
    }
}

impl Default for AtomicMode {
    fn default() -> Self {
        Self::new(PipelineMode::default())
    }
}
