// SPDX-License-Identifier: MPL-2.0

//! OpenEdge - live camera preview with grayscale and edge-map modes
//!
//! This library provides a three-mode preview pipeline (RAW, GRAYSCALE, EDGES):
//! YUV 4:2:0 frames come in from a capture source, are converted or edge-filtered on
//! a processing thread, and are drawn by a render thread through wgpu.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`frame`]: Raw camera frames, planes and derived pixel buffers
//! - [`convert`]: YUV to luma/RGBA conversion
//! - [`filter`]: Canny and Sobel edge detection
//! - [`pipeline`]: Mode/state machine, frame hand-off and FPS tracking
//! - [`capture`]: Capture source boundary, synthetic camera and buffer pool
//! - [`display`]: Texture sink, wgpu backend and render thread
//! - [`viewer`]: Single-shot image path
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let config = openedge::Config::load()?;
//! let edges = openedge::viewer::process_image(path, openedge::PipelineMode::Edges, &config)?;
//! ```

pub mod capture;
pub mod config;
pub mod constants;
pub mod convert;
pub mod display;
pub mod errors;
pub mod filter;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod viewer;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use filter::{CannyParams, EdgeVariant};
pub use frame::{FrameFormat, RawFrame, RgbaBuffer};
pub use pipeline::{FramePipeline, PipelineMode, PipelineState};
