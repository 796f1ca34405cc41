// SPDX-License-Identifier: MPL-2.0

//! Error types for the preview pipeline
//!
//! Setup errors ([`PipelineError`], [`DisplayError`], [`ConfigError`]) propagate to
//! whoever started the operation. Per-frame errors ([`FrameError`]) never leave the
//! processing thread: the frame is logged, released and skipped.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type for the binary and the viewer
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),
    #[error("Failed to install signal handler: {0}")]
    Signal(String),
    #[error("Failed to save image: {0}")]
    Save(String),
    #[error("{0}")]
    Other(String),
}

/// Input contract violations detected by the format converter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The frame is not a planar/semi-planar 4:2:0 layout we understand
    #[error("Unsupported frame format: {0}")]
    UnsupportedFormat(String),
    /// Declared dimensions and plane geometry disagree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Edge filter failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The 3x3 stencils need at least a 3x3 frame
    #[error("Frame too small for edge detection: {width}x{height}")]
    FrameTooSmall { width: u32, height: u32 },
    /// Buffer length does not match width * height
    #[error("Buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("Invalid edge filter parameters: {0}")]
    InvalidParams(String),
}

/// Anything that can go wrong while processing a single frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// The live texture path was selected but the session has no texture bound
    #[error("No live texture bound to the capture session")]
    NoLiveTexture,
    /// Processing panicked; the frame is dropped and the thread keeps running
    #[error("Frame processing panicked: {0}")]
    Panicked(String),
}

/// Pipeline lifecycle errors, surfaced synchronously to the caller
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// No capture device could be opened
    #[error("No capture source: {0}")]
    NoCaptureSource(String),
    /// The platform refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,
    /// Operation not valid in the current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
    /// Capture backend failed while opening the session
    #[error("Capture backend error: {0}")]
    Capture(String),
    /// Pipeline settings rejected before anything was started
    #[error("Invalid pipeline settings: {0}")]
    InvalidSettings(String),
    /// Worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// GPU / render thread errors; fatal to the sink
#[derive(Debug, Clone, Error)]
pub enum DisplayError {
    #[error("No suitable GPU adapter: {0}")]
    AdapterUnavailable(String),
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(String),
    /// Shader compilation or pipeline linking failed at initialization
    #[error("Shader compile/link failed: {0}")]
    ShaderCompile(String),
    /// The render thread did not answer a setup request in time
    #[error("Render thread did not respond within {0:?}")]
    SetupTimeout(Duration),
    /// The render thread has exited
    #[error("Render thread is not running")]
    RenderThreadGone,
    #[error("Unknown texture id {0}")]
    UnknownTexture(u64),
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

/// Configuration loading/validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Single-shot viewer errors
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    #[error("Failed to load image: {0}")]
    Load(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(err: image::ImageError) -> Self {
        ViewerError::Load(err.to_string())
    }
}

impl From<ConvertError> for ViewerError {
    fn from(err: ConvertError) -> Self {
        ViewerError::Frame(err.into())
    }
}

impl From<ctrlc::Error> for AppError {
    fn from(err: ctrlc::Error) -> Self {
        AppError::Signal(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Save(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_pipeline() -> AppResult<()> {
        Err(PipelineError::NoCaptureSource("camera".into()))?
    }

    #[test]
    fn test_setup_errors_lift_into_app_error() {
        let err = start_pipeline().unwrap_err();
        assert!(matches!(err, AppError::Pipeline(PipelineError::NoCaptureSource(_))));
        assert_eq!(err.to_string(), "Pipeline error: No capture source: camera");

        let err: AppError = DisplayError::SetupTimeout(Duration::from_millis(5)).into();
        assert!(matches!(err, AppError::Display(_)));

        let err: AppError = "unexpected size".into();
        assert_eq!(err.to_string(), "unexpected size");
    }

    #[test]
    fn test_frame_errors_are_transparent() {
        let err: FrameError = ConvertError::DimensionMismatch("4x4".into()).into();
        assert_eq!(err.to_string(), "Dimension mismatch: 4x4");
    }
}
