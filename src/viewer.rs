// SPDX-License-Identifier: GPL-3.0-only

//! Single-shot image path
//!
//! Decodes one still image and renders it in any pipeline mode, reusing the same
//! converter and edge filter as the live path. Stills default to the Canny variant.

use crate::config::Config;
use crate::convert;
use crate::errors::{FrameError, ViewerError};
use crate::filter;
use crate::frame::RgbaBuffer;
use crate::pipeline::PipelineMode;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Load `path` and render it as `mode` would show it
pub fn process_image(path: &Path, mode: PipelineMode, config: &Config) -> Result<RgbaBuffer, ViewerError> {
    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    info!(path = %path.display(), width, height, %mode, "Processing still image");

    process_rgba(RgbaBuffer::new(width, height, image.into_raw()), mode, config)
}

/// Render an already decoded RGBA image as `mode` would show it
pub fn process_rgba(
    rgba: RgbaBuffer,
    mode: PipelineMode,
    config: &Config,
) -> Result<RgbaBuffer, ViewerError> {
    let started = Instant::now();
    let output = match mode {
        PipelineMode::Raw => rgba,
        PipelineMode::Grayscale => convert::luma_to_rgba(&convert::rgba_to_luma(&rgba)?),
        PipelineMode::Edges => {
            let luma = convert::rgba_to_luma(&rgba)?;
            let edges = filter::detect_edges_or_blank(&luma, config.still_variant, &config.canny)
                .map_err(FrameError::from)?;
            debug!(
                variant = %config.still_variant,
                edge_pixels = edges.count_nonzero(),
                "Still edge map computed"
            );
            convert::edges_to_rgba(&edges)
        }
    };
    debug!(elapsed = ?started.elapsed(), %mode, "Still image processed");
    Ok(output)
}
