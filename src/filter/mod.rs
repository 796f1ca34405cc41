// SPDX-License-Identifier: GPL-3.0-only

//! Edge detection on 8-bit luma
//!
//! Two interchangeable variants:
//!
//! - [`EdgeVariant::Canny`]: 5x5 Gaussian blur, Sobel gradients, non-maximum
//!   suppression and double-threshold hysteresis. Binary output (0 / 255).
//! - [`EdgeVariant::Sobel`]: raw 3x3 Sobel magnitude, clamped to 255, border left at 0.
//!   Cheap enough to run on every live frame.

pub mod canny;
pub mod gaussian;
pub mod sobel;

use crate::constants::{
    CANNY_BLUR_SIGMA, CANNY_BLUR_SIZE, CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD,
    MIN_FILTER_DIMENSION,
};
use crate::errors::FilterError;
use crate::frame::{EdgeMap, LumaBuffer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Edge detection algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeVariant {
    /// Blur + gradient + hysteresis, binary output
    Canny,
    /// Plain gradient magnitude
    #[default]
    Sobel,
}

impl EdgeVariant {
    pub const ALL: [EdgeVariant; 2] = [EdgeVariant::Canny, EdgeVariant::Sobel];

    pub fn name(&self) -> &'static str {
        match self {
            EdgeVariant::Canny => "canny",
            EdgeVariant::Sobel => "sobel",
        }
    }
}

impl std::fmt::Display for EdgeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EdgeVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canny" => Ok(EdgeVariant::Canny),
            "sobel" => Ok(EdgeVariant::Sobel),
            other => Err(format!("unknown edge variant '{}'", other)),
        }
    }
}

/// Tuning for the Canny variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyParams {
    /// Weak edge threshold (inclusive)
    pub low_threshold: f32,
    /// Strong edge threshold (exclusive)
    pub high_threshold: f32,
    pub blur_sigma: f32,
    /// Gaussian taps per axis, odd
    pub blur_size: usize,
}

impl Default for CannyParams {
    fn default() -> Self {
        Self {
            low_threshold: CANNY_LOW_THRESHOLD,
            high_threshold: CANNY_HIGH_THRESHOLD,
            blur_sigma: CANNY_BLUR_SIGMA,
            blur_size: CANNY_BLUR_SIZE,
        }
    }
}

impl CannyParams {
    /// Thresholds ordered, blur kernel odd with a positive sigma
    pub fn validate(&self) -> Result<(), FilterError> {
        if !(self.low_threshold >= 0.0 && self.low_threshold < self.high_threshold) {
            return Err(FilterError::InvalidParams(format!(
                "canny low threshold {} must be below high threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.blur_size == 0 || self.blur_size % 2 == 0 {
            return Err(FilterError::InvalidParams(format!(
                "blur size {} must be odd",
                self.blur_size
            )));
        }
        if self.blur_sigma.is_nan() || self.blur_sigma <= 0.0 {
            return Err(FilterError::InvalidParams(format!(
                "blur sigma {} must be positive",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// Run the selected variant; output has the input's dimensions
pub fn detect_edges(
    luma: &LumaBuffer,
    variant: EdgeVariant,
    params: &CannyParams,
) -> Result<EdgeMap, FilterError> {
    check_input(&luma.data, luma.width, luma.height)?;
    if variant == EdgeVariant::Canny {
        params.validate()?;
    }

    let (w, h) = (luma.width as usize, luma.height as usize);
    let data = match variant {
        EdgeVariant::Canny => canny::detect(&luma.data, w, h, params),
        EdgeVariant::Sobel => sobel::magnitude(&luma.data, w, h),
    };

    Ok(EdgeMap::new(luma.width, luma.height, data))
}

/// Like [`detect_edges`] but degenerate frames yield an all-zero map
pub fn detect_edges_or_blank(
    luma: &LumaBuffer,
    variant: EdgeVariant,
    params: &CannyParams,
) -> Result<EdgeMap, FilterError> {
    match detect_edges(luma, variant, params) {
        Err(FilterError::FrameTooSmall { width, height }) => {
            debug!(width, height, "Frame too small for edge detection, emitting blank map");
            Ok(EdgeMap::zeros(width, height))
        }
        other => other,
    }
}

fn check_input(data: &[u8], width: u32, height: u32) -> Result<(), FilterError> {
    if width < MIN_FILTER_DIMENSION || height < MIN_FILTER_DIMENSION {
        return Err(FilterError::FrameTooSmall { width, height });
    }
    let expected = width as usize * height as usize;
    if data.len() != expected {
        return Err(FilterError::BufferSize {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
