// SPDX-License-Identifier: GPL-3.0-only

//! WGSL sources for the display quads
//!
//! Both shaders share one bind group layout: texture (0), sampler (1) and the
//! [`QuadUniform`](super::wgpu_backend::QuadUniform) buffer (2).

use super::ShaderVariant;

pub const QUAD_2D: &str = include_str!("quad_2d.wgsl");
pub const QUAD_EXTERNAL: &str = include_str!("quad_external.wgsl");

pub fn source(variant: ShaderVariant) -> &'static str {
    match variant {
        ShaderVariant::Plain2d => QUAD_2D,
        ShaderVariant::External => QUAD_EXTERNAL,
    }
}
