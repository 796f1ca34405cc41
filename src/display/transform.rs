// SPDX-License-Identifier: GPL-3.0-only

//! Texture coordinate transforms and the fixed projection
//!
//! Matrices are 4x4, column-major, the layout WGSL expects for `mat4x4<f32>`.

/// Sensor mounting rotation as reported by the capture source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// From degrees, normalized to 0-360; anything off the right angles is `None`
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }

    /// (cos, sin) without floating point error
    fn cos_sin(&self) -> (f32, f32) {
        match self {
            Rotation::None => (1.0, 0.0),
            Rotation::Rotate90 => (0.0, 1.0),
            Rotation::Rotate180 => (-1.0, 0.0),
            Rotation::Rotate270 => (0.0, -1.0),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// UV transform applied by the external-texture shader
///
/// The display applies whatever the capture source reports; it never guesses
/// device orientation on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub matrix: [f32; 16],
}

impl TextureTransform {
    pub const IDENTITY: TextureTransform = TextureTransform {
        matrix: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Rotate about the texture center, after an optional horizontal mirror
    pub fn from_rotation(degrees: u32, mirror: bool) -> Self {
        let rotation = Rotation::from_degrees_int(degrees as i32);
        let (c, s) = rotation.cos_sin();
        let sx = if mirror { -1.0 } else { 1.0 };

        // u' = c*sx*u - s*v + tx,  v' = s*sx*u + c*v + ty
        let tx = 0.5 - 0.5 * c * sx + 0.5 * s;
        let ty = 0.5 - 0.5 * s * sx - 0.5 * c;

        Self {
            matrix: [
                c * sx, s * sx, 0.0, 0.0, //
                -s, c, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                tx, ty, 0.0, 1.0,
            ],
        }
    }

    /// Map a texture coordinate through the matrix
    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        let m = &self.matrix;
        (
            m[0] * u + m[4] * v + m[12],
            m[1] * u + m[5] * v + m[13],
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Column-major orthographic projection
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> [f32; 16] {
    let rl = right - left;
    let tb = top - bottom;
    let fn_ = far - near;
    [
        2.0 / rl, 0.0, 0.0, 0.0, //
        0.0, 2.0 / tb, 0.0, 0.0, //
        0.0, 0.0, -2.0 / fn_, 0.0, //
        -(right + left) / rl, -(top + bottom) / tb, -(far + near) / fn_, 1.0,
    ]
}

/// Full-screen quad projection: clip space maps onto itself in x and y
pub fn quad_projection() -> [f32; 16] {
    orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)
}
