//! Geometry and color transforms passed through to the texture backend.

pub mod affine;
pub mod color;
