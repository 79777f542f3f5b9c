//! Core types: math re-exports, constants, Transform, Camera.

use thiserror::Error;

pub use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

pub mod camera;
pub mod transform;

/// Tolerance used for float comparisons throughout the loader.
pub const EPSILON: f32 = 0.00001;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid resolution {0}x{1}: both sides must be non-zero")]
    InvalidResolution(u32, u32),
    #[error("degenerate camera: {0}")]
    DegenerateCamera(&'static str),
}

pub type CoreResult<T> = Result<T, CoreError>;
