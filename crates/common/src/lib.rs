//! Shared math for the voxelbox engine: vector normalization, look-at view
//! matrices and OpenGL-style perspective projection.
//!
//! # Invariants
//! - Matrices are column-major and directly usable as shader uniforms.
//! - No function here returns a NaN or singular matrix; bad input is an error.

pub mod math;

pub use math::{
    MathError, OPENGL_TO_WGPU_MATRIX, create_perspective_matrix, look_at, normalize,
};
