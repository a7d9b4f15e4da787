//! Camera: a yaw/pitch free-look camera and its perspective projection.
//!
//! # Invariants
//! - `front` is always unit length and derived from yaw and pitch, never set directly.
//! - Pitch stays within ±89°, so the view never flips over the pole.
//! - Movement is scaled by elapsed wall-clock time, not by frame count.

mod camera;
mod projection;

pub use camera::{Camera, CameraConfig, MAX_PITCH_DEGREES};
pub use projection::Projection;
