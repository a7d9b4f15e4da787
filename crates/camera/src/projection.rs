use glam::Mat4;
use serde::{Deserialize, Serialize};
use voxelbox_common::{MathError, create_perspective_matrix};

/// Perspective projection parameters. Validated when the matrix is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Projection {
    pub fov_degrees: f32,
    /// Viewport width divided by height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    /// OpenGL-convention perspective matrix.
    pub fn matrix(&self) -> Result<Mat4, MathError> {
        create_perspective_matrix(self.fov_degrees, self.aspect, self.near, self.far)
    }

    /// Track a resized viewport. A zero-sized viewport (minimized window) is ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }
}
