use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use voxelbox_common::{MathError, look_at, normalize};
use voxelbox_input::{InputSnapshot, MoveDirection};

/// Pitch is clamped to this many degrees either side of the horizon.
pub const MAX_PITCH_DEGREES: f32 = 89.0;

/// Initial pose and tuning for a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub world_up: Vec3,
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per unit of pointer motion.
    pub sensitivity: f32,
    /// Speed factor while sprint is held.
    pub sprint_multiplier: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(8.0, 28.0, -24.0),
            world_up: Vec3::Y,
            yaw_degrees: 90.0,
            pitch_degrees: 0.0,
            speed: 10.0,
            sensitivity: 0.1,
            sprint_multiplier: 3.0,
        }
    }
}

/// Free-look camera.
///
/// Yaw and pitch are kept in radians; the public API speaks degrees.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    speed: f32,
    sensitivity: f32,
    sprint_multiplier: f32,
}

impl Camera {
    /// Fails when `world_up` is zero or any orientation input is not finite.
    pub fn new(config: CameraConfig) -> Result<Self, MathError> {
        let world_up = normalize(config.world_up);
        let orientation_finite = config.yaw_degrees.is_finite() && config.pitch_degrees.is_finite();
        if world_up == Vec3::ZERO || !world_up.is_finite() || !orientation_finite {
            return Err(MathError::DegenerateOrientation {
                forward: Vec3::ZERO,
                up: config.world_up,
            });
        }
        Ok(Self::with_unit_up(config, world_up))
    }

    /// `world_up` must already be unit length.
    fn with_unit_up(config: CameraConfig, world_up: Vec3) -> Self {
        let mut camera = Self {
            position: config.position,
            world_up,
            yaw: config.yaw_degrees.to_radians(),
            pitch: clamp_pitch(config.pitch_degrees).to_radians(),
            front: Vec3::ZERO,
            speed: config.speed,
            sensitivity: config.sensitivity,
            sprint_multiplier: config.sprint_multiplier,
        };
        camera.update_vectors();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit strafe axis. Zero when looking straight along the up axis.
    pub fn right(&self) -> Vec3 {
        normalize(self.front.cross(self.world_up))
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw.to_degrees()
    }

    pub fn pitch_degrees(&self) -> f32 {
        self.pitch.to_degrees()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Move `speed * delta_time` world units in `direction`.
    pub fn process_keyboard(&mut self, direction: MoveDirection, delta_time: f32) {
        self.translate(direction, self.speed * delta_time);
    }

    /// Turn by pointer motion. Positive `dy` looks up. Non-finite motion is ignored.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            tracing::debug!(dx, dy, "ignoring non-finite pointer motion");
            return;
        }
        let yaw = self.yaw.to_degrees() + dx * self.sensitivity;
        let pitch = clamp_pitch(self.pitch.to_degrees() + dy * self.sensitivity);
        self.yaw = yaw.to_radians();
        self.pitch = pitch.to_radians();
        self.update_vectors();
    }

    /// Apply one frame of input: every held direction, then pointer motion.
    pub fn process_input(&mut self, input: &InputSnapshot, delta_time: f32) {
        let multiplier = if input.sprint {
            self.sprint_multiplier
        } else {
            1.0
        };
        let distance = self.speed * multiplier * delta_time;
        for &direction in &input.held {
            // Opposing keys cancel out.
            if !input.is_held(direction.opposite()) {
                self.translate(direction, distance);
            }
        }
        if input.mouse_delta.x != 0.0 || input.mouse_delta.y != 0.0 {
            // Screen space grows downward; pitch grows upward.
            self.process_mouse_movement(input.mouse_delta.x, -input.mouse_delta.y);
        }
    }

    /// World-to-camera matrix.
    ///
    /// When `front` is parallel to `world_up`, a perpendicular fallback up vector
    /// is used instead of failing.
    pub fn view_matrix(&self) -> Result<Mat4, MathError> {
        let target = self.position + self.front;
        match look_at(self.position, target, self.world_up) {
            Err(MathError::DegenerateOrientation { .. }) => {
                let fallback = self.world_up.any_orthonormal_vector();
                tracing::debug!(front = ?self.front, ?fallback, "camera aligned with up axis, using fallback up");
                look_at(self.position, target, fallback)
            }
            result => result,
        }
    }

    fn translate(&mut self, direction: MoveDirection, distance: f32) {
        let axis = match direction {
            MoveDirection::Forward => self.front,
            MoveDirection::Backward => -self.front,
            MoveDirection::Right => self.right(),
            MoveDirection::Left => -self.right(),
            MoveDirection::Up => self.world_up,
            MoveDirection::Down => -self.world_up,
        };
        self.position += axis * distance;
    }

    fn update_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.front = normalize(Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch));
    }
}

impl Default for Camera {
    fn default() -> Self {
        let config = CameraConfig::default();
        Self::with_unit_up(config, normalize(config.world_up))
    }
}

fn clamp_pitch(degrees: f32) -> f32 {
    degrees.clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES)
}
