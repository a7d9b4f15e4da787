use glam::{Mat4, Vec3, Vec4};

/// Below this squared length a cross product is treated as zero.
const PARALLEL_EPSILON: f32 = 1.0e-12;

/// Remaps OpenGL clip-space depth `[-1, 1]` to the `[0, 1]` range wgpu expects.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

/// Errors from view and projection construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathError {
    #[error("degenerate orientation: forward {forward:?} is parallel to up {up:?}")]
    DegenerateOrientation { forward: Vec3, up: Vec3 },
    #[error("invalid projection parameters: {0}")]
    InvalidProjectionParameters(String),
}

/// Scale `v` to unit length. A zero vector is returned unchanged.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = v.length();
    if len == 0.0 { v } else { v / len }
}

/// Right-handed look-at view matrix.
///
/// Builds the camera basis by Gram-Schmidt (`z = target - eye`, `x = z × up`,
/// `y = x × z`) and lays it out column-major so that world-space points are
/// rotated into camera space and translated by `-dot(axis, eye)`.
///
/// Non-finite inputs are reported as a degenerate orientation.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Result<Mat4, MathError> {
    let z = normalize(target - eye);
    let degenerate = || MathError::DegenerateOrientation { forward: z, up };
    if !(eye.is_finite() && target.is_finite() && up.is_finite() && z.is_finite()) {
        return Err(degenerate());
    }
    let side = z.cross(up);
    if z == Vec3::ZERO || !side.is_finite() || side.length_squared() <= PARALLEL_EPSILON {
        return Err(degenerate());
    }
    let x = side.normalize();
    if !x.is_finite() {
        return Err(degenerate());
    }
    let y = x.cross(z);

    Ok(Mat4::from_cols(
        Vec4::new(x.x, y.x, -z.x, 0.0),
        Vec4::new(x.y, y.y, -z.y, 0.0),
        Vec4::new(x.z, y.z, -z.z, 0.0),
        Vec4::new(-x.dot(eye), -y.dot(eye), z.dot(eye), 1.0),
    ))
}

/// OpenGL-style right-handed perspective projection, column-major.
///
/// Requires `0 < fov_degrees < 180`, `aspect > 0` and `far > near > 0`.
pub fn create_perspective_matrix(
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Result<Mat4, MathError> {
    let invalid = |msg: String| Err(MathError::InvalidProjectionParameters(msg));

    if ![fov_degrees, aspect, near, far].iter().all(|v| v.is_finite()) {
        return invalid(format!(
            "non-finite input (fov={fov_degrees}, aspect={aspect}, near={near}, far={far})"
        ));
    }
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return invalid(format!("fov {fov_degrees} must be in (0, 180) degrees"));
    }
    if aspect <= 0.0 {
        return invalid(format!("aspect {aspect} must be positive"));
    }
    if near <= 0.0 {
        return invalid(format!("near {near} must be positive"));
    }
    if far <= near {
        return invalid(format!("far {far} must be greater than near {near}"));
    }

    let tan_half_fov = (fov_degrees.to_radians() / 2.0).tan();
    let depth = far - near;

    Ok(Mat4::from_cols(
        Vec4::new(1.0 / (aspect * tan_half_fov), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 1.0 / tan_half_fov, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -(far + near) / depth, -1.0),
        Vec4::new(0.0, 0.0, -(2.0 * far * near) / depth, 0.0),
    ))
}
