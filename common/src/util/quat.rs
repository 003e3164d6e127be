use vek::*;

/// Begone ye NaN's
/// Spherical interpolation between two rotations that takes the shortest arc,
/// falls back to a normalized lerp when the rotations are nearly identical
/// (where `vek`s slerp produces NaN's) and clamps `factor` to `[0, 1]`.
pub fn slerp_quat(from: Quaternion<f32>, to: Quaternion<f32>, factor: f32) -> Quaternion<f32> {
    let factor = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let from = from.into_vec4();
    let mut to = to.into_vec4();
    let mut dot = from.dot(to);
    // q and -q are the same rotation, go the short way around
    if dot < 0.0 {
        to = -to;
        dot = -dot;
    }

    let blended = if dot > 0.9995 {
        from + (to - from) * factor
    } else {
        let theta = dot.min(1.0).acos();
        let sin_theta = theta.sin();
        from * (((1.0 - factor) * theta).sin() / sin_theta)
            + to * ((factor * theta).sin() / sin_theta)
    };

    Quaternion::from_vec4(blended.try_normalized().unwrap_or(from))
}

/// Rotation from level data Euler angles, given in half turns and applied in
/// X, Y, Z order.
pub fn quat_from_half_turns(rotation: [f32; 3]) -> Quaternion<f32> {
    let [x, y, z] = rotation.map(|a| a * std::f32::consts::PI);
    Quaternion::rotation_x(x) * Quaternion::rotation_y(y) * Quaternion::rotation_z(z)
}

/// Heading of a rotation around the Y axis, measured from +Z towards +X.
pub fn yaw_of(rot: Quaternion<f32>) -> f32 {
    let fwd = rot * Vec3::unit_z();
    fwd.x.atan2(fwd.z)
}
