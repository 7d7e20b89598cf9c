//! Additional math helpers layered on top of `glam`.

use glam::{Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// True when every component of a body state is finite.
pub fn is_finite_state(position: Vec3, rotation: Quat, linear: Vec3, angular: Vec3) -> bool {
    position.is_finite() && rotation.is_finite() && linear.is_finite() && angular.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quarter_turn_about_z() {
        let q = angular_velocity_to_quat(Vec3::new(0.0, 0.0, std::f32::consts::PI), 0.5);
        let x = q * Vec3::X;
        assert_relative_eq!(x.y, 1.0, epsilon = 1e-6);
        assert_eq!(angular_velocity_to_quat(Vec3::ZERO, 1.0), Quat::IDENTITY);
    }
}
