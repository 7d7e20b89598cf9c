//! Compile-time selection between planar (2D) and spatial (3D) rigid body scenes.
//!
//! Bodies always store glam `Vec3`/`Quat` state. A planar scene lives in the XY plane and
//! rotates about Z only; the [`Dimension`] parameter decides how many generalized
//! coordinates a body owns and how contact geometry is discretized. Every routine that is
//! generic over `D: Dimension` is monomorphized, so no per-contact branching remains.

use std::f32::consts::PI;

use glam::{Mat3, Quat, Vec3};

use super::rigidbody::RigidBody;

/// Fewest pyramid edges that still enclose the tangent plane.
pub const MIN_SPATIAL_FRICTION_DIRECTIONS: usize = 3;

pub trait Dimension: Copy + Default + Send + Sync + std::fmt::Debug + 'static {
    /// Number of linear degrees of freedom (2 or 3).
    const DIM: usize;
    /// World axes carrying angular degrees of freedom.
    const ANGULAR_AXES: &'static [usize];
    /// Generalized coordinates per body: linear plus angular.
    const DOF: usize = Self::DIM + Self::ANGULAR_AXES.len();
    /// True when contact generation must stay inside the XY plane.
    const PLANAR: bool;
    const NAME: &'static str;

    /// Writes a (linear, angular) pair as generalized components into `out[..DOF]`.
    fn scatter(linear: Vec3, angular: Vec3, out: &mut [f32]) {
        for axis in 0..Self::DIM {
            out[axis] = linear[axis];
        }
        for (slot, &axis) in Self::ANGULAR_AXES.iter().enumerate() {
            out[Self::DIM + slot] = angular[axis];
        }
    }

    /// Inverse of [`Dimension::scatter`]; components without a degree of freedom are zero.
    fn gather(components: &[f32]) -> (Vec3, Vec3) {
        let mut linear = Vec3::ZERO;
        let mut angular = Vec3::ZERO;
        for axis in 0..Self::DIM {
            linear[axis] = components[axis];
        }
        for (slot, &axis) in Self::ANGULAR_AXES.iter().enumerate() {
            angular[axis] = components[Self::DIM + slot];
        }
        (linear, angular)
    }

    /// Entry `(row, col)` of the angular block of the generalized inverse mass.
    fn angular_block_entry(world_inverse_inertia: Mat3, row: usize, col: usize) -> f32 {
        let r = Self::ANGULAR_AXES[row];
        let c = Self::ANGULAR_AXES[col];
        world_inverse_inertia.col(c)[r]
    }

    /// Edges of the friction pyramid around `normal`.
    ///
    /// Each edge carries a one-sided impulse in `[0, CoF · z_norm]`. The edges of one contact
    /// are evenly spaced over a full turn of the tangent plane, so edges `j` and `k` of a
    /// pyramid with `n` edges meet at the angle `2π (j - k) / n`.
    fn friction_directions(normal: Vec3, count: usize) -> Vec<Vec3>;

    /// Corners of a box with the given half extents, in the body frame.
    fn box_corners(half_extents: Vec3) -> Vec<Vec3>;

    /// Projects a body's state onto the degrees of freedom of this dimension.
    fn constrain(body: &mut RigidBody);
}

/// Planar scenes: 2 linear + 1 angular degree of freedom per body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoD;

/// Spatial scenes: 3 linear + 3 angular degrees of freedom per body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreeD;

impl Dimension for TwoD {
    const DIM: usize = 2;
    const ANGULAR_AXES: &'static [usize] = &[2];
    const PLANAR: bool = true;
    const NAME: &'static str = "2D";

    // The tangent "plane" of a 2D contact is a line: two opposite edges.
    fn friction_directions(normal: Vec3, _count: usize) -> Vec<Vec3> {
        let tangent = Vec3::new(-normal.y, normal.x, 0.0).normalize_or_zero();
        vec![tangent, -tangent]
    }

    fn box_corners(half_extents: Vec3) -> Vec<Vec3> {
        let (x, y) = (half_extents.x, half_extents.y);
        vec![
            Vec3::new(-x, -y, 0.0),
            Vec3::new(x, -y, 0.0),
            Vec3::new(x, y, 0.0),
            Vec3::new(-x, y, 0.0),
        ]
    }

    fn constrain(body: &mut RigidBody) {
        body.transform.position.z = 0.0;
        let heading = body.transform.rotation * Vec3::X;
        body.transform.rotation = Quat::from_rotation_z(heading.y.atan2(heading.x));
        body.velocity.linear.z = 0.0;
        body.velocity.angular.x = 0.0;
        body.velocity.angular.y = 0.0;
    }
}

impl Dimension for ThreeD {
    const DIM: usize = 3;
    const ANGULAR_AXES: &'static [usize] = &[0, 1, 2];
    const PLANAR: bool = false;
    const NAME: &'static str = "3D";

    fn friction_directions(normal: Vec3, count: usize) -> Vec<Vec3> {
        let (t1, t2) = normal.any_orthonormal_pair();
        let count = count.max(MIN_SPATIAL_FRICTION_DIRECTIONS);
        (0..count)
            .map(|j| {
                let angle = 2.0 * PI * j as f32 / count as f32;
                t1 * angle.cos() + t2 * angle.sin()
            })
            .collect()
    }

    fn box_corners(half_extents: Vec3) -> Vec<Vec3> {
        let mut corners = Vec::with_capacity(8);
        for &sx in &[-1.0, 1.0] {
            for &sy in &[-1.0, 1.0] {
                for &sz in &[-1.0, 1.0] {
                    corners.push(half_extents * Vec3::new(sx, sy, sz));
                }
            }
        }
        corners
    }

    fn constrain(_body: &mut RigidBody) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{rigidbody::BodyId, shape::Shape};

    #[test]
    fn scatter_gather_planar_drops_out_of_plane_components() {
        let mut out = [0.0; 3];
        TwoD::scatter(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), &mut out);
        assert_eq!(out, [1.0, 2.0, 6.0]);
        let (linear, angular) = TwoD::gather(&out);
        assert_eq!(linear, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(angular, Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(TwoD::DOF, 3);
        assert_eq!(ThreeD::DOF, 6);
    }

    #[test]
    fn spatial_friction_directions_span_tangent_plane() {
        let normal = Vec3::Y;
        let dirs = ThreeD::friction_directions(normal, 4);
        assert_eq!(dirs.len(), 4);
        for d in &dirs {
            assert!(d.dot(normal).abs() < 1e-6);
            assert!((d.length() - 1.0).abs() < 1e-5);
        }
        assert!(dirs[0].dot(dirs[1]).abs() < 1e-5);
        assert!((dirs[0] + dirs[2]).length() < 1e-5);
        assert!((dirs[1] + dirs[3]).length() < 1e-5);

        assert_eq!(ThreeD::friction_directions(normal, 1).len(), 3);
    }

    #[test]
    fn planar_friction_has_two_opposite_edges() {
        let dirs = TwoD::friction_directions(Vec3::Y, 4);
        assert_eq!(dirs, vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
    }

    #[test]
    fn planar_constraint_flattens_state() {
        let mut body = RigidBody::dynamic(BodyId(0), Shape::sphere(1.0), 1.0)
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_velocity(Vec3::ONE, Vec3::ONE);
        body.transform.rotation = Quat::from_rotation_z(0.3) * Quat::from_rotation_x(0.2);
        TwoD::constrain(&mut body);
        assert_eq!(body.transform.position.z, 0.0);
        assert_eq!(body.velocity.linear.z, 0.0);
        assert_eq!(body.velocity.angular, Vec3::new(0.0, 0.0, 1.0));
        let heading = body.transform.rotation * Vec3::X;
        assert!(heading.z.abs() < 1e-6);
    }
}
