use glam::{Mat3, Vec3};

use super::bvh::Aabb;
use crate::core::{dimension::Dimension, rigidbody::RigidBody, shape::Shape};

/// World-space geometry of a collidable object.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldShape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Box {
        center: Vec3,
        /// Columns are the box axes in world space.
        axes: Mat3,
        half_extents: Vec3,
        /// World-space corners, as many as the scene dimension uses.
        corners: Vec<Vec3>,
    },
    /// Half-space `normal · x <= offset` with a unit `normal`.
    Plane {
        normal: Vec3,
        offset: f32,
    },
}

/// Snapshot of a rigid body's geometry used by the narrow phase.
#[derive(Debug, Clone, PartialEq)]
pub struct CollidableObject {
    pub shape: WorldShape,
    pub is_static: bool,
}

impl CollidableObject {
    /// Derives the world-space geometry of `body` for a scene of dimension `D`.
    pub fn from_body<D: Dimension>(body: &RigidBody) -> Self {
        let transform = &body.transform;
        let shape = match &body.shape {
            Shape::Sphere { radius } => WorldShape::Sphere {
                center: transform.position,
                radius: *radius,
            },
            Shape::Box { half_extents } => {
                let half_extents = *half_extents;
                let corners = D::box_corners(half_extents)
                    .into_iter()
                    .map(|corner| transform.transform_point(corner))
                    .collect();
                WorldShape::Box {
                    center: transform.position,
                    axes: Mat3::from_quat(transform.rotation),
                    half_extents,
                    corners,
                }
            }
            Shape::Plane { normal, offset } => {
                let length = normal.length();
                let world_normal = transform.transform_vector(*normal / length);
                WorldShape::Plane {
                    normal: world_normal,
                    offset: offset / length + world_normal.dot(transform.position),
                }
            }
        };
        Self {
            shape,
            is_static: body.is_static,
        }
    }

    /// World-space bounds; `None` for unbounded shapes.
    pub fn aabb(&self) -> Option<Aabb> {
        match &self.shape {
            WorldShape::Sphere { center, radius } => {
                Some(Aabb::from_center_extent(*center, Vec3::splat(*radius)))
            }
            WorldShape::Box {
                center,
                axes,
                half_extents,
                ..
            } => {
                let extent = axes.x_axis.abs() * half_extents.x
                    + axes.y_axis.abs() * half_extents.y
                    + axes.z_axis.abs() * half_extents.z;
                Some(Aabb::from_center_extent(*center, extent))
            }
            WorldShape::Plane { .. } => None,
        }
    }
}
