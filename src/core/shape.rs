use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::types::{InertiaTensorExt, MassProperties};
use crate::error::{PhysicsError, Result};

/// Geometry attached to a rigid body, expressed in the body frame.
///
/// In a planar scene spheres act as discs and boxes as rectangles; the z component of a
/// box's half extents is ignored by the 2D contact generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    /// Half-space `normal · x <= offset`. Only static bodies may carry a plane.
    Plane {
        normal: Vec3,
        offset: f32,
    },
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::Box { half_extents }
    }

    /// Ground plane through the origin facing +Y.
    pub fn ground() -> Self {
        Shape::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        }
    }

    /// Solid-body mass properties for the given mass.
    pub fn mass_properties(&self, mass: f32) -> MassProperties {
        let inertia = match self {
            Shape::Sphere { radius } => Mat3::for_solid_sphere(*radius, mass),
            Shape::Box { half_extents } => Mat3::for_solid_box(*half_extents, mass),
            Shape::Plane { .. } => Mat3::ZERO,
        };
        MassProperties::new(mass, inertia)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Sphere { radius } if !(radius.is_finite() && *radius > 0.0) => {
                Err(PhysicsError::InvalidShape {
                    reason: "sphere radius must be positive",
                })
            }
            Shape::Box { half_extents }
                if !(half_extents.is_finite() && half_extents.min_element() > 0.0) =>
            {
                Err(PhysicsError::InvalidShape {
                    reason: "box half extents must be positive",
                })
            }
            Shape::Plane { normal, offset }
                if !(offset.is_finite() && normal.is_finite() && normal.length() > 1e-6) =>
            {
                Err(PhysicsError::InvalidShape {
                    reason: "plane normal must be non-zero",
                })
            }
            _ => Ok(()),
        }
    }
}
