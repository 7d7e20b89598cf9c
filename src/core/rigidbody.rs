use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::{
    shape::Shape,
    types::{MassProperties, Material, Transform, Velocity},
};
use crate::error::{PhysicsError, Result};

/// Caller-chosen identifier of a rigid body. The driver refuses to archive an id twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// Core rigid body description storing kinematic state and properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub id: BodyId,
    pub shape: Shape,
    pub transform: Transform,
    pub velocity: Velocity,
    pub material: Material,
    pub is_static: bool,
    mass_properties: MassProperties,
    inverse_mass: f32,
    inverse_inertia: Mat3,
}

impl RigidBody {
    /// Dynamic body whose inertia is derived from `shape` as a solid of mass `mass`.
    pub fn dynamic(id: BodyId, shape: Shape, mass: f32) -> Self {
        let mass_properties = shape.mass_properties(mass);
        let mut body = Self {
            id,
            shape,
            transform: Transform::default(),
            velocity: Velocity::default(),
            material: Material::default(),
            is_static: false,
            mass_properties,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
        };
        body.recompute_inverses();
        body
    }

    /// Immovable body: infinite mass, never integrated.
    pub fn fixed(id: BodyId, shape: Shape) -> Self {
        Self {
            id,
            shape,
            transform: Transform::default(),
            velocity: Velocity::default(),
            material: Material::default(),
            is_static: true,
            mass_properties: MassProperties::new(0.0, Mat3::ZERO),
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.set_velocity(linear, angular);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_mass_properties(mut self, props: MassProperties) -> Self {
        self.set_mass_properties(props);
        self
    }

    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.velocity.linear = linear;
        self.velocity.angular = angular;
    }

    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn set_mass_properties(&mut self, props: MassProperties) {
        self.mass_properties = props;
        self.recompute_inverses();
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.is_static {
            0.0
        } else {
            self.inverse_mass
        }
    }

    /// Body-frame inverse inertia tensor.
    pub fn inverse_inertia(&self) -> Mat3 {
        if self.is_static {
            Mat3::ZERO
        } else {
            self.inverse_inertia
        }
    }

    /// Inverse inertia tensor rotated into the world frame, `R I⁻¹ Rᵀ`.
    pub fn world_inverse_inertia(&self) -> Mat3 {
        let rotation = Mat3::from_quat(self.transform.rotation);
        rotation * self.inverse_inertia() * rotation.transpose()
    }

    /// Checks that the body can take part in the simulation.
    pub fn validate(&self, index: usize) -> Result<()> {
        self.shape.validate()?;
        if self.is_static {
            return Ok(());
        }
        if matches!(self.shape, Shape::Plane { .. }) {
            return Err(PhysicsError::InvalidShape {
                reason: "planes can only be attached to static bodies",
            });
        }
        let mass = self.mass_properties.mass;
        if !(mass.is_finite() && mass > 0.0) {
            return Err(PhysicsError::DegenerateMass {
                index,
                reason: "mass must be positive and finite",
            });
        }
        let det = self.mass_properties.inertia.determinant();
        if !(det.is_finite() && det.abs() > f32::EPSILON) {
            return Err(PhysicsError::DegenerateMass {
                index,
                reason: "inertia tensor is singular",
            });
        }
        if !(self.transform.position.is_finite()
            && self.transform.rotation.is_finite()
            && self.velocity.linear.is_finite()
            && self.velocity.angular.is_finite())
        {
            return Err(PhysicsError::NumericalDivergence { index });
        }
        Ok(())
    }

    fn recompute_inverses(&mut self) {
        self.inverse_mass = if self.mass_properties.mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / self.mass_properties.mass
        };
        let det = self.mass_properties.inertia.determinant();
        self.inverse_inertia = if det.abs() < f32::EPSILON {
            Mat3::ZERO
        } else {
            self.mass_properties.inertia.inverse()
        };
    }
}
