//! Scatters solved contact impulses back into body velocities.

use crate::{
    core::{dimension::Dimension, rigidbody::RigidBody},
    linalg::{SparseMatrix, VectorN},
};

/// Generalized velocity change `M⁻¹ (Jᵀ z_norm + Dᵀ z_fric)`.
pub fn velocity_change(
    inv_mass: &SparseMatrix,
    jacobian_t: &SparseMatrix,
    fric_jacobian_t: &SparseMatrix,
    z_norm: &VectorN,
    z_fric: &VectorN,
) -> VectorN {
    let mut impulse = jacobian_t.mul_vector(z_norm);
    impulse.axpy(1.0, &fric_jacobian_t.mul_vector(z_fric));
    inv_mass.mul_vector(&impulse)
}

/// Adds the velocity change of the solved impulses to every dynamic body.
///
/// `bodies` must yield the archive in index order. Only velocities are modified; positions
/// are left to the integrator. Returns the generalized velocity change that was applied.
pub fn apply_impulse<'a, D: Dimension>(
    bodies: impl IntoIterator<Item = &'a mut RigidBody>,
    inv_mass: &SparseMatrix,
    jacobian_t: &SparseMatrix,
    fric_jacobian_t: &SparseMatrix,
    z_norm: &VectorN,
    z_fric: &VectorN,
) -> VectorN {
    let delta = velocity_change(inv_mass, jacobian_t, fric_jacobian_t, z_norm, z_fric);
    for (index, body) in bodies.into_iter().enumerate() {
        if body.is_static {
            continue;
        }
        let base = index * D::DOF;
        let (linear, angular) = D::gather(&delta.as_slice()[base..base + D::DOF]);
        body.velocity.linear += linear;
        body.velocity.angular += angular;
    }
    delta
}
