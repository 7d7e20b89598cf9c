//! Assembly of the generalized mass, Jacobian and velocity terms of the contact BLCP.
//!
//! Every body owns `D::DOF` consecutive generalized coordinates: its linear components
//! followed by its angular components. Static bodies keep their columns, but their inverse
//! mass block is zero and contact rows never reference them.

use glam::Vec3;

use crate::{
    collision::contact::ContactPoint,
    core::{dimension::Dimension, rigidbody::RigidBody, types::MaterialPairProperties},
    linalg::{SparseMatrix, VectorN},
};

/// Block diagonal generalized inverse mass matrix `M⁻¹`.
pub fn compute_inv_mass_matrix<D: Dimension>(bodies: &[&RigidBody]) -> SparseMatrix {
    let size = bodies.len() * D::DOF;
    let mut triplets = Vec::new();

    for (index, body) in bodies.iter().enumerate() {
        if body.is_static {
            continue;
        }
        let base = index * D::DOF;
        let inverse_mass = body.inverse_mass();
        for axis in 0..D::DIM {
            triplets.push((base + axis, base + axis, inverse_mass));
        }

        let inverse_inertia = body.world_inverse_inertia();
        let angular = D::ANGULAR_AXES.len();
        for row in 0..angular {
            for col in 0..angular {
                let value = D::angular_block_entry(inverse_inertia, row, col);
                if value != 0.0 {
                    triplets.push((base + D::DIM + row, base + D::DIM + col, value));
                }
            }
        }
    }

    SparseMatrix::from_triplets(size, size, &triplets)
}

/// Appends the Jacobian entries of one constraint direction to `triplets`.
///
/// Body B receives `[d, r_B × d]` and body A receives `[-d, -(r_A × d)]`, so the row times
/// the generalized velocity is the velocity of B relative to A along `d`.
fn push_row<D: Dimension>(
    triplets: &mut Vec<(usize, usize, f32)>,
    row: usize,
    bodies: &[&RigidBody],
    contact: &ContactPoint,
    direction: Vec3,
) {
    let mut block = [0.0f32; 6];
    for (slot, sign) in [(contact.body_a, -1.0f32), (contact.body_b, 1.0f32)] {
        let Some(index) = slot else {
            continue;
        };
        let arm = contact.position - bodies[index].transform.position;
        D::scatter(
            direction * sign,
            arm.cross(direction) * sign,
            &mut block[..D::DOF],
        );
        for (offset, &value) in block[..D::DOF].iter().enumerate() {
            if value != 0.0 {
                triplets.push((row, index * D::DOF + offset, value));
            }
        }
    }
}

/// Normal Jacobian `J`: one row per contact point.
pub fn compute_jacobian_matrix<D: Dimension>(
    bodies: &[&RigidBody],
    contacts: &[ContactPoint],
) -> SparseMatrix {
    let mut triplets = Vec::with_capacity(contacts.len() * 2 * D::DOF);
    for contact in contacts {
        push_row::<D>(&mut triplets, contact.normal_row, bodies, contact, contact.normal);
    }
    SparseMatrix::from_triplets(contacts.len(), bodies.len() * D::DOF, &triplets)
}

/// Friction Jacobian `D`: one row per friction pyramid direction.
pub fn compute_fric_jacobian_matrix<D: Dimension>(
    bodies: &[&RigidBody],
    contacts: &[ContactPoint],
) -> SparseMatrix {
    let rows: usize = contacts.iter().map(ContactPoint::num_friction_rows).sum();
    let mut triplets = Vec::with_capacity(rows * 2 * D::DOF);
    for contact in contacts {
        for (k, &direction) in contact.friction_directions.iter().enumerate() {
            push_row::<D>(
                &mut triplets,
                contact.friction_rows + k,
                bodies,
                contact,
                direction,
            );
        }
    }
    SparseMatrix::from_triplets(rows, bodies.len() * D::DOF, &triplets)
}

/// Stacked generalized velocity `[v_0, ω_0, v_1, ω_1, ...]`.
pub fn compute_generalized_velocity<D: Dimension>(bodies: &[&RigidBody]) -> VectorN {
    let mut velocity = VectorN::zeros(bodies.len() * D::DOF);
    for (index, body) in bodies.iter().enumerate() {
        let base = index * D::DOF;
        D::scatter(
            body.velocity.linear,
            body.velocity.angular,
            &mut velocity.as_mut_slice()[base..base + D::DOF],
        );
    }
    velocity
}

/// Per-contact coefficients of restitution and friction, mixed from both materials.
pub fn compute_coefficient(bodies: &[&RigidBody], contacts: &[ContactPoint]) -> (Vec<f32>, Vec<f32>) {
    contacts
        .iter()
        .map(|contact| {
            let (a, b) = contact.indices;
            let pair = MaterialPairProperties::from_materials(&bodies[a].material, &bodies[b].material);
            (pair.restitution, pair.friction)
        })
        .unzip()
}

/// Every operand of one BLCP solve.
#[derive(Debug, Clone)]
pub struct BlcpProblem {
    pub jmj: SparseMatrix,
    pub dmd: SparseMatrix,
    pub jmd: SparseMatrix,
    pub dmj: SparseMatrix,
    pub jv: VectorN,
    pub dv: VectorN,
    pub cor: Vec<f32>,
    pub cof: Vec<f32>,
}

/// Matrices kept after assembly for the impulse application.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    pub inv_mass: SparseMatrix,
    pub jacobian_t: SparseMatrix,
    pub fric_jacobian_t: SparseMatrix,
    pub problem: BlcpProblem,
}

impl AssembledSystem {
    /// Runs every assembly routine for the current contact set.
    pub fn assemble<D: Dimension>(bodies: &[&RigidBody], contacts: &[ContactPoint]) -> Self {
        let inv_mass = compute_inv_mass_matrix::<D>(bodies);
        let jacobian = compute_jacobian_matrix::<D>(bodies, contacts);
        let fric_jacobian = compute_fric_jacobian_matrix::<D>(bodies, contacts);
        let velocity = compute_generalized_velocity::<D>(bodies);
        let (cor, cof) = compute_coefficient(bodies, contacts);

        let jacobian_t = jacobian.transpose();
        let fric_jacobian_t = fric_jacobian.transpose();
        let jm = jacobian.multiply(&inv_mass);
        let dm = fric_jacobian.multiply(&inv_mass);

        let problem = BlcpProblem {
            jmj: jm.multiply(&jacobian_t),
            jmd: jm.multiply(&fric_jacobian_t),
            dmd: dm.multiply(&fric_jacobian_t),
            dmj: dm.multiply(&jacobian_t),
            jv: jacobian.mul_vector(&velocity),
            dv: fric_jacobian.mul_vector(&velocity),
            cor,
            cof,
        };

        Self {
            inv_mass,
            jacobian_t,
            fric_jacobian_t,
            problem,
        }
    }
}
