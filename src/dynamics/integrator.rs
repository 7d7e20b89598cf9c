use std::collections::HashMap;

use glam::Vec3;

use crate::{
    collision::contact::ContactPoint,
    config::{DEFAULT_PENETRATION_CORRECTION, DEFAULT_PENETRATION_SLOP},
    core::{dimension::Dimension, rigidbody::RigidBody},
    utils::math::angular_velocity_to_quat,
};

/// Semi-implicit Euler integrator with an optional positional penetration correction.
#[derive(Debug, Clone)]
pub struct Integrator {
    /// Fraction of the penetration (beyond `slop`) removed per step; 0 disables it.
    pub penetration_correction: f32,
    pub slop: f32,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(DEFAULT_PENETRATION_CORRECTION, DEFAULT_PENETRATION_SLOP)
    }
}

impl Integrator {
    pub fn new(penetration_correction: f32, slop: f32) -> Self {
        Self {
            penetration_correction,
            slop,
        }
    }

    /// Adds `gravity * dt` to the linear velocity of a dynamic body.
    pub fn apply_gravity<D: Dimension>(&self, body: &mut RigidBody, gravity: Vec3, dt: f32) {
        if body.is_static {
            return;
        }
        body.velocity.linear += gravity * dt;
        D::constrain(body);
    }

    /// Advances position and orientation with the (already updated) velocities.
    pub fn integrate<D: Dimension>(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static {
            return;
        }
        D::constrain(body);

        body.transform.position += body.velocity.linear * dt;

        let delta = angular_velocity_to_quat(body.velocity.angular, dt);
        body.transform.rotation = (delta * body.transform.rotation).normalize();

        D::constrain(body);
    }

    /// Position offsets that push penetrating bodies apart along their contact normals.
    ///
    /// Each point contributes its share of the manifold it belongs to, so a box resting on
    /// four corners is corrected as much as a sphere touching at one point.
    /// Only positions are affected; velocities never change here.
    pub fn position_corrections(&self, bodies: &[&RigidBody], contacts: &[ContactPoint]) -> Vec<Vec3> {
        let mut corrections = vec![Vec3::ZERO; bodies.len()];
        if self.penetration_correction <= 0.0 {
            return corrections;
        }

        let mut manifold_points: HashMap<(usize, usize), usize> = HashMap::new();
        for contact in contacts {
            *manifold_points.entry(contact.indices).or_default() += 1;
        }

        for contact in contacts {
            let share = manifold_points.get(&contact.indices).copied().unwrap_or(1) as f32;
            let correction = (contact.depth - self.slop).max(0.0) * self.penetration_correction;
            if correction == 0.0 {
                continue;
            }
            let inverse_mass = |slot: Option<usize>| slot.map_or(0.0, |i| bodies[i].inverse_mass());
            let total_inv_mass = inverse_mass(contact.body_a) + inverse_mass(contact.body_b);
            if total_inv_mass <= 1e-6 {
                continue;
            }

            let push = contact.normal * (correction / (total_inv_mass * share));
            if let Some(a) = contact.body_a {
                corrections[a] -= push * bodies[a].inverse_mass();
            }
            if let Some(b) = contact.body_b {
                corrections[b] += push * bodies[b].inverse_mass();
            }
        }
        corrections
    }
}
