//! Turns broad-phase candidate pairs into contact manifolds.

use glam::Vec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{collidable::CollidableObject, narrowphase::NarrowPhase};
use crate::core::dimension::Dimension;

/// One point of a contact manifold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifoldPoint {
    pub position: Vec3,
    /// Penetration depth; zero when just touching, slightly negative inside the margin.
    pub depth: f32,
}

/// Contact between two archived objects. `normal` points from `body_a` towards `body_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactManifold {
    pub body_a: usize,
    pub body_b: usize,
    pub normal: Vec3,
    pub points: Vec<ManifoldPoint>,
}

/// Everything the narrow phase found during one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionDetectionResult {
    pub manifolds: Vec<ContactManifold>,
}

impl CollisionDetectionResult {
    pub fn clear(&mut self) {
        self.manifolds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    pub fn num_manifolds(&self) -> usize {
        self.manifolds.len()
    }

    pub fn num_contact_points(&self) -> usize {
        self.manifolds.iter().map(|m| m.points.len()).sum()
    }

    pub fn involves(&self, body: usize) -> bool {
        self.manifolds
            .iter()
            .any(|m| m.body_a == body || m.body_b == body)
    }
}

fn collide_pair<D: Dimension>(
    objects: &[&CollidableObject],
    (a, b): (usize, usize),
    margin: f32,
) -> Option<ContactManifold> {
    let (object_a, object_b) = (objects[a], objects[b]);
    if object_a.is_static && object_b.is_static {
        return None;
    }
    let (normal, points) = NarrowPhase::collide::<D>(object_a, object_b, margin)?;
    Some(ContactManifold {
        body_a: a,
        body_b: b,
        normal,
        points,
    })
}

/// Runs the narrow phase over `pairs`; manifolds keep the order of `pairs`.
pub fn detect<D: Dimension>(
    objects: &[&CollidableObject],
    pairs: &[(usize, usize)],
    margin: f32,
) -> CollisionDetectionResult {
    #[cfg(feature = "parallel")]
    let manifolds = pairs
        .par_iter()
        .filter_map(|&pair| collide_pair::<D>(objects, pair, margin))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let manifolds = pairs
        .iter()
        .filter_map(|&pair| collide_pair::<D>(objects, pair, margin))
        .collect();

    CollisionDetectionResult { manifolds }
}
