use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::detection::CollisionDetectionResult;
use crate::{config::DEFAULT_FRICTION_DIRECTIONS, core::dimension::Dimension};

/// A single discretized contact: one normal constraint row plus its friction rows.
///
/// Static bodies contribute no Jacobian columns, so their slot is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub body_a: Option<usize>,
    pub body_b: Option<usize>,
    /// Archive indices of both bodies, static or not.
    pub indices: (usize, usize),
    pub position: Vec3,
    /// Unit normal pointing from A to B.
    pub normal: Vec3,
    pub depth: f32,
    /// One-sided edges of the friction pyramid.
    pub friction_directions: Vec<Vec3>,
    /// Row of this contact in `J` and `z_norm`.
    pub normal_row: usize,
    /// First row of this contact in `D` and `z_fric`.
    pub friction_rows: usize,
}

impl ContactPoint {
    pub fn num_friction_rows(&self) -> usize {
        self.friction_directions.len()
    }
}

/// Expands contact manifolds into solver rows. Rebuilt every step.
#[derive(Debug, Clone)]
pub struct ContactPointManager {
    points: Vec<ContactPoint>,
    friction_directions: usize,
    friction_rows: usize,
}

impl Default for ContactPointManager {
    fn default() -> Self {
        Self::new(DEFAULT_FRICTION_DIRECTIONS)
    }
}

impl ContactPointManager {
    pub fn new(friction_directions: usize) -> Self {
        Self {
            points: Vec::new(),
            friction_directions: friction_directions.max(1),
            friction_rows: 0,
        }
    }

    /// Number of friction directions requested for spatial contacts.
    pub fn friction_directions(&self) -> usize {
        self.friction_directions
    }

    pub fn set_friction_directions(&mut self, count: usize) {
        self.friction_directions = count.max(1);
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.friction_rows = 0;
    }

    /// Rebuilds the contact points from `result`, visiting manifolds and their points in
    /// order. `is_static(i)` tells whether archive entry `i` contributes Jacobian columns.
    pub fn update<D: Dimension>(
        &mut self,
        result: &CollisionDetectionResult,
        is_static: impl Fn(usize) -> bool,
    ) {
        self.clear();
        for manifold in &result.manifolds {
            let slot = |index: usize| (!is_static(index)).then_some(index);
            let directions = D::friction_directions(manifold.normal, self.friction_directions);

            for point in &manifold.points {
                let normal_row = self.points.len();
                self.points.push(ContactPoint {
                    body_a: slot(manifold.body_a),
                    body_b: slot(manifold.body_b),
                    indices: (manifold.body_a, manifold.body_b),
                    position: point.position,
                    normal: manifold.normal,
                    depth: point.depth,
                    friction_directions: directions.clone(),
                    normal_row,
                    friction_rows: self.friction_rows,
                });
                self.friction_rows += directions.len();
            }
        }
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    pub fn num_contact_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_friction_rows(&self) -> usize {
        self.friction_rows
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
