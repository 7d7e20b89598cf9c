//! Collision detection: bounding volumes, broad-phase pairing, narrow-phase manifolds and the
//! contact points handed to the solver.

pub mod bvh;
pub mod collidable;
pub mod contact;
pub mod detection;
pub mod narrowphase;

pub use bvh::{Aabb, ObjectBvh, SceneBvh};
pub use collidable::{CollidableObject, WorldShape};
pub use contact::{ContactPoint, ContactPointManager};
pub use detection::{detect, CollisionDetectionResult, ContactManifold, ManifoldPoint};
pub use narrowphase::{NarrowPhase, SatAlgorithm};
