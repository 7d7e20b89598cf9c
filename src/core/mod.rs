//! Core types describing rigid bodies, their shapes, and the scene dimension.

pub mod dimension;
pub mod rigidbody;
pub mod shape;
pub mod types;

pub use dimension::{Dimension, ThreeD, TwoD};
pub use rigidbody::{BodyId, RigidBody};
pub use shape::Shape;
pub use types::{MassProperties, Material, MaterialPairProperties, Transform, Velocity};
