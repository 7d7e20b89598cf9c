//! Contact Dynamics – rigid body contact simulation for Rust.
//!
//! Rigid bodies (spheres, boxes and static half-spaces) are archived in a
//! [`RigidBodyDriver`], which advances them with a fixed pipeline per time step:
//! gravity, BVH broad phase, narrow phase, contact point generation, Jacobian and
//! mass-matrix assembly, a projected Gauss-Seidel solve of the boxed LCP for normal and
//! friction impulses, impulse application and semi-implicit Euler integration.
//!
//! Scenes are either planar or spatial; the choice is the compile-time [`Dimension`]
//! parameter ([`TwoD`] or [`ThreeD`]).
//!
//! ```no_run
//! use contact_dynamics::prelude::*;
//!
//! let mut driver = RigidBodyDriver::<ThreeD>::new();
//! driver.add_rigid_body(RigidBody::fixed(BodyId(0), Shape::ground()), false)?;
//! driver.add_rigid_body(
//!     RigidBody::dynamic(BodyId(1), Shape::sphere(0.5), 1.0).with_position(Vec3::Y),
//!     true,
//! )?;
//! driver.run()?;
//! # Ok::<(), contact_dynamics::PhysicsError>(())
//! ```

pub mod collision;
pub mod config;
pub mod core;
pub mod driver;
pub mod dynamics;
pub mod error;
pub mod linalg;
pub mod utils;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{
    CollisionDetectionResult, ContactManifold, ContactPoint, ContactPointManager, SceneBvh,
};
pub use config::DriverConfig;
pub use core::{
    BodyId, Dimension, MassProperties, Material, RigidBody, Shape, ThreeD, Transform, TwoD,
    Velocity,
};
pub use driver::{
    DriverSnapshot, DriverState, EventCounter, PluginHandle, RigidBodyArchive, RigidBodyDriver,
    RigidDriverPlugin, Steppable,
};
pub use dynamics::{PgsSolver, SolverStepMetrics};
pub use error::{PhysicsError, Result};
pub use linalg::{SparseMatrix, VectorN};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        BodyId, DriverConfig, Material, RigidBody, RigidBodyDriver, RigidDriverPlugin, Shape,
        Steppable, ThreeD, TwoD, Vec3,
    };
}
