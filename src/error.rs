//! Error types for the rigid body driver.
//!
//! Every fallible operation returns [`Result`], so a failed time step aborts the run
//! instead of silently producing wrong physics.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Errors raised while configuring or stepping a simulation.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A configuration value or file is malformed.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization of a config or snapshot failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested feature exists in the interface but is not supported.
    #[error("{feature} is not implemented")]
    Unimplemented {
        /// Name of the unsupported operation.
        feature: &'static str,
    },

    /// A dynamic body has zero, negative or non-finite mass, or a singular inertia tensor.
    #[error("rigid body {index} has degenerate mass properties: {reason}")]
    DegenerateMass {
        /// Index the body would have been (or is) archived at.
        index: usize,
        /// Which property is degenerate.
        reason: &'static str,
    },

    /// A shape cannot be used with the body it is attached to.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the problem.
        reason: &'static str,
    },

    /// The body id is already archived by the driver.
    #[error("rigid body {id} is already archived")]
    DuplicateBody {
        /// Id of the duplicated body.
        id: u64,
    },

    /// Body index out of range.
    #[error("rigid body index {index} out of range (count={count})")]
    InvalidBodyIndex {
        /// Requested index.
        index: usize,
        /// Number of archived bodies.
        count: usize,
    },

    /// Time step is not strictly positive and finite.
    #[error("invalid time step {dt}")]
    InvalidTimeStep {
        /// The offending value.
        dt: f32,
    },

    /// A body state became non-finite during a step.
    #[error("numerical divergence in rigid body {index}")]
    NumericalDivergence {
        /// Index of the first diverging body.
        index: usize,
    },

    /// The operation is not allowed in the driver's current lifecycle state.
    #[error("invalid driver state: {reason}")]
    InvalidState {
        /// Description of the violated lifecycle rule.
        reason: &'static str,
    },
}

impl PhysicsError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
