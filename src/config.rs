//! Global configuration constants and the loadable driver configuration.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    core::dimension::MIN_SPATIAL_FRICTION_DIRECTIONS,
    error::{PhysicsError, Result},
};

/// Default gravity magnitude, applied along -Y.
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Default upper bound of a single time step (in seconds).
pub const DEFAULT_MAX_DT: f32 = 1.0 / 100.0;

/// Default number of frames per simulated second.
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Number of projected Gauss-Seidel sweeps per BLCP solve.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 50;

/// Number of one-sided edges in the 3D friction pyramid.
pub const DEFAULT_FRICTION_DIRECTIONS: usize = 4;

/// Separation below which a pair is still reported as touching.
pub const DEFAULT_CONTACT_MARGIN: f32 = 1e-4;

/// Fraction of the penetration removed by the positional correction pass.
pub const DEFAULT_PENETRATION_CORRECTION: f32 = 0.2;

/// Penetration tolerated without positional correction.
pub const DEFAULT_PENETRATION_SLOP: f32 = 0.01;

/// Runtime parameters of a [`RigidBodyDriver`](crate::driver::RigidBodyDriver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub start_frame: u32,
    pub end_frame: u32,
    pub frame_rate: f32,
    pub max_dt: f32,
    pub write_to_file: bool,
    /// Snapshot path prefix; frame `n` is written to `{prefix}{n}.json`.
    pub output_prefix: String,
    pub gravity: f32,
    pub solver_iterations: u32,
    pub friction_directions: usize,
    pub contact_margin: f32,
    pub penetration_correction: f32,
    pub penetration_slop: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            start_frame: 0,
            end_frame: 100,
            frame_rate: DEFAULT_FRAME_RATE,
            max_dt: DEFAULT_MAX_DT,
            write_to_file: false,
            output_prefix: String::from("frame_"),
            gravity: DEFAULT_GRAVITY,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            friction_directions: DEFAULT_FRICTION_DIRECTIONS,
            contact_margin: DEFAULT_CONTACT_MARGIN,
            penetration_correction: DEFAULT_PENETRATION_CORRECTION,
            penetration_slop: DEFAULT_PENETRATION_SLOP,
        }
    }
}

impl DriverConfig {
    /// Loads a JSON configuration file; missing keys fall back to the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| PhysicsError::io(path, err))?;
        let config = Self::from_json(&text)?;
        info!("loaded driver configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_frame < self.start_frame {
            return Err(PhysicsError::configuration(format!(
                "end_frame {} precedes start_frame {}",
                self.end_frame, self.start_frame
            )));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(PhysicsError::configuration("frame_rate must be positive"));
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return Err(PhysicsError::configuration("max_dt must be positive"));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::configuration("gravity must be finite"));
        }
        if self.friction_directions < MIN_SPATIAL_FRICTION_DIRECTIONS {
            return Err(PhysicsError::configuration(format!(
                "friction_directions must be at least {MIN_SPATIAL_FRICTION_DIRECTIONS}"
            )));
        }
        if !(self.contact_margin.is_finite() && self.contact_margin >= 0.0) {
            return Err(PhysicsError::configuration(
                "contact_margin must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.penetration_correction) {
            return Err(PhysicsError::configuration(
                "penetration_correction must lie in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Length of one frame in seconds.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.frame_rate
    }

    /// Human-readable description of the configuration file format.
    pub fn file_format() -> String {
        let example = serde_json::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "Driver configuration is a JSON object; every key is optional.\n\
             start_frame/end_frame: frame range simulated by run()\n\
             frame_rate: frames per second, max_dt: largest time step\n\
             gravity: magnitude along -Y, solver_iterations: PGS sweeps\n\
             friction_directions: edges of the 3D friction pyramid (at least 3)\n\
             Example:\n{example}"
        )
    }
}
