use std::{fs, path::Path};

use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    config::DriverConfig,
    core::rigidbody::RigidBody,
    error::{PhysicsError, Result},
};

/// Everything needed to restart a simulation from a frame boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSnapshot {
    /// `"2D"` or `"3D"`; a snapshot only restores into a driver of the same dimension.
    pub dimension: String,
    pub frame: u32,
    pub step: u64,
    pub time: f32,
    pub gravity: Vec3,
    pub config: DriverConfig,
    pub bodies: Vec<RigidBody>,
}

impl DriverSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| PhysicsError::io(path, err))?;
        }
        fs::write(path, text).map_err(|err| PhysicsError::io(path, err))?;
        info!(
            "wrote snapshot of frame {} ({} bodies) to {}",
            self.frame,
            self.bodies.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| PhysicsError::io(path, err))?;
        let snapshot = Self::from_json(&text)?;
        info!(
            "read snapshot of frame {} ({} bodies) from {}",
            snapshot.frame,
            snapshot.bodies.len(),
            path.display()
        );
        Ok(snapshot)
    }
}
