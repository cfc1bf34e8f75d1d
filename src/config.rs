// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::depth::DEFAULT_PATCH_RADIUS;
use crate::filter::DEFAULT_DT;
use crate::landmarks::POSE_LANDMARK_COUNT;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub use_kalman: bool,
    pub patch_radius: u32,
    pub num_joints: usize,
    pub dt: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            use_kalman: true,
            patch_radius: DEFAULT_PATCH_RADIUS,
            num_joints: POSE_LANDMARK_COUNT,
            dt: DEFAULT_DT,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: TrackerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        if !(config.dt.is_finite() && config.dt > 0.0) {
            anyhow::bail!("dt must be positive, got {}", config.dt);
        }
        Ok(config)
    }
}
