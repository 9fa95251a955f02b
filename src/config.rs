//! Detector configuration
//!
//! Only `sensitivity` is meant to be user facing. The rule table thresholds
//! are fixed in [`crate::scoring`] and shift together through the sensitivity
//! bonus.

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_SENSITIVITY: f32 = 0.4;
pub const MAX_SENSITIVITY: f32 = 0.7;
pub const DEFAULT_SENSITIVITY: f32 = 0.55;
pub const DEFAULT_DETECTION_THRESHOLD: u32 = 3;

/// Clamp a sensitivity into the supported range. Non-finite input falls back
/// to the default.
pub fn clamp_sensitivity(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
    } else {
        log::warn!("Ignoring non-finite sensitivity {value}, using {DEFAULT_SENSITIVITY}");
        DEFAULT_SENSITIVITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// User sensitivity, clamped to [0.4, 0.7]
    pub sensitivity: f32,
    /// Consecutive identical raw outcomes needed to commit a classification
    pub detection_threshold: u32,
    /// Use iris landmarks for gaze when the provider supplies them
    pub refine_landmarks: bool,
    /// Cadence of the monitor loop
    pub tick_interval_ms: u64,
    /// Object class treated as a phone
    pub phone_label: String,
    /// Capture size used when frames are synthesized locally
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            refine_landmarks: true,
            tick_interval_ms: 100,
            phone_label: "cell phone".to_string(),
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl DetectorConfig {
    /// Parse a TOML document, clamp the sensitivity and validate the rest.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: DetectorConfig = toml::from_str(content)?;
        config.sensitivity = clamp_sensitivity(config.sensitivity);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_sensitivity(mut self, value: f32) -> Self {
        self.sensitivity = clamp_sensitivity(value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.detection_threshold == 0 {
            return Err(DetectorError::InvalidConfig(
                "detection_threshold must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(DetectorError::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(DetectorError::InvalidConfig(format!(
                "frame size {}x{} is empty",
                self.frame_width, self.frame_height
            )));
        }
        Ok(())
    }
}
