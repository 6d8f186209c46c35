//! Configuration for notesight-eye

use crate::error::VisionError;
use crate::features::CANONICAL_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Detection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames classified per detection request
    pub sample_count: usize,
    /// Pause between consecutive samples, in milliseconds
    pub sample_delay_ms: u64,
    /// Per-detection multiplier on history weights, in (0, 1]
    pub decay_factor: f64,
    /// Share of a decayed weight blended into the vote, in (0, 1]
    pub blend_factor: f64,
    /// Weight added to the selected denomination
    pub reinforcement: u32,
    /// Lower bound for a history weight once present
    pub weight_floor: f64,
    /// Side of the square grid frames are resampled to before averaging
    pub canonical_size: u32,
    /// Capacity of the detection event broadcast channel
    pub event_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_count: 5,
            sample_delay_ms: 150,
            decay_factor: 0.7,
            blend_factor: 0.3,
            reinforcement: 2,
            weight_floor: 1.0,
            canonical_size: CANONICAL_SIZE,
            event_capacity: 64,
        }
    }
}

impl DetectorConfig {
    pub fn sample_delay(&self) -> Duration {
        Duration::from_millis(self.sample_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_count == 0 || self.sample_count > 50 {
            return Err("Sample count must be between 1 and 50".to_string());
        }

        if self.sample_delay_ms > 10_000 {
            return Err("Sample delay too large (max 10000 ms)".to_string());
        }

        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err("Decay factor must be in (0, 1]".to_string());
        }

        if !(self.blend_factor > 0.0 && self.blend_factor <= 1.0) {
            return Err("Blend factor must be in (0, 1]".to_string());
        }

        if !self.weight_floor.is_finite() || self.weight_floor < 0.0 {
            return Err("Weight floor must be a non-negative number".to_string());
        }

        if self.canonical_size == 0 || self.canonical_size > 4096 {
            return Err("Canonical size must be between 1 and 4096".to_string());
        }

        if self.event_capacity == 0 {
            return Err("Event capacity must be non-zero".to_string());
        }

        Ok(())
    }

    /// Parse JSON, falling back to TOML
    pub fn from_str(content: &str) -> Result<Self, VisionError> {
        let config = match serde_json::from_str::<DetectorConfig>(content) {
            Ok(config) => config,
            Err(json_err) => toml::from_str::<DetectorConfig>(content).map_err(|toml_err| {
                VisionError::Config(format!(
                    "Unrecognised config (json: {}; toml: {})",
                    json_err, toml_err
                ))
            })?,
        };

        config.validate().map_err(VisionError::Config)?;
        Ok(config)
    }

    /// Load configuration from a JSON or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Defaults overlaid with `NOTESIGHT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `NOTESIGHT_SAMPLES`, `NOTESIGHT_SAMPLE_DELAY_MS` and
    /// `NOTESIGHT_DECAY`; unparsable values are ignored
    pub fn apply_env(&mut self) {
        if let Ok(samples) = std::env::var("NOTESIGHT_SAMPLES") {
            if let Ok(n) = samples.parse::<usize>() {
                self.sample_count = n;
            }
        }

        if let Ok(delay) = std::env::var("NOTESIGHT_SAMPLE_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.sample_delay_ms = ms;
            }
        }

        if let Ok(decay) = std::env::var("NOTESIGHT_DECAY") {
            if let Ok(factor) = decay.parse::<f64>() {
                self.decay_factor = factor;
            }
        }
    }
}
