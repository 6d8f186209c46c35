//! Average-color feature extraction

use crate::error::VisionError;
use crate::frame::Frame;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Side length of the square grid every frame is resampled to
pub const CANONICAL_SIZE: u32 = 224;

/// Mean red, green and blue over a resampled frame, each in [0, 255]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl FeatureVector {
    /// Build a feature vector, clamping every channel into [0, 255]
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red: clamp_channel(red),
            green: clamp_channel(green),
            blue: clamp_channel(blue),
        }
    }

    pub fn max_channel(&self) -> f32 {
        self.red.max(self.green).max(self.blue)
    }

    pub fn min_channel(&self) -> f32 {
        self.red.min(self.green).min(self.blue)
    }

    /// Difference between the brightest and darkest channel
    pub fn spread(&self) -> f32 {
        self.max_channel() - self.min_channel()
    }

    pub fn is_black(&self) -> bool {
        self.red + self.green + self.blue == 0.0
    }
}

fn clamp_channel(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 255.0)
    } else {
        0.0
    }
}

/// Reduces a frame to its [`FeatureVector`]
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    size: u32,
}

impl FeatureExtractor {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Resample the frame to the canonical grid and average each channel.
    /// Alpha is ignored.
    pub fn extract(&self, frame: &Frame) -> Result<FeatureVector, VisionError> {
        if frame.is_empty() {
            return Err(VisionError::Extraction(format!(
                "Frame not readable: {}x{} has no pixels",
                frame.width(),
                frame.height()
            )));
        }

        let resampled = imageops::resize(frame.image(), self.size, self.size, FilterType::Nearest);

        let mut sums = [0u64; 3];
        for pixel in resampled.pixels() {
            sums[0] += pixel[0] as u64;
            sums[1] += pixel[1] as u64;
            sums[2] += pixel[2] as u64;
        }

        let count = resampled.width() as u64 * resampled.height() as u64;
        if count == 0 {
            return Err(VisionError::Extraction("Resampled frame is empty".to_string()));
        }

        let features = FeatureVector::new(
            (sums[0] as f64 / count as f64) as f32,
            (sums[1] as f64 / count as f64) as f32,
            (sums[2] as f64 / count as f64) as f32,
        );

        debug!(
            "Extracted features r={:.1} g={:.1} b={:.1} from {}x{} frame",
            features.red,
            features.green,
            features.blue,
            frame.width(),
            frame.height()
        );
        Ok(features)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(CANONICAL_SIZE)
    }
}
