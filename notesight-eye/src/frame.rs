//! RGBA frame buffer handed over by the video source

use crate::error::VisionError;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;

/// One captured video frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    /// Wrap a raw RGBA buffer (4 bytes per pixel, row major)
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(4))
            .ok_or_else(|| VisionError::Extraction("Frame dimensions overflow".to_string()))?;

        if data.len() != expected {
            return Err(VisionError::Extraction(format!(
                "Frame buffer has {} bytes, expected {} for {}x{} RGBA",
                data.len(),
                expected,
                width,
                height
            )));
        }

        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| VisionError::Extraction("Frame buffer rejected".to_string()))
    }

    /// Decode a still image from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let image = image::open(path.as_ref())?;
        Ok(Self::from(&image))
    }

    /// Frame filled with a single color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when the frame has no readable pixels
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub(crate) fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

impl From<&DynamicImage> for Frame {
    fn from(image: &DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }
}
