//! Error types for notesight-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection cancelled")]
    Cancelled,

    #[error("Unknown denomination: {0}")]
    UnknownDenomination(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl VisionError {
    /// Stable short name for the failure kind, used in detection events
    pub fn kind(&self) -> &'static str {
        match self {
            VisionError::Camera(_) => "camera",
            VisionError::Extraction(_) => "extraction",
            VisionError::Classification(_) => "classification",
            VisionError::Config(_) => "config",
            VisionError::Cancelled => "cancelled",
            VisionError::UnknownDenomination(_) => "unknown_denomination",
            VisionError::Io(_) => "io",
            VisionError::Image(_) => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Camera("Test error".to_string());
        assert!(err.to_string().contains("Camera error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_unknown_denomination_display() {
        let err = VisionError::UnknownDenomination(25);
        assert_eq!(err.to_string(), "Unknown denomination: 25");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(VisionError::Camera("c".to_string()).kind(), "camera");
        assert_eq!(VisionError::Extraction("e".to_string()).kind(), "extraction");
        assert_eq!(VisionError::Classification("c".to_string()).kind(), "classification");
        assert_eq!(VisionError::Config("c".to_string()).kind(), "config");
        assert_eq!(VisionError::Cancelled.kind(), "cancelled");
    }
}
