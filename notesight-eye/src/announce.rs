//! Spoken feedback text
//!
//! Only builds the sentences; playback belongs to the speech layer.

use crate::catalog::Denomination;

/// Fixed prompts spoken by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessage {
    Welcome,
    Instructions,
    DetectionInProgress,
    DetectionSuccess,
    DetectionFailed,
    CameraPermissionNeeded,
    CameraNotAvailable,
    Loading,
}

impl AppMessage {
    pub fn text(self) -> &'static str {
        match self {
            AppMessage::Welcome => "Welcome to Currency Detector. Position an Indian currency note within the frame and hold steady for detection.",
            AppMessage::Instructions => "Double tap anywhere to detect the currency note. Swipe right for instructions. Swipe left to adjust settings.",
            AppMessage::DetectionInProgress => "Analyzing currency note...",
            AppMessage::DetectionSuccess => "Currency detected:",
            AppMessage::DetectionFailed => "Could not detect any currency. Please try again.",
            AppMessage::CameraPermissionNeeded => "Camera access is required to detect currency notes.",
            AppMessage::CameraNotAvailable => "Camera is not available on this device.",
            AppMessage::Loading => "Loading currency detection model...",
        }
    }
}

/// Sentence announcing a detection outcome
pub fn announcement(outcome: Option<Denomination>) -> String {
    match outcome {
        Some(denomination) => {
            let note = denomination.note();
            format!(
                "{} note detected. This is a {} colored note with {}.",
                note.name, note.color, note.description
            )
        }
        None => AppMessage::DetectionFailed.text().to_string(),
    }
}

/// Sentence announcing a failed detection
pub fn error_announcement(message: &str) -> String {
    format!("Error: {}", message)
}
