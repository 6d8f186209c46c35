//! notesight-eye: banknote denomination detection
//!
//! Classifies Indian rupee notes from camera frames using average color
//! statistics. A detection request samples several frames, votes on the
//! per-frame results and smooths the outcome against a decaying history of
//! earlier detections so the reported denomination does not flicker.
//!
//! Camera acquisition, speech playback and the user interface live outside
//! this crate; they connect through [`FrameSource`], [`announce`] and
//! [`EventSink`].

pub mod announce;
pub mod cancel;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod features;
pub mod frame;
pub mod source;
pub mod stability;
pub mod voter;

pub use cancel::CancelFlag;
pub use catalog::{Denomination, NoteInfo};
pub use classifier::{
    ClassificationResult, ColorHeuristicClassifier, DecisionSource, FrameClassifier, ReadinessGate,
};
pub use config::DetectorConfig;
pub use detector::{CurrencyDetector, DetectionReport, DetectorPhase};
pub use error::VisionError;
pub use events::{BroadcastSink, DetectionEvent, EventSink, NullSink};
pub use features::{FeatureExtractor, FeatureVector};
pub use frame::Frame;
pub use source::{FrameSource, LatestFrameSlot, ReplaySource};
pub use stability::{HistoryState, StabilityPolicy, StabilityTracker};
pub use voter::{SampleVoter, VoteOutcome, VoteTally};
