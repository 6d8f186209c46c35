//! Frame sources
//!
//! The detector pulls frames on demand through [`FrameSource`]. Camera
//! acquisition itself lives outside this crate; [`LatestFrameSlot`] is the
//! hand-off point a video pipeline pushes into, and [`ReplaySource`] serves
//! a fixed set of frames in rotation.

use crate::error::VisionError;
use crate::frame::Frame;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;

/// On-demand access to the current video frame
pub trait FrameSource: Send + Sync {
    /// A copy of the current frame, or `None` when no frame is available
    fn capture(&self) -> Option<Frame>;

    /// Whether the source is delivering frames at all
    fn is_streaming(&self) -> bool;

    /// Whether a frame is available right now
    fn has_frame(&self) -> bool;
}

/// Holds the most recent frame delivered by an external video pipeline
#[derive(Debug, Clone, Default)]
pub struct LatestFrameSlot {
    frame: Arc<RwLock<Option<Frame>>>,
    is_running: Arc<RwLock<bool>>,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the stream as live
    pub fn start(&self) {
        *self.is_running.write() = true;
        info!("Frame stream started");
    }

    /// Mark the stream as stopped and drop the held frame
    pub fn stop(&self) {
        *self.is_running.write() = false;
        *self.frame.write() = None;
        info!("Frame stream stopped");
    }

    /// Replace the current frame
    pub fn push(&self, frame: Frame) {
        *self.frame.write() = Some(frame);
    }

    pub fn clear(&self) {
        *self.frame.write() = None;
    }
}

impl FrameSource for LatestFrameSlot {
    fn capture(&self) -> Option<Frame> {
        self.frame.read().clone()
    }

    fn is_streaming(&self) -> bool {
        *self.is_running.read()
    }

    fn has_frame(&self) -> bool {
        self.frame.read().is_some()
    }
}

/// Serves a fixed list of frames in round-robin order
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<Frame>,
    cursor: Mutex<usize>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Frame>) -> Result<Self, VisionError> {
        if frames.is_empty() {
            return Err(VisionError::Camera("Replay source needs at least one frame".to_string()));
        }
        Ok(Self {
            frames,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&self) -> Option<Frame> {
        let mut cursor = self.cursor.lock();
        let frame = self.frames.get(*cursor).cloned();
        *cursor = (*cursor + 1) % self.frames.len();
        frame
    }

    fn is_streaming(&self) -> bool {
        true
    }

    fn has_frame(&self) -> bool {
        !self.frames.is_empty()
    }
}
