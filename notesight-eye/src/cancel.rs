//! Cooperative cancellation for multi-sample detections

use parking_lot::RwLock;
use std::sync::Arc;

/// Cancellation flag checked between samples. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<RwLock<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.write() = true;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.read()
    }

    /// Re-arm the flag for another detection
    pub fn reset(&self) {
        *self.cancelled.write() = false;
    }
}
