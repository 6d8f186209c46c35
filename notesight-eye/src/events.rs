//! Detection lifecycle events

use crate::catalog::Denomination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

/// Emitted once per accepted detection request: `Started`, then exactly one
/// of `Completed` or `Failed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionEvent {
    Started {
        detection_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    Completed {
        detection_id: Uuid,
        denomination: Option<Denomination>,
        timestamp: DateTime<Utc>,
    },
    Failed {
        detection_id: Uuid,
        kind: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DetectionEvent {
    pub fn detection_id(&self) -> Uuid {
        match self {
            DetectionEvent::Started { detection_id, .. }
            | DetectionEvent::Completed { detection_id, .. }
            | DetectionEvent::Failed { detection_id, .. } => *detection_id,
        }
    }
}

/// Receiver of detection events. Fire-and-forget: implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DetectionEvent);
}

/// Fans events out to any number of subscribers
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<DetectionEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectionEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: DetectionEvent) {
        if self.sender.send(event).is_err() {
            warn!("No detection event subscribers, dropping event");
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DetectionEvent) {}
}
