//! Detection orchestration
//!
//! [`CurrencyDetector`] runs one detection at a time: it samples the frame
//! source through the classifier, votes, stabilizes the vote against its own
//! history and reports the lifecycle to an [`EventSink`]. Requests arriving
//! while a detection is in flight are dropped, not queued.

use crate::cancel::CancelFlag;
use crate::catalog::Denomination;
use crate::classifier::{ClassificationResult, ColorHeuristicClassifier, FrameClassifier};
use crate::config::DetectorConfig;
use crate::error::VisionError;
use crate::events::{DetectionEvent, EventSink};
use crate::features::FeatureExtractor;
use crate::source::FrameSource;
use crate::stability::{HistoryState, StabilityPolicy, StabilityTracker};
use crate::voter::{SampleVoter, VoteOutcome, VoteTally};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where the detector is in its request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPhase {
    Idle,
    Sampling,
    Voting,
    Stabilizing,
}

/// Returns the detector to `Idle` however the flight ends
struct FlightGuard<'a> {
    phase: &'a Mutex<DetectorPhase>,
}

impl FlightGuard<'_> {
    fn enter(&self, next: DetectorPhase) {
        *self.phase.lock() = next;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock() = DetectorPhase::Idle;
    }
}

// Phase tokens. Each transition consumes the previous token, so phases can
// only be entered in order.
struct Sampling<'a>(FlightGuard<'a>);
struct Voting<'a>(FlightGuard<'a>);
struct Stabilizing<'a>(FlightGuard<'a>);

impl<'a> Sampling<'a> {
    /// Claim the detector if it is idle. The claim is held until the
    /// returned token, or the guard it ends in, is dropped.
    fn try_begin(phase: &'a Mutex<DetectorPhase>) -> Option<Self> {
        let mut current = phase.lock();
        if *current != DetectorPhase::Idle {
            return None;
        }
        *current = DetectorPhase::Sampling;
        drop(current);
        Some(Sampling(FlightGuard { phase }))
    }

    fn advance(self) -> Voting<'a> {
        self.0.enter(DetectorPhase::Voting);
        Voting(self.0)
    }

    /// Abandon sampling, still holding the claim
    fn abort(self) -> FlightGuard<'a> {
        self.0
    }
}

impl<'a> Voting<'a> {
    fn advance(self) -> Stabilizing<'a> {
        self.0.enter(DetectorPhase::Stabilizing);
        Stabilizing(self.0)
    }
}

impl<'a> Stabilizing<'a> {
    /// Finish the pipeline, still holding the claim
    fn land(self) -> FlightGuard<'a> {
        self.0
    }
}

/// Everything known about one completed detection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub detection_id: Uuid,
    pub denomination: Denomination,
    /// The vote was ambiguous and the previous result was kept
    pub held_previous: bool,
    /// Raw per-sample vote
    pub tally: VoteTally,
    /// Vote after history was blended in
    pub blended: VoteTally,
    pub samples: Vec<ClassificationResult>,
}

/// Single-flight, history-stabilized banknote detector
pub struct CurrencyDetector {
    config: Arc<DetectorConfig>,
    classifier: Arc<dyn FrameClassifier>,
    source: RwLock<Option<Arc<dyn FrameSource>>>,
    sink: Arc<dyn EventSink>,
    voter: SampleVoter,
    phase: Mutex<DetectorPhase>,
    tracker: Mutex<StabilityTracker>,
    is_active: RwLock<bool>,
}

impl CurrencyDetector {
    /// Create a detector around an arbitrary classifier
    pub fn new(
        config: DetectorConfig,
        classifier: Arc<dyn FrameClassifier>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, VisionError> {
        config
            .validate()
            .map_err(|e| VisionError::Config(format!("Invalid detector config: {}", e)))?;

        let voter = SampleVoter::from_config(&config);
        let tracker = StabilityTracker::new(StabilityPolicy::from_config(&config));

        Ok(Self {
            config: Arc::new(config),
            classifier,
            source: RwLock::new(None),
            sink,
            voter,
            phase: Mutex::new(DetectorPhase::Idle),
            tracker: Mutex::new(tracker),
            is_active: RwLock::new(true),
        })
    }

    /// Create a detector backed by the color-statistics classifier
    pub fn heuristic(config: DetectorConfig, sink: Arc<dyn EventSink>) -> Result<Self, VisionError> {
        let classifier = ColorHeuristicClassifier::new(FeatureExtractor::new(config.canonical_size));
        Self::new(config, Arc::new(classifier), sink)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn attach_source(&self, source: Arc<dyn FrameSource>) {
        *self.source.write() = Some(source);
        info!("Frame source attached");
    }

    pub fn detach_source(&self) {
        *self.source.write() = None;
        info!("Frame source detached");
    }

    /// Inactive detectors ignore every request
    pub fn set_active(&self, active: bool) {
        *self.is_active.write() = active;
    }

    pub fn is_active(&self) -> bool {
        *self.is_active.read()
    }

    pub fn phase(&self) -> DetectorPhase {
        *self.phase.lock()
    }

    pub fn is_detecting(&self) -> bool {
        self.phase() != DetectorPhase::Idle
    }

    pub fn last_accepted(&self) -> Option<Denomination> {
        self.tracker.lock().last_accepted()
    }

    /// Snapshot of the stability history
    pub fn history(&self) -> HistoryState {
        self.tracker.lock().history().clone()
    }

    /// Process one detection request. Returns `None` when the request is
    /// rejected (busy, inactive, no streaming source or frame, classifier
    /// not ready)
    /// or when the detection fails; failures are reported to the event sink.
    pub async fn process_detection(&self) -> Option<Denomination> {
        self.detect(None).await.map(|report| report.denomination)
    }

    /// Like [`CurrencyDetector::process_detection`], abandoning the request
    /// between samples once `cancel` is set
    pub async fn process_detection_until(&self, cancel: &CancelFlag) -> Option<Denomination> {
        self.detect(Some(cancel)).await.map(|report| report.denomination)
    }

    /// Process one detection request and return the full report
    pub async fn detect(&self, cancel: Option<&CancelFlag>) -> Option<DetectionReport> {
        if self.is_detecting() {
            warn!("Detection already in progress, ignoring request");
            return None;
        }

        if !self.is_active() {
            debug!("Detector inactive, ignoring request");
            return None;
        }

        let source = match self.source.read().clone() {
            Some(source) if source.is_streaming() => source,
            _ => {
                warn!("No streaming frame source, ignoring request");
                return None;
            }
        };

        if !source.has_frame() {
            warn!("No frame available yet, ignoring request");
            return None;
        }

        if !self.classifier.is_ready() {
            warn!("Classifier not ready, ignoring request");
            return None;
        }

        let flight = match Sampling::try_begin(&self.phase) {
            Some(flight) => flight,
            None => {
                warn!("Detection already in progress, ignoring request");
                return None;
            }
        };

        let detection_id = Uuid::new_v4();
        info!("Detection {} started", detection_id);
        self.sink.emit(DetectionEvent::Started {
            detection_id,
            timestamp: Utc::now(),
        });

        // Held until the end event has been emitted
        let (_claim, outcome) = self.run(flight, detection_id, source, cancel).await;

        match outcome {
            Ok(report) => {
                let denomination = report.as_ref().map(|r| r.denomination);
                match denomination {
                    Some(d) => info!("Detection {} completed: {}", detection_id, d),
                    None => info!("Detection {} completed without a result", detection_id),
                }
                self.sink.emit(DetectionEvent::Completed {
                    detection_id,
                    denomination,
                    timestamp: Utc::now(),
                });
                report
            }
            Err(e) => {
                error!("Detection {} failed: {}", detection_id, e);
                self.sink.emit(DetectionEvent::Failed {
                    detection_id,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                None
            }
        }
    }

    async fn run<'a>(
        &'a self,
        flight: Sampling<'a>,
        detection_id: Uuid,
        source: Arc<dyn FrameSource>,
        cancel: Option<&CancelFlag>,
    ) -> (FlightGuard<'a>, Result<Option<DetectionReport>, VisionError>) {
        let classifier = self.classifier.clone();
        let sampled = self
            .voter
            .sample_until(
                || {
                    let source = source.clone();
                    let classifier = classifier.clone();
                    async move {
                        let frame = source
                            .capture()
                            .ok_or_else(|| VisionError::Camera("No frame available".to_string()))?;
                        classifier.classify(&frame).await
                    }
                },
                cancel,
            )
            .await;

        let samples = match sampled {
            Ok(samples) => samples,
            Err(e) => return (flight.abort(), Err(e)),
        };

        let voting = flight.advance();
        let outcome = VoteOutcome::from_samples(samples);
        if let Some((leader, count)) = outcome.tally.leader() {
            debug!(
                "Raw vote leader {} with {}/{} samples",
                leader,
                count,
                outcome.tally.total()
            );
        }

        let stabilizing = voting.advance();
        let stabilized = self.tracker.lock().stabilize(&outcome.tally);

        let report = stabilized.map(|s| DetectionReport {
            detection_id,
            denomination: s.denomination,
            held_previous: s.held_previous,
            tally: outcome.tally,
            blended: s.blended,
            samples: outcome.samples,
        });
        (stabilizing.land(), Ok(report))
    }
}
