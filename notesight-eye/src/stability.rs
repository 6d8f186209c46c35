//! Cross-detection stabilization
//!
//! Keeps a decaying weight per denomination across detections and blends it
//! into each new vote, so a note held in front of the camera does not flicker
//! between two plausible answers. An ambiguous vote never overturns the last
//! accepted result.

use crate::catalog::Denomination;
use crate::config::DetectorConfig;
use crate::voter::VoteTally;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunables for decay, blending and reinforcement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityPolicy {
    /// Multiplier applied to every history weight per detection
    pub decay_factor: f64,
    /// Share of a decayed weight added to the current tally
    pub blend_factor: f64,
    /// Added to the selected denomination's weight
    pub reinforcement: f64,
    /// Lower bound of a weight once present
    pub weight_floor: f64,
}

impl StabilityPolicy {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            decay_factor: config.decay_factor,
            blend_factor: config.blend_factor,
            reinforcement: config.reinforcement as f64,
            weight_floor: config.weight_floor,
        }
    }
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

/// Decayed per-denomination weights in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryState {
    weights: Vec<(Denomination, f64)>,
}

impl HistoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a weight
    pub fn set(&mut self, denomination: Denomination, weight: f64) {
        let weight = weight.max(0.0);
        match self.weights.iter_mut().find(|(d, _)| *d == denomination) {
            Some((_, existing)) => *existing = weight,
            None => self.weights.push((denomination, weight)),
        }
    }

    pub fn weight(&self, denomination: Denomination) -> Option<f64> {
        self.weights
            .iter()
            .find(|(d, _)| *d == denomination)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, f64)> + '_ {
        self.weights.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn reinforce(&mut self, denomination: Denomination, bonus: f64) {
        match self.weights.iter_mut().find(|(d, _)| *d == denomination) {
            Some((_, existing)) => *existing += bonus,
            None => self.weights.push((denomination, bonus)),
        }
    }
}

/// Result of one stabilization step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stabilized {
    pub denomination: Denomination,
    /// Tally after history was blended in
    pub blended: VoteTally,
    /// The vote was ambiguous and the last accepted value was kept
    pub held_previous: bool,
}

/// Owns the history and the last accepted denomination of one detector
#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    policy: StabilityPolicy,
    history: HistoryState,
    last_accepted: Option<Denomination>,
}

impl StabilityTracker {
    pub fn new(policy: StabilityPolicy) -> Self {
        Self {
            policy,
            history: HistoryState::new(),
            last_accepted: None,
        }
    }

    /// Start from an existing history
    pub fn with_history(
        policy: StabilityPolicy,
        history: HistoryState,
        last_accepted: Option<Denomination>,
    ) -> Self {
        Self {
            policy,
            history,
            last_accepted,
        }
    }

    pub fn policy(&self) -> &StabilityPolicy {
        &self.policy
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    pub fn last_accepted(&self) -> Option<Denomination> {
        self.last_accepted
    }

    /// Blend history into `tally`, pick the stabilized denomination and
    /// update history. Returns `None` only when there is nothing to pick
    /// from: an empty tally, empty history and no previous result.
    pub fn stabilize(&mut self, tally: &VoteTally) -> Option<Stabilized> {
        let sample_count = tally.total();
        let raw_majority = tally.leader().map(|(_, count)| count).unwrap_or(0);

        let mut blended = tally.clone();
        for (denomination, weight) in self.history.weights.iter_mut() {
            *weight = (*weight * self.policy.decay_factor).max(self.policy.weight_floor);
            let carried = (*weight * self.policy.blend_factor).floor() as u32;
            blended.add(*denomination, carried);
        }

        let mut selected = blended.leader().map(|(denomination, _)| denomination);
        let mut held_previous = false;

        if raw_majority * 2 <= sample_count {
            if let Some(previous) = self.last_accepted {
                if selected != Some(previous) {
                    debug!(
                        "No strict majority ({} of {}), keeping {} over {:?}",
                        raw_majority, sample_count, previous, selected
                    );
                }
                selected = Some(previous);
                held_previous = true;
            }
        }

        let denomination = selected?;
        self.history.reinforce(denomination, self.policy.reinforcement);
        self.last_accepted = Some(denomination);

        debug!(
            "Stabilized to {} (raw majority {}/{}, history size {})",
            denomination,
            raw_majority,
            sample_count,
            self.history.len()
        );

        Some(Stabilized {
            denomination,
            blended,
            held_previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(entries: &[(Denomination, u32)]) -> VoteTally {
        let mut tally = VoteTally::new();
        for &(denomination, count) in entries {
            tally.add(denomination, count);
        }
        tally
    }

    #[test]
    fn test_default_policy() {
        let policy = StabilityPolicy::default();
        assert_eq!(policy.decay_factor, 0.7);
        assert_eq!(policy.blend_factor, 0.3);
        assert_eq!(policy.reinforcement, 2.0);
        assert_eq!(policy.weight_floor, 1.0);
    }

    #[test]
    fn test_first_detection_takes_raw_leader() {
        let mut tracker = StabilityTracker::default();
        let result = tracker
            .stabilize(&tally(&[(Denomination::OneHundred, 3), (Denomination::TwoHundred, 2)]))
            .unwrap();
        assert_eq!(result.denomination, Denomination::OneHundred);
        assert!(!result.held_previous);
        assert_eq!(tracker.last_accepted(), Some(Denomination::OneHundred));
        assert_eq!(tracker.history().weight(Denomination::OneHundred), Some(2.0));
    }

    #[test]
    fn test_ambiguous_vote_keeps_last_accepted() {
        let mut tracker = StabilityTracker::with_history(
            StabilityPolicy::default(),
            HistoryState::new(),
            Some(Denomination::FiveHundred),
        );
        let result = tracker
            .stabilize(&tally(&[
                (Denomination::Ten, 2),
                (Denomination::Twenty, 2),
                (Denomination::Fifty, 1),
            ]))
            .unwrap();
        assert_eq!(result.denomination, Denomination::FiveHundred);
        assert!(result.held_previous);
        assert_eq!(tracker.history().weight(Denomination::FiveHundred), Some(2.0));
    }

    #[test]
    fn test_ambiguous_vote_without_history_uses_first_seen() {
        let mut tracker = StabilityTracker::default();
        let result = tracker
            .stabilize(&tally(&[
                (Denomination::Twenty, 2),
                (Denomination::Ten, 2),
                (Denomination::Fifty, 1),
            ]))
            .unwrap();
        assert_eq!(result.denomination, Denomination::Twenty);
        assert!(!result.held_previous);
    }

    #[test]
    fn test_strict_majority_overrides_previous() {
        let mut tracker = StabilityTracker::with_history(
            StabilityPolicy::default(),
            HistoryState::new(),
            Some(Denomination::FiveHundred),
        );
        let result = tracker
            .stabilize(&tally(&[(Denomination::OneHundred, 3), (Denomination::TwoHundred, 2)]))
            .unwrap();
        assert_eq!(result.denomination, Denomination::OneHundred);
        assert!(!result.held_previous);
    }

    #[test]
    fn test_history_swings_close_vote() {
        let mut history = HistoryState::new();
        history.set(Denomination::TwoHundred, 10.0);
        let mut tracker = StabilityTracker::with_history(StabilityPolicy::default(), history, None);

        // 200 decays to 7.0 and carries floor(2.1) = 2 extra votes
        let result = tracker
            .stabilize(&tally(&[(Denomination::OneHundred, 3), (Denomination::TwoHundred, 2)]))
            .unwrap();
        assert_eq!(result.blended.count(Denomination::TwoHundred), 4);
        assert_eq!(result.denomination, Denomination::TwoHundred);
        assert!((tracker.history().weight(Denomination::TwoHundred).unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_entry_appended_to_blend() {
        let mut history = HistoryState::new();
        history.set(Denomination::FiveHundred, 20.0);
        let mut tracker = StabilityTracker::with_history(StabilityPolicy::default(), history, None);

        let result = tracker.stabilize(&tally(&[(Denomination::Ten, 5)])).unwrap();
        let entries: Vec<_> = result.blended.iter().collect();
        assert_eq!(entries, vec![(Denomination::Ten, 5), (Denomination::FiveHundred, 4)]);
        assert_eq!(result.denomination, Denomination::Ten);
    }

    #[test]
    fn test_blend_tie_resolves_to_first_inserted() {
        let mut history = HistoryState::new();
        history.set(Denomination::Fifty, 10.0);
        let mut tracker = StabilityTracker::with_history(StabilityPolicy::default(), history, None);

        // 50 carries 2 votes and ties 10 at 3; 10 was inserted first
        let result = tracker
            .stabilize(&tally(&[(Denomination::Ten, 3), (Denomination::Fifty, 1), (Denomination::Twenty, 1)]))
            .unwrap();
        assert_eq!(result.blended.count(Denomination::Fifty), 3);
        assert_eq!(result.denomination, Denomination::Ten);
    }

    #[test]
    fn test_decay_is_bounded_by_floor() {
        let mut history = HistoryState::new();
        history.set(Denomination::FiveHundred, 20.0);
        let mut tracker = StabilityTracker::with_history(StabilityPolicy::default(), history, None);

        let mut previous = 20.0;
        let mut reached_floor = false;
        for _ in 0..10 {
            let result = tracker.stabilize(&tally(&[(Denomination::OneHundred, 5)])).unwrap();
            assert_eq!(result.denomination, Denomination::OneHundred);

            let weight = tracker.history().weight(Denomination::FiveHundred).unwrap();
            assert!(weight >= 1.0);
            if reached_floor {
                assert_eq!(weight, 1.0);
            } else {
                assert!(weight < previous);
                reached_floor = weight == 1.0;
            }
            previous = weight;
        }
        assert!(reached_floor);
    }

    #[test]
    fn test_empty_everything_yields_none() {
        let mut tracker = StabilityTracker::default();
        assert!(tracker.stabilize(&VoteTally::new()).is_none());
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.last_accepted(), None);
    }

    #[test]
    fn test_history_set_clamps_negative() {
        let mut history = HistoryState::new();
        history.set(Denomination::Ten, -3.0);
        assert_eq!(history.weight(Denomination::Ten), Some(0.0));
    }
}
