//! Repeated sampling and plurality voting

use crate::cancel::CancelFlag;
use crate::catalog::Denomination;
use crate::classifier::ClassificationResult;
use crate::config::DetectorConfig;
use crate::error::VisionError;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-denomination counts kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    entries: Vec<(Denomination, u32)>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote
    pub fn record(&mut self, denomination: Denomination) {
        self.add(denomination, 1);
    }

    /// Add `count` votes, appending the entry if it is new
    pub fn add(&mut self, denomination: Denomination, count: u32) {
        match self.entries.iter_mut().find(|(d, _)| *d == denomination) {
            Some((_, existing)) => *existing += count,
            None => self.entries.push((denomination, count)),
        }
    }

    pub fn count(&self, denomination: Denomination) -> u32 {
        self.entries
            .iter()
            .find(|(d, _)| *d == denomination)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Sum of all counts
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Entry with the highest count; the earliest inserted wins a tie
    pub fn leader(&self) -> Option<(Denomination, u32)> {
        let mut leader: Option<(Denomination, u32)> = None;
        for &(denomination, count) in &self.entries {
            match leader {
                Some((_, best)) if count <= best => {}
                _ => leader = Some((denomination, count)),
            }
        }
        leader
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Denomination> for VoteTally {
    fn from_iter<I: IntoIterator<Item = Denomination>>(iter: I) -> Self {
        let mut tally = VoteTally::new();
        for denomination in iter {
            tally.record(denomination);
        }
        tally
    }
}

/// Tally plus the raw per-sample results it was built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteOutcome {
    pub tally: VoteTally,
    pub samples: Vec<ClassificationResult>,
}

impl VoteOutcome {
    /// Count the samples' denominations; confidence is discarded
    pub fn from_samples(samples: Vec<ClassificationResult>) -> Self {
        let tally = samples.iter().map(|result| result.denomination).collect();
        Self { tally, samples }
    }
}

/// Runs a sampling step N times with a fixed pause between samples
#[derive(Debug, Clone, Copy)]
pub struct SampleVoter {
    sample_count: usize,
    delay: Duration,
}

impl SampleVoter {
    pub fn new(sample_count: usize, delay: Duration) -> Self {
        Self {
            sample_count: sample_count.max(1),
            delay,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.sample_count, config.sample_delay())
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sample sequentially and tally the denominations. The first failing
    /// sample aborts the whole vote.
    pub async fn vote<F, Fut>(&self, sample: F) -> Result<VoteOutcome, VisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ClassificationResult, VisionError>>,
    {
        self.vote_until(sample, None).await
    }

    /// Like [`SampleVoter::vote`], checking `cancel` before every sample after the first
    pub async fn vote_until<F, Fut>(
        &self,
        sample: F,
        cancel: Option<&CancelFlag>,
    ) -> Result<VoteOutcome, VisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ClassificationResult, VisionError>>,
    {
        let samples = self.sample_until(sample, cancel).await?;
        Ok(VoteOutcome::from_samples(samples))
    }

    /// Collect the per-sample results without tallying them
    pub async fn sample_until<F, Fut>(
        &self,
        mut sample: F,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<ClassificationResult>, VisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ClassificationResult, VisionError>>,
    {
        let mut samples = Vec::with_capacity(self.sample_count);

        for index in 0..self.sample_count {
            if index > 0 {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if cancel.map_or(false, CancelFlag::is_cancelled) {
                    warn!("Detection cancelled after {} of {} samples", index, self.sample_count);
                    return Err(VisionError::Cancelled);
                }
            }

            let result = sample().await?;
            debug!(
                "Sample {}/{}: {} (confidence {})",
                index + 1,
                self.sample_count,
                result.denomination,
                result.confidence
            );
            samples.push(result);
        }

        Ok(samples)
    }
}

impl Default for SampleVoter {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}
