//! Denomination classification
//!
//! [`classify_features`] is the color-statistics placeholder: an ordered rule
//! table over the mean channel values with a scored fallback when no rule
//! fires. [`FrameClassifier`] is the seam a trained model can later sit behind.

use crate::catalog::Denomination;
use crate::error::VisionError;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::frame::Frame;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Confidence reported for a rule-table hit
pub const RULE_CONFIDENCE: f32 = f32::MAX;

/// Which part of the decision procedure produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// 1-based position in the rule table
    Rule(u8),
    Fallback,
}

/// Outcome of classifying a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub denomination: Denomination,
    /// Non-negative; only comparable within one classification call
    pub confidence: f32,
    pub source: DecisionSource,
}

struct Rule {
    denomination: Denomination,
    matches: fn(&FeatureVector) -> bool,
}

/// `value` is at least `percent` percent above `base`. Exact for integral channel means.
fn exceeds_by(value: f32, base: f32, percent: u32) -> bool {
    value * 100.0 >= base * (100 + percent) as f32
}

/// `value / base` is strictly above `1 + percent / 100`
fn ratio_above(value: f32, base: f32, percent: u32) -> bool {
    value * 100.0 > base * (100 + percent) as f32
}

/// Evaluated top to bottom, first match wins
static RULES: [Rule; 7] = [
    // Fluorescent blue
    Rule {
        denomination: Denomination::Fifty,
        matches: |f| f.blue > 120.0 && exceeds_by(f.blue, f.red, 20) && exceeds_by(f.blue, f.green, 20),
    },
    // Magenta
    Rule {
        denomination: Denomination::TwoThousand,
        matches: |f| {
            exceeds_by(f.red, f.green, 20)
                && exceeds_by(f.blue, f.green, 10)
                && f.red > 140.0
                && f.blue > 110.0
        },
    },
    // Bright yellow
    Rule {
        denomination: Denomination::TwoHundred,
        matches: |f| {
            f.red > 140.0
                && f.green > 140.0
                && f.blue < 100.0
                && ratio_above(f.red, f.blue, 50)
                && ratio_above(f.green, f.blue, 50)
        },
    },
    // Greenish yellow
    Rule {
        denomination: Denomination::Twenty,
        matches: |f| exceeds_by(f.green, f.red, 10) && exceeds_by(f.green, f.blue, 50) && f.green > 120.0,
    },
    // Stone grey
    Rule {
        denomination: Denomination::FiveHundred,
        matches: |f| {
            (f.red - f.green).abs() <= 15.0
                && (f.green - f.blue).abs() <= 15.0
                && (f.red - f.blue).abs() <= 15.0
                && (90.0..=160.0).contains(&f.red)
        },
    },
    // Chocolate brown
    Rule {
        denomination: Denomination::Ten,
        matches: |f| {
            f.red > 100.0
                && exceeds_by(f.red, f.blue, 30)
                && ratio_above(f.red, f.green, 10)
                && !exceeds_by(f.red, f.green, 50)
                && ratio_above(f.green, f.blue, 20)
        },
    },
    // Lavender
    Rule {
        denomination: Denomination::OneHundred,
        matches: |f| f.red > 110.0 && exceeds_by(f.blue, f.green, 10) && exceeds_by(f.red, f.green, 10),
    },
];

/// Rule numbers (1-based) whose thresholds the features satisfy, in table order
pub fn matching_rules(features: &FeatureVector) -> Vec<u8> {
    RULES
        .iter()
        .enumerate()
        .filter(|(_, rule)| (rule.matches)(features))
        .map(|(idx, _)| idx as u8 + 1)
        .collect()
}

/// Hand-tuned score of how well the features fit one note's defining color
pub fn fallback_score(denomination: Denomination, features: &FeatureVector) -> f32 {
    let (r, g, b) = (features.red, features.green, features.blue);
    match denomination {
        Denomination::Ten => (r + 0.8 * g) / (2.0 * (b + 1.0)),
        Denomination::Twenty => g / ((r + b) / 2.0 + 1.0),
        Denomination::Fifty => b / (r.max(g) + 1.0),
        Denomination::OneHundred => r.min(b) / (g + 1.0),
        Denomination::TwoHundred => (r + g) / (2.0 * b + 1.0) * 0.9,
        Denomination::FiveHundred => 1.0 / (1.0 + features.spread() / 32.0),
        Denomination::TwoThousand => r / (g + 1.0) * 0.95,
    }
}

/// Fallback scores for every denomination in catalog order
pub fn fallback_scores(features: &FeatureVector) -> [(Denomination, f32); 7] {
    Denomination::ALL.map(|d| (d, fallback_score(d, features)))
}

/// Strictly highest score, or 100 when the maximum is shared
pub(crate) fn pick_best(scores: &[(Denomination, f32)]) -> (Denomination, f32) {
    let mut best: Option<(Denomination, f32)> = None;
    let mut tied = false;

    for &(denomination, score) in scores {
        match best {
            Some((_, top)) if score > top => {
                best = Some((denomination, score));
                tied = false;
            }
            Some((_, top)) if score == top => tied = true,
            Some(_) => {}
            None => best = Some((denomination, score)),
        }
    }

    match best {
        Some((denomination, score)) if !tied => (denomination, score),
        Some((_, score)) => (Denomination::OneHundred, score),
        None => (Denomination::OneHundred, 0.0),
    }
}

/// Map a feature vector to a denomination. Deterministic.
pub fn classify_features(features: &FeatureVector) -> ClassificationResult {
    for (idx, rule) in RULES.iter().enumerate() {
        if (rule.matches)(features) {
            return ClassificationResult {
                denomination: rule.denomination,
                confidence: RULE_CONFIDENCE,
                source: DecisionSource::Rule(idx as u8 + 1),
            };
        }
    }

    if features.is_black() {
        return ClassificationResult {
            denomination: Denomination::OneHundred,
            confidence: 0.0,
            source: DecisionSource::Fallback,
        };
    }

    let (denomination, confidence) = pick_best(&fallback_scores(features));
    ClassificationResult {
        denomination,
        confidence,
        source: DecisionSource::Fallback,
    }
}

/// Shared flag flipped by whatever loads the classifier
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<RwLock<bool>>,
}

impl ReadinessGate {
    pub fn ready() -> Self {
        Self {
            ready: Arc::new(RwLock::new(true)),
        }
    }

    pub fn pending() -> Self {
        Self {
            ready: Arc::new(RwLock::new(false)),
        }
    }

    pub fn mark_ready(&self) {
        *self.ready.write() = true;
    }

    pub fn mark_unready(&self) {
        *self.ready.write() = false;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.read()
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::ready()
    }
}

/// Single-frame classifier contract
#[async_trait]
pub trait FrameClassifier: Send + Sync {
    /// Whether [`FrameClassifier::classify`] may be invoked
    fn is_ready(&self) -> bool;

    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult, VisionError>;
}

/// Color-statistics classifier built on [`classify_features`]
pub struct ColorHeuristicClassifier {
    extractor: FeatureExtractor,
    gate: ReadinessGate,
}

impl ColorHeuristicClassifier {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            gate: ReadinessGate::ready(),
        }
    }

    /// Readiness follows an externally controlled gate
    pub fn with_gate(extractor: FeatureExtractor, gate: ReadinessGate) -> Self {
        Self { extractor, gate }
    }
}

impl Default for ColorHeuristicClassifier {
    fn default() -> Self {
        Self::new(FeatureExtractor::default())
    }
}

#[async_trait]
impl FrameClassifier for ColorHeuristicClassifier {
    fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult, VisionError> {
        let features = self.extractor.extract(frame)?;
        let result = classify_features(&features);
        debug!(
            "Classified frame as {} ({:?}, confidence {})",
            result.denomination, result.source, result.confidence
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(r: f32, g: f32, b: f32) -> ClassificationResult {
        classify_features(&FeatureVector::new(r, g, b))
    }

    #[test]
    fn test_rule_fifty() {
        let result = classify(60.0, 65.0, 150.0);
        assert_eq!(result.denomination, Denomination::Fifty);
        assert_eq!(result.source, DecisionSource::Rule(1));
        assert_eq!(result.confidence, RULE_CONFIDENCE);
    }

    #[test]
    fn test_rule_two_thousand() {
        let result = classify(200.0, 80.0, 160.0);
        assert_eq!(result.denomination, Denomination::TwoThousand);
        assert_eq!(result.source, DecisionSource::Rule(2));
    }

    #[test]
    fn test_rule_two_hundred() {
        let result = classify(220.0, 200.0, 60.0);
        assert_eq!(result.denomination, Denomination::TwoHundred);
        assert_eq!(result.source, DecisionSource::Rule(3));
    }

    #[test]
    fn test_rule_twenty() {
        let result = classify(110.0, 150.0, 80.0);
        assert_eq!(result.denomination, Denomination::Twenty);
        assert_eq!(result.source, DecisionSource::Rule(4));
    }

    #[test]
    fn test_rule_five_hundred() {
        let result = classify(120.0, 125.0, 118.0);
        assert_eq!(result.denomination, Denomination::FiveHundred);
        assert_eq!(result.source, DecisionSource::Rule(5));
    }

    #[test]
    fn test_rule_five_hundred_band_edges() {
        assert_eq!(classify(90.0, 90.0, 90.0).source, DecisionSource::Rule(5));
        assert_eq!(classify(160.0, 160.0, 160.0).source, DecisionSource::Rule(5));
        assert_ne!(classify(89.0, 89.0, 89.0).source, DecisionSource::Rule(5));
        assert_ne!(classify(161.0, 161.0, 161.0).source, DecisionSource::Rule(5));
    }

    #[test]
    fn test_rule_ten() {
        let result = classify(150.0, 115.0, 90.0);
        assert_eq!(result.denomination, Denomination::Ten);
        assert_eq!(result.source, DecisionSource::Rule(6));
    }

    #[test]
    fn test_rule_one_hundred() {
        let result = classify(130.0, 100.0, 115.0);
        assert_eq!(result.denomination, Denomination::OneHundred);
        assert_eq!(result.source, DecisionSource::Rule(7));
    }

    #[test]
    fn test_fifty_takes_precedence_over_later_rules() {
        // Satisfies both the blue and the magenta thresholds
        let both = FeatureVector::new(150.0, 60.0, 200.0);
        let rules = matching_rules(&both);
        assert!(rules.contains(&1));
        assert!(rules.contains(&2));
        assert_eq!(classify_features(&both).denomination, Denomination::Fifty);

        // Satisfies both the blue and the lavender thresholds
        let overlap = FeatureVector::new(130.0, 60.0, 200.0);
        let rules = matching_rules(&overlap);
        assert_eq!(rules.first(), Some(&1));
        assert!(rules.contains(&7));
        assert_eq!(classify_features(&overlap).source, DecisionSource::Rule(1));
    }

    #[test]
    fn test_absolute_thresholds_are_exclusive() {
        assert!(!matching_rules(&FeatureVector::new(100.0, 100.0, 120.0)).contains(&1));
        assert_eq!(classify(100.0, 100.0, 121.0).source, DecisionSource::Rule(1));
    }

    #[test]
    fn test_percentage_margins_are_inclusive() {
        // Blue exactly 20% above red and green
        assert_eq!(classify(110.0, 110.0, 132.0).source, DecisionSource::Rule(1));
        assert!(!matching_rules(&FeatureVector::new(110.0, 110.0, 131.0)).contains(&1));

        // Green exactly 50% above blue
        assert_eq!(classify(100.0, 150.0, 100.0).source, DecisionSource::Rule(4));
        assert!(!matching_rules(&FeatureVector::new(100.0, 150.0, 101.0)).contains(&4));

        // Blue exactly 10% above green
        assert_eq!(classify(118.0, 100.0, 110.0).source, DecisionSource::Rule(7));
        assert!(!matching_rules(&FeatureVector::new(118.0, 100.0, 109.0)).contains(&7));
    }

    #[test]
    fn test_ratio_bounds_are_exclusive() {
        // Red and green exactly 1.5 times blue
        assert!(!matching_rules(&FeatureVector::new(147.0, 147.0, 98.0)).contains(&3));
        assert_eq!(classify(148.0, 148.0, 98.0).source, DecisionSource::Rule(3));

        // Red exactly 1.5 times green falls outside the brown band
        assert!(!matching_rules(&FeatureVector::new(150.0, 100.0, 80.0)).contains(&6));
        assert_eq!(classify(149.0, 100.0, 80.0).source, DecisionSource::Rule(6));
    }

    #[test]
    fn test_fallback_lavender() {
        let result = classify(80.0, 40.0, 100.0);
        assert!(matching_rules(&FeatureVector::new(80.0, 40.0, 100.0)).is_empty());
        assert_eq!(result.source, DecisionSource::Fallback);
        assert_eq!(result.denomination, Denomination::OneHundred);
        assert!((result.confidence - 80.0 / 41.0).abs() < 1e-4);
    }

    #[test]
    fn test_fallback_dim_blue() {
        let result = classify(20.0, 30.0, 90.0);
        assert_eq!(result.source, DecisionSource::Fallback);
        assert_eq!(result.denomination, Denomination::Fifty);
        assert!((result.confidence - 90.0 / 31.0).abs() < 1e-4);
    }

    #[test]
    fn test_fallback_dark_grey() {
        let result = classify(30.0, 30.0, 30.0);
        assert_eq!(result.source, DecisionSource::Fallback);
        assert_eq!(result.denomination, Denomination::FiveHundred);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_black_defaults_to_one_hundred() {
        let result = classify(0.0, 0.0, 0.0);
        assert_eq!(result.denomination, Denomination::OneHundred);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, DecisionSource::Fallback);
    }

    #[test]
    fn test_pick_best_tie_defaults_to_one_hundred() {
        let scores = [
            (Denomination::Ten, 0.5),
            (Denomination::Twenty, 2.0),
            (Denomination::Fifty, 2.0),
        ];
        assert_eq!(pick_best(&scores), (Denomination::OneHundred, 2.0));
    }

    #[test]
    fn test_pick_best_strict_winner() {
        let scores = [
            (Denomination::Ten, 2.0),
            (Denomination::Twenty, 2.0),
            (Denomination::TwoThousand, 3.0),
        ];
        assert_eq!(pick_best(&scores), (Denomination::TwoThousand, 3.0));
    }

    #[test]
    fn test_fallback_scores_catalog_order() {
        let scores = fallback_scores(&FeatureVector::new(50.0, 60.0, 70.0));
        let order: Vec<Denomination> = scores.iter().map(|(d, _)| *d).collect();
        assert_eq!(order, Denomination::ALL.to_vec());
        assert!(scores.iter().all(|(_, s)| s.is_finite() && *s >= 0.0));
    }

    #[test]
    fn test_readiness_gate() {
        let gate = ReadinessGate::pending();
        let classifier = ColorHeuristicClassifier::with_gate(FeatureExtractor::default(), gate.clone());
        assert!(!classifier.is_ready());
        gate.mark_ready();
        assert!(classifier.is_ready());
        gate.mark_unready();
        assert!(!classifier.is_ready());
    }

    #[tokio::test]
    async fn test_heuristic_classifier_end_to_end() {
        let classifier = ColorHeuristicClassifier::default();
        let frame = Frame::filled(320, 240, [60, 65, 150, 255]);
        let result = classifier.classify(&frame).await.unwrap();
        assert_eq!(result.denomination, Denomination::Fifty);
    }

    #[tokio::test]
    async fn test_heuristic_classifier_unreadable_frame() {
        let classifier = ColorHeuristicClassifier::default();
        let frame = Frame::from_rgba(0, 0, Vec::new()).unwrap();
        assert!(matches!(
            classifier.classify(&frame).await,
            Err(VisionError::Extraction(_))
        ));
    }
}
