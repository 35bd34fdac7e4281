//! Scoring algorithms for recommendation candidates

use std::collections::HashMap;

use crate::domain::catalog::{FeatureBenefitMapping, FeatureId};
use crate::domain::product::CandidateProduct;

use super::types::{BenefitScoreMap, PreferenceVector, SignalScores};
use super::MAX_SCORE;

/// Weights for blending the three signals into one match score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight for the feature score (default: 0.40)
    pub feature: f64,
    /// Weight for the benefit score (default: 0.40)
    pub benefit: f64,
    /// Weight for the interconnected score (default: 0.20)
    pub interconnected: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

/// Strengths assumed to be the best a product can offer, used as normalization ceilings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthCeilings {
    /// Highest product-feature strength (default: 2.0)
    pub feature: f64,
    /// Highest product-benefit strength (default: 3.0)
    pub benefit: f64,
}

impl Default for StrengthCeilings {
    fn default() -> Self {
        super::DEFAULT_CEILINGS
    }
}

/// Per-candidate lookup tables built once before scoring.
#[derive(Debug, Default)]
pub struct CandidateSignals<'a> {
    features: HashMap<&'a FeatureId, f64>,
    benefits: HashMap<&'a str, f64>,
}

impl<'a> CandidateSignals<'a> {
    /// Index a candidate's associations. When an association repeats, the first row wins;
    /// benefits without a resolved code are dropped.
    pub fn from_candidate(candidate: &'a CandidateProduct) -> Self {
        let mut features = HashMap::with_capacity(candidate.features.len());
        for feature in &candidate.features {
            features.entry(&feature.feature_id).or_insert(feature.strength);
        }

        let mut benefits = HashMap::with_capacity(candidate.benefits.len());
        for benefit in &candidate.benefits {
            if let Some(code) = benefit.benefit_code.as_deref() {
                benefits.entry(code).or_insert(benefit.strength);
            }
        }

        Self { features, benefits }
    }

    pub fn feature_strength(&self, feature_id: &FeatureId) -> Option<f64> {
        self.features.get(feature_id).copied()
    }

    pub fn benefit_strength(&self, benefit_code: &str) -> Option<f64> {
        self.benefits.get(benefit_code).copied()
    }
}

/// Feature-to-benefit mappings grouped by feature.
#[derive(Debug, Default)]
pub struct FeatureBenefitIndex<'a> {
    by_feature: HashMap<&'a FeatureId, Vec<&'a FeatureBenefitMapping>>,
}

impl<'a> FeatureBenefitIndex<'a> {
    pub fn new(mappings: &'a [FeatureBenefitMapping]) -> Self {
        let mut by_feature: HashMap<&FeatureId, Vec<&FeatureBenefitMapping>> = HashMap::new();
        for mapping in mappings {
            by_feature.entry(&mapping.feature_id).or_default().push(mapping);
        }
        Self { by_feature }
    }

    pub fn mappings_for(&self, feature_id: &FeatureId) -> &[&'a FeatureBenefitMapping] {
        self.by_feature.get(feature_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Score calculator for recommendation candidates
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    weights: ScoringWeights,
    ceilings: StrengthCeilings,
}

impl ScoreCalculator {
    /// Create a new score calculator with default weights and ceilings
    pub fn new() -> Self {
        Self { weights: ScoringWeights::default(), ceilings: StrengthCeilings::default() }
    }

    /// Create with custom weights
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights, ceilings: StrengthCeilings::default() }
    }

    /// Replace the normalization ceilings
    pub fn with_ceilings(mut self, ceilings: StrengthCeilings) -> Self {
        self.ceilings = ceilings;
        self
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// How well the candidate's features match the preference vector.
    pub fn feature_score(&self, preferences: &PreferenceVector, signals: &CandidateSignals) -> f64 {
        if preferences.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        let mut maximum = 0.0;
        for (feature_id, weight) in preferences {
            if let Some(strength) = signals.feature_strength(feature_id) {
                total += weight * strength;
            }
            maximum += weight.abs() * self.ceilings.feature;
        }

        normalize(total, maximum)
    }

    /// How well the candidate delivers the benefits the answers asked for.
    pub fn benefit_score(&self, benefit_scores: &BenefitScoreMap, signals: &CandidateSignals) -> f64 {
        if benefit_scores.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        let mut maximum = 0.0;
        for (code, points) in benefit_scores {
            if let Some(strength) = signals.benefit_strength(code) {
                total += points * strength;
            }
            maximum += points * self.ceilings.benefit;
        }

        normalize(total, maximum)
    }

    /// Credit for preferred features that also unlock a requested benefit the candidate has.
    ///
    /// Every visited mapping widens the maximum, including mappings whose benefit was not
    /// requested or that the candidate lacks.
    pub fn interconnected_score(
        &self,
        preferences: &PreferenceVector,
        benefit_scores: &BenefitScoreMap,
        index: &FeatureBenefitIndex,
        signals: &CandidateSignals,
    ) -> f64 {
        let mut total = 0.0;
        let mut maximum = 0.0;

        for (feature_id, feature_weight) in preferences {
            for mapping in index.mappings_for(feature_id) {
                let code = mapping.benefit_code.as_deref();
                let points = code.and_then(|code| benefit_scores.get(code)).copied().unwrap_or(0.0);

                if points > 0.0 {
                    if let Some(strength) = code.and_then(|code| signals.benefit_strength(code)) {
                        total += feature_weight * mapping.weight * strength;
                    }
                }
                maximum += feature_weight.abs() * mapping.weight * self.ceilings.benefit;
            }
        }

        normalize(total, maximum)
    }

    /// Compute all three signals for one candidate.
    pub fn score_signals(
        &self,
        preferences: &PreferenceVector,
        benefit_scores: &BenefitScoreMap,
        index: &FeatureBenefitIndex,
        signals: &CandidateSignals,
    ) -> SignalScores {
        SignalScores {
            feature: self.feature_score(preferences, signals),
            benefit: self.benefit_score(benefit_scores, signals),
            interconnected: self.interconnected_score(preferences, benefit_scores, index, signals),
        }
    }

    /// Blend the three signals into the match score.
    pub fn blend(&self, scores: &SignalScores) -> f64 {
        let blended = scores.feature * self.weights.feature
            + scores.benefit * self.weights.benefit
            + scores.interconnected * self.weights.interconnected;

        blended.clamp(0.0, MAX_SCORE)
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale `total / maximum` to 0..=100; a non-positive maximum scores 0.
fn normalize(total: f64, maximum: f64) -> f64 {
    if maximum <= 0.0 {
        return 0.0;
    }
    (total / maximum * MAX_SCORE).clamp(0.0, MAX_SCORE)
}
