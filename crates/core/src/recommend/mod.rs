//! Preference-driven product recommendations
//!
//! Turns a session's questionnaire answers into a ranked list of eyewear products by
//! blending three signals (feature match, benefit match, feature-to-benefit
//! interconnection), rebalancing for brand diversity, and ordering in-stock products first.

mod diversity;
mod engine;
mod preference;
mod ranking;
mod scoring;
mod service;
mod source;
mod types;

pub use diversity::DiversityPolicy;
pub use engine::{RecommendationEngine, RecommendationInputs};
pub use preference::{build_benefit_score_map, build_preference_vector};
pub use ranking::rank_by_stock;
pub use scoring::{
    CandidateSignals, FeatureBenefitIndex, ScoreCalculator, ScoringWeights, StrengthCeilings,
};
pub use service::RecommendationService;
pub use source::{RecommendationSource, SourceError};
pub use types::*;

/// Default blend weights for the three signals.
pub const DEFAULT_WEIGHTS: ScoringWeights =
    ScoringWeights { feature: 0.40, benefit: 0.40, interconnected: 0.20 };

/// Assumed ceiling strengths used to normalize raw totals.
pub const DEFAULT_CEILINGS: StrengthCeilings = StrengthCeilings { feature: 2.0, benefit: 3.0 };

/// Number of recommendations returned when the caller does not ask for a size.
pub const DEFAULT_LIMIT: usize = 10;

/// Candidate lists at or below this size skip brand rebalancing.
pub const DIVERSITY_MIN_CANDIDATES: usize = 5;

/// Bonus for the first, second, ... occurrence of a brand; later occurrences get nothing.
pub const DEFAULT_BRAND_BONUSES: [f64; 2] = [2.0, 1.0];

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 100.0;
