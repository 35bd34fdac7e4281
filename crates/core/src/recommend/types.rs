//! Types for the recommendation engine

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::FeatureId;
use crate::domain::product::ProductId;
use crate::domain::questionnaire::SessionId;
use crate::domain::store::StoreId;
use crate::errors::DomainError;

/// Accumulated feature weight per feature, derived from a session's answers.
///
/// Ordered so repeated runs sum floating point contributions in the same order.
pub type PreferenceVector = BTreeMap<FeatureId, f64>;

/// Accumulated benefit points keyed by benefit code.
pub type BenefitScoreMap = BTreeMap<String, f64>;

/// Storefront category requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Frames,
    Sunglasses,
    Lenses,
    ContactLenses,
}

impl ProductCategory {
    /// Catalog product type this category filters on.
    pub fn product_type(&self) -> &'static str {
        match self {
            ProductCategory::Frames => "frame",
            ProductCategory::Sunglasses => "sunglass",
            ProductCategory::Lenses => "lens",
            ProductCategory::ContactLenses => "contact_lens",
        }
    }
}

impl FromStr for ProductCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "frames" | "frame" | "eyeglasses" => Ok(Self::Frames),
            "sunglasses" | "sunglass" => Ok(Self::Sunglasses),
            "lenses" | "lens" | "spectacle_lens" => Ok(Self::Lenses),
            "contact_lenses" | "contact_lens" | "contacts" => Ok(Self::ContactLenses),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown product category `{other}` (expected frames|sunglasses|lenses|contact_lenses)"
            ))),
        }
    }
}

/// Request for a ranked recommendation list
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub session_id: SessionId,
    pub store_id: StoreId,
    pub category: ProductCategory,
    /// Falls back to the service default when unset.
    pub limit: Option<usize>,
}

impl RecommendationRequest {
    pub fn new(
        session_id: impl Into<String>,
        store_id: impl Into<String>,
        category: ProductCategory,
    ) -> Self {
        Self {
            session_id: SessionId(session_id.into()),
            store_id: StoreId(store_id.into()),
            category,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The three independent signals for one candidate, each in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub feature: f64,
    pub benefit: f64,
    pub interconnected: f64,
}

/// A candidate product after scoring, blending and stock resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product_id: ProductId,
    pub brand: Option<String>,
    pub feature_score: f64,
    pub benefit_score: f64,
    pub interconnected_score: f64,
    pub match_score: f64,
    pub store_price: Decimal,
    pub in_stock: bool,
}

/// One entry of the list handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    /// 1-based position in the final ordering.
    pub rank: u32,
    #[serde(flatten)]
    pub candidate: ScoredCandidate,
    /// Set later by the storefront when the customer picks a product.
    pub is_selected: bool,
}

impl RankedRecommendation {
    pub fn from_ordered(candidates: Vec<ScoredCandidate>) -> Vec<Self> {
        candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| Self {
                rank: (index + 1) as u32,
                candidate,
                is_selected: false,
            })
            .collect()
    }
}

/// Outcome of one recommendation invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRun {
    pub session_id: SessionId,
    pub store_id: StoreId,
    pub category: ProductCategory,
    /// Number of answers the session had; zero means every signal scored 0.
    pub answer_count: usize,
    /// Active candidates scored before truncation.
    pub candidate_count: usize,
    pub recommendations: Vec<ScoredCandidate>,
}
