use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::{FeatureBenefitMapping, FeatureId};
use crate::domain::product::{CandidateProduct, ProductId};
use crate::domain::questionnaire::{Answer, AnswerBenefitMapping, FeatureMapping, OptionId, SessionId};
use crate::domain::store::{StoreId, StoreProduct};
use crate::errors::ApplicationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("bulk read of {entity} failed: {message}")]
    BulkRead { entity: &'static str, message: String },
}

impl SourceError {
    pub fn bulk_read(entity: &'static str, message: impl Into<String>) -> Self {
        Self::BulkRead { entity, message: message.into() }
    }
}

impl From<SourceError> for ApplicationError {
    fn from(value: SourceError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Bulk reads feeding one recommendation run.
///
/// Every method returns all rows for its whole key set in a single round trip; nothing here
/// is called per answer or per candidate.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn session_answers(&self, session_id: &SessionId) -> Result<Vec<Answer>, SourceError>;

    /// Feature mappings for every (question, option key) pair in `answers`.
    async fn feature_mappings(&self, answers: &[Answer]) -> Result<Vec<FeatureMapping>, SourceError>;

    /// Answer-benefit mappings for the selected options, with benefit codes resolved.
    async fn answer_benefit_mappings(
        &self,
        option_ids: &[OptionId],
    ) -> Result<Vec<AnswerBenefitMapping>, SourceError>;

    /// Active products of `product_type` with their feature and benefit associations.
    async fn active_candidates(
        &self,
        product_type: &str,
    ) -> Result<Vec<CandidateProduct>, SourceError>;

    async fn feature_benefit_mappings(
        &self,
        feature_ids: &[FeatureId],
    ) -> Result<Vec<FeatureBenefitMapping>, SourceError>;

    async fn store_products(
        &self,
        store_id: &StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<StoreProduct>, SourceError>;
}
