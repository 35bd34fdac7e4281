use std::collections::HashMap;

use tokio::sync::RwLock;

use eyematch_core::domain::catalog::{FeatureBenefitMapping, FeatureId};
use eyematch_core::domain::product::{CandidateProduct, ProductId};
use eyematch_core::domain::questionnaire::{
    Answer, AnswerBenefitMapping, FeatureMapping, OptionId, SessionId,
};
use eyematch_core::domain::store::{StoreId, StoreProduct};
use eyematch_core::recommend::{
    RankedRecommendation, RecommendationRun, RecommendationSource, SourceError,
};

use super::{RecommendationRepository, RepositoryError};

#[derive(Default)]
struct CatalogState {
    feature_mappings: Vec<FeatureMapping>,
    benefit_mappings: Vec<AnswerBenefitMapping>,
    candidates: Vec<CandidateProduct>,
    feature_benefit_mappings: Vec<FeatureBenefitMapping>,
    store_products: Vec<StoreProduct>,
}

/// Recommendation source held entirely in memory, for tests and demos.
#[derive(Default)]
pub struct InMemoryRecommendationSource {
    answers: RwLock<HashMap<String, Vec<Answer>>>,
    catalog: RwLock<CatalogState>,
}

impl InMemoryRecommendationSource {
    pub async fn record_answer(&self, session_id: &SessionId, answer: Answer) {
        let mut answers = self.answers.write().await;
        answers.entry(session_id.0.clone()).or_default().push(answer);
    }

    pub async fn add_feature_mapping(&self, mapping: FeatureMapping) {
        self.catalog.write().await.feature_mappings.push(mapping);
    }

    pub async fn add_answer_benefit_mapping(&self, mapping: AnswerBenefitMapping) {
        self.catalog.write().await.benefit_mappings.push(mapping);
    }

    pub async fn add_candidate(&self, candidate: CandidateProduct) {
        self.catalog.write().await.candidates.push(candidate);
    }

    pub async fn add_feature_benefit_mapping(&self, mapping: FeatureBenefitMapping) {
        self.catalog.write().await.feature_benefit_mappings.push(mapping);
    }

    pub async fn put_store_product(&self, record: StoreProduct) {
        let mut catalog = self.catalog.write().await;
        catalog.store_products.retain(|existing| {
            existing.store_id != record.store_id || existing.product_id != record.product_id
        });
        catalog.store_products.push(record);
    }
}

#[async_trait::async_trait]
impl RecommendationSource for InMemoryRecommendationSource {
    async fn session_answers(&self, session_id: &SessionId) -> Result<Vec<Answer>, SourceError> {
        let answers = self.answers.read().await;
        Ok(answers.get(&session_id.0).cloned().unwrap_or_default())
    }

    async fn feature_mappings(&self, answers: &[Answer]) -> Result<Vec<FeatureMapping>, SourceError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .feature_mappings
            .iter()
            .filter(|mapping| {
                answers.iter().any(|answer| {
                    answer.question_id == mapping.question_id
                        && answer.option_key == mapping.option_key
                })
            })
            .cloned()
            .collect())
    }

    async fn answer_benefit_mappings(
        &self,
        option_ids: &[OptionId],
    ) -> Result<Vec<AnswerBenefitMapping>, SourceError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .benefit_mappings
            .iter()
            .filter(|mapping| option_ids.contains(&mapping.option_id))
            .cloned()
            .collect())
    }

    async fn active_candidates(
        &self,
        product_type: &str,
    ) -> Result<Vec<CandidateProduct>, SourceError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .candidates
            .iter()
            .filter(|candidate| {
                candidate.product.active && candidate.product.product_type == product_type
            })
            .cloned()
            .collect())
    }

    async fn feature_benefit_mappings(
        &self,
        feature_ids: &[FeatureId],
    ) -> Result<Vec<FeatureBenefitMapping>, SourceError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .feature_benefit_mappings
            .iter()
            .filter(|mapping| feature_ids.contains(&mapping.feature_id))
            .cloned()
            .collect())
    }

    async fn store_products(
        &self,
        store_id: &StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<StoreProduct>, SourceError> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .store_products
            .iter()
            .filter(|record| &record.store_id == store_id && product_ids.contains(&record.product_id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRecommendationRepository {
    runs: RwLock<HashMap<String, Vec<RankedRecommendation>>>,
}

#[async_trait::async_trait]
impl RecommendationRepository for InMemoryRecommendationRepository {
    async fn save_ranked(&self, run: &RecommendationRun) -> Result<usize, RepositoryError> {
        let ranked = RankedRecommendation::from_ordered(run.recommendations.clone());
        let written = ranked.len();
        let mut runs = self.runs.write().await;
        runs.insert(run.session_id.0.clone(), ranked);
        Ok(written)
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<RankedRecommendation>, RepositoryError> {
        let runs = self.runs.read().await;
        Ok(runs.get(&session_id.0).cloned().unwrap_or_default())
    }
}
