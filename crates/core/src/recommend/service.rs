use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::domain::catalog::FeatureId;
use crate::domain::product::ProductId;
use crate::domain::questionnaire::OptionId;
use crate::errors::{ApplicationError, DomainError};

use super::engine::{RecommendationEngine, RecommendationInputs};
use super::source::RecommendationSource;
use super::types::{RecommendationRequest, RecommendationRun};
use super::DEFAULT_LIMIT;

/// Loads everything a run needs through `RecommendationSource` and ranks it.
///
/// Holds no per-run state; one service can serve concurrent sessions.
pub struct RecommendationService<S> {
    source: S,
    engine: RecommendationEngine,
    default_limit: usize,
}

impl<S: RecommendationSource> RecommendationService<S> {
    pub fn new(source: S, engine: RecommendationEngine) -> Self {
        Self { source, engine, default_limit: DEFAULT_LIMIT }
    }

    pub fn with_default_limit(mut self, default_limit: usize) -> Self {
        self.default_limit = default_limit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generate the ranked list for one session, store and category.
    ///
    /// Any failed bulk read aborts the run; no partial result is returned.
    pub async fn generate(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationRun, ApplicationError> {
        let limit = request.limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(DomainError::InvalidLimit(limit).into());
        }

        info!(
            event_name = "recommendation.generate.start",
            session_id = %request.session_id.0,
            store_id = %request.store_id.0,
            category = request.category.product_type(),
            limit,
            "generating recommendations"
        );

        let inputs = self.load_inputs(request).await?;
        let answer_count = inputs.answers.len();
        let candidate_count = inputs.candidates.len();
        let recommendations = self.engine.recommend(&inputs, limit);

        info!(
            event_name = "recommendation.generate.completed",
            session_id = %request.session_id.0,
            answer_count,
            candidate_count,
            returned = recommendations.len(),
            "recommendations generated"
        );

        Ok(RecommendationRun {
            session_id: request.session_id.clone(),
            store_id: request.store_id.clone(),
            category: request.category,
            answer_count,
            candidate_count,
            recommendations,
        })
    }

    async fn load_inputs(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationInputs, ApplicationError> {
        let answers = self.source.session_answers(&request.session_id).await?;
        let feature_mappings = self.source.feature_mappings(&answers).await?;

        let option_ids: Vec<OptionId> = answers
            .iter()
            .map(|answer| answer.option_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let benefit_mappings = self.source.answer_benefit_mappings(&option_ids).await?;

        let candidates = self.source.active_candidates(request.category.product_type()).await?;
        if candidates.is_empty() {
            debug!(
                event_name = "recommendation.generate.no_candidates",
                session_id = %request.session_id.0,
                category = request.category.product_type(),
                "no active candidates for category"
            );
            return Ok(RecommendationInputs { answers, feature_mappings, benefit_mappings, ..Default::default() });
        }

        let feature_ids: Vec<FeatureId> = feature_mappings
            .iter()
            .map(|mapping| mapping.feature_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let feature_benefit_mappings = self.source.feature_benefit_mappings(&feature_ids).await?;

        let product_ids: Vec<ProductId> =
            candidates.iter().map(|candidate| candidate.product.id.clone()).collect();
        let store_products = self.source.store_products(&request.store_id, &product_ids).await?;

        debug!(
            event_name = "recommendation.generate.loaded",
            session_id = %request.session_id.0,
            answers = answers.len(),
            feature_mappings = feature_mappings.len(),
            benefit_mappings = benefit_mappings.len(),
            feature_benefit_mappings = feature_benefit_mappings.len(),
            store_products = store_products.len(),
            "bulk inputs loaded"
        );

        Ok(RecommendationInputs {
            answers,
            feature_mappings,
            benefit_mappings,
            candidates,
            feature_benefit_mappings,
            store_products,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::catalog::FeatureBenefitMapping;
    use crate::domain::product::{CandidateProduct, Product};
    use crate::domain::questionnaire::{
        Answer, AnswerBenefitMapping, FeatureMapping, QuestionId, SessionId,
    };
    use crate::domain::store::{StoreId, StoreProduct};
    use crate::recommend::{ProductCategory, SourceError};

    #[derive(Default)]
    struct FixtureSource {
        answers: HashMap<String, Vec<Answer>>,
        feature_mappings: Vec<FeatureMapping>,
        candidates: Vec<CandidateProduct>,
        store_products: Vec<StoreProduct>,
        fail_candidates: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecommendationSource for FixtureSource {
        async fn session_answers(&self, session_id: &SessionId) -> Result<Vec<Answer>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answers.get(&session_id.0).cloned().unwrap_or_default())
        }

        async fn feature_mappings(&self, answers: &[Answer]) -> Result<Vec<FeatureMapping>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .feature_mappings
                .iter()
                .filter(|mapping| {
                    answers.iter().any(|answer| {
                        answer.question_id == mapping.question_id && answer.option_key == mapping.option_key
                    })
                })
                .cloned()
                .collect())
        }

        async fn answer_benefit_mappings(
            &self,
            _option_ids: &[OptionId],
        ) -> Result<Vec<AnswerBenefitMapping>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn active_candidates(&self, product_type: &str) -> Result<Vec<CandidateProduct>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_candidates {
                return Err(SourceError::bulk_read("product", "connection reset"));
            }
            Ok(self
                .candidates
                .iter()
                .filter(|candidate| candidate.product.product_type == product_type && candidate.product.active)
                .cloned()
                .collect())
        }

        async fn feature_benefit_mappings(
            &self,
            _feature_ids: &[FeatureId],
        ) -> Result<Vec<FeatureBenefitMapping>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn store_products(
            &self,
            store_id: &StoreId,
            product_ids: &[ProductId],
        ) -> Result<Vec<StoreProduct>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .store_products
                .iter()
                .filter(|record| &record.store_id == store_id && product_ids.contains(&record.product_id))
                .cloned()
                .collect())
        }
    }

    fn frame(id: &str, product_type: &str) -> CandidateProduct {
        CandidateProduct::new(Product {
            id: ProductId(id.to_string()),
            sku: format!("SKU-{id}"),
            name: id.to_string(),
            brand: Some("Lumen".to_string()),
            product_type: product_type.to_string(),
            base_price: Decimal::new(15_000, 2),
            active: true,
        })
    }

    fn fixture() -> FixtureSource {
        let mut answers = HashMap::new();
        answers.insert("sess-1".to_string(), vec![Answer::new("q-screen", "opt-high", "high")]);

        FixtureSource {
            answers,
            feature_mappings: vec![FeatureMapping {
                question_id: QuestionId("q-screen".to_string()),
                option_key: "high".to_string(),
                feature_id: FeatureId("blue_filter".to_string()),
                weight: 2.0,
            }],
            candidates: vec![
                frame("f-1", "frame").with_feature("blue_filter", 2.0),
                frame("f-2", "frame"),
                frame("s-1", "sunglass").with_feature("blue_filter", 2.0),
            ],
            store_products: vec![StoreProduct {
                store_id: StoreId("store-1".to_string()),
                product_id: ProductId("f-2".to_string()),
                price_override: None,
                is_available: true,
                quantity: 2,
            }],
            ..FixtureSource::default()
        }
    }

    #[tokio::test]
    async fn generate_ranks_in_stock_first_within_category() {
        let service = RecommendationService::new(fixture(), RecommendationEngine::default());
        let request = RecommendationRequest::new("sess-1", "store-1", ProductCategory::Frames);

        let run = service.generate(&request).await.expect("generate");

        assert_eq!(run.answer_count, 1);
        assert_eq!(run.candidate_count, 2);
        let ids: Vec<&str> = run.recommendations.iter().map(|c| c.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["f-2", "f-1"]);
        assert_eq!(run.recommendations[1].feature_score, 100.0);
    }

    #[tokio::test]
    async fn bulk_reads_do_not_scale_with_candidates() {
        let mut source = fixture();
        for index in 0..20 {
            source.candidates.push(frame(&format!("extra-{index}"), "frame"));
        }
        let service = RecommendationService::new(source, RecommendationEngine::default());
        let request = RecommendationRequest::new("sess-1", "store-1", ProductCategory::Frames);

        let run = service.generate(&request).await.expect("generate");

        assert_eq!(run.recommendations.len(), DEFAULT_LIMIT);
        assert_eq!(service.source().calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn empty_category_returns_empty_list() {
        let service = RecommendationService::new(fixture(), RecommendationEngine::default());
        let request = RecommendationRequest::new("sess-1", "store-1", ProductCategory::ContactLenses);

        let run = service.generate(&request).await.expect("generate");

        assert!(run.recommendations.is_empty());
        assert_eq!(run.candidate_count, 0);
    }

    #[tokio::test]
    async fn unknown_session_scores_everything_zero() {
        let service = RecommendationService::new(fixture(), RecommendationEngine::default());
        let request = RecommendationRequest::new("sess-unknown", "store-1", ProductCategory::Frames);

        let run = service.generate(&request).await.expect("generate");

        assert_eq!(run.answer_count, 0);
        assert!(run.recommendations.iter().all(|c| c.match_score == 0.0));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let service = RecommendationService::new(fixture(), RecommendationEngine::default());
        let request =
            RecommendationRequest::new("sess-1", "store-1", ProductCategory::Frames).with_limit(0);

        let error = service.generate(&request).await.expect_err("limit 0 should fail");
        assert_eq!(error, ApplicationError::Domain(DomainError::InvalidLimit(0)));
    }

    #[tokio::test]
    async fn failed_bulk_read_aborts_the_run() {
        let source = FixtureSource { fail_candidates: true, ..fixture() };
        let service = RecommendationService::new(source, RecommendationEngine::default());
        let request = RecommendationRequest::new("sess-1", "store-1", ProductCategory::Frames);

        let error = service.generate(&request).await.expect_err("read failure should abort");
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("product")));
    }
}
