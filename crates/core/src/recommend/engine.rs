//! Recommendation engine implementation

use std::collections::HashMap;

use crate::domain::catalog::FeatureBenefitMapping;
use crate::domain::product::{CandidateProduct, ProductId};
use crate::domain::questionnaire::{Answer, AnswerBenefitMapping, FeatureMapping, OptionId};
use crate::domain::store::StoreProduct;

use super::diversity::DiversityPolicy;
use super::preference::{build_benefit_score_map, build_preference_vector};
use super::ranking::rank_by_stock;
use super::scoring::{CandidateSignals, FeatureBenefitIndex, ScoreCalculator};
use super::types::ScoredCandidate;

/// Everything one run reads, already fetched in bulk.
#[derive(Debug, Clone, Default)]
pub struct RecommendationInputs {
    pub answers: Vec<Answer>,
    pub feature_mappings: Vec<FeatureMapping>,
    pub benefit_mappings: Vec<AnswerBenefitMapping>,
    /// Candidates in load order; ties keep this order through every sort.
    pub candidates: Vec<CandidateProduct>,
    pub feature_benefit_mappings: Vec<FeatureBenefitMapping>,
    pub store_products: Vec<StoreProduct>,
}

/// Stateless scoring pipeline: score, blend, rebalance, rank.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    calculator: ScoreCalculator,
    diversity: DiversityPolicy,
}

impl RecommendationEngine {
    pub fn new(calculator: ScoreCalculator, diversity: DiversityPolicy) -> Self {
        Self { calculator, diversity }
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    /// Score and blend every candidate, keeping load order.
    pub fn score_candidates(&self, inputs: &RecommendationInputs) -> Vec<ScoredCandidate> {
        let preferences = build_preference_vector(&inputs.answers, &inputs.feature_mappings);
        let selected_options: Vec<OptionId> =
            inputs.answers.iter().map(|answer| answer.option_id.clone()).collect();
        let benefit_scores = build_benefit_score_map(&selected_options, &inputs.benefit_mappings);
        let index = FeatureBenefitIndex::new(&inputs.feature_benefit_mappings);

        let mut stock: HashMap<&ProductId, &StoreProduct> =
            HashMap::with_capacity(inputs.store_products.len());
        for record in &inputs.store_products {
            stock.entry(&record.product_id).or_insert(record);
        }

        inputs
            .candidates
            .iter()
            .map(|candidate| {
                let signals = CandidateSignals::from_candidate(candidate);
                let scores =
                    self.calculator.score_signals(&preferences, &benefit_scores, &index, &signals);
                let product = &candidate.product;
                let store_record = stock.get(&product.id);

                ScoredCandidate {
                    product_id: product.id.clone(),
                    brand: product.brand.clone(),
                    feature_score: scores.feature,
                    benefit_score: scores.benefit,
                    interconnected_score: scores.interconnected,
                    match_score: self.calculator.blend(&scores),
                    store_price: store_record
                        .map(|record| record.effective_price(product.base_price))
                        .unwrap_or(product.base_price),
                    in_stock: store_record.map(|record| record.in_stock()).unwrap_or(false),
                }
            })
            .collect()
    }

    /// Full pipeline, returning at most `limit` candidates in final order.
    pub fn recommend(&self, inputs: &RecommendationInputs, limit: usize) -> Vec<ScoredCandidate> {
        let scored = self.score_candidates(inputs);
        let rebalanced = self.diversity.rebalance(scored);
        rank_by_stock(rebalanced, limit)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::catalog::{BenefitId, FeatureId};
    use crate::domain::product::Product;
    use crate::domain::questionnaire::QuestionId;
    use crate::domain::store::StoreId;

    fn product(id: &str, brand: Option<&str>) -> CandidateProduct {
        CandidateProduct::new(Product {
            id: ProductId(id.to_string()),
            sku: format!("SKU-{id}"),
            name: format!("Frame {id}"),
            brand: brand.map(str::to_owned),
            product_type: "frame".to_string(),
            base_price: Decimal::new(12_000, 2),
            active: true,
        })
    }

    fn stock(id: &str, is_available: bool, quantity: i64, price: Option<i64>) -> StoreProduct {
        StoreProduct {
            store_id: StoreId("store-1".to_string()),
            product_id: ProductId(id.to_string()),
            price_override: price.map(|cents| Decimal::new(cents, 2)),
            is_available,
            quantity,
        }
    }

    fn feature_mapping(question: &str, key: &str, feature: &str, weight: f64) -> FeatureMapping {
        FeatureMapping {
            question_id: QuestionId(question.to_string()),
            option_key: key.to_string(),
            feature_id: FeatureId(feature.to_string()),
            weight,
        }
    }

    fn benefit_mapping(option: &str, code: &str, points: f64) -> AnswerBenefitMapping {
        AnswerBenefitMapping {
            option_id: OptionId(option.to_string()),
            benefit_id: BenefitId(format!("ben-{code}")),
            benefit_code: Some(code.to_string()),
            points,
        }
    }

    fn screen_heavy_inputs() -> RecommendationInputs {
        RecommendationInputs {
            answers: vec![
                Answer::new("q-screen", "opt-screen-high", "high"),
                Answer::new("q-drive", "opt-drive-night", "night"),
            ],
            feature_mappings: vec![
                feature_mapping("q-screen", "high", "blue_filter", 2.0),
                feature_mapping("q-drive", "night", "anti_reflective", 1.0),
            ],
            benefit_mappings: vec![
                benefit_mapping("opt-screen-high", "EYE_COMFORT", 3.0),
                benefit_mapping("opt-drive-night", "CLEAR_NIGHT", 2.0),
            ],
            candidates: vec![
                product("full", Some("Lumen"))
                    .with_feature("blue_filter", 2.0)
                    .with_feature("anti_reflective", 2.0)
                    .with_benefit("ben-EYE_COMFORT", Some("EYE_COMFORT"), 3.0)
                    .with_benefit("ben-CLEAR_NIGHT", Some("CLEAR_NIGHT"), 3.0),
                product("partial", Some("Lumen")).with_feature("blue_filter", 1.0),
                product("bare", None),
            ],
            feature_benefit_mappings: vec![FeatureBenefitMapping {
                feature_id: FeatureId("blue_filter".to_string()),
                benefit_id: BenefitId("ben-EYE_COMFORT".to_string()),
                benefit_code: Some("EYE_COMFORT".to_string()),
                weight: 1.0,
            }],
            store_products: vec![
                stock("full", true, 4, Some(9_900)),
                stock("partial", true, 0, None),
            ],
        }
    }

    #[test]
    fn full_match_scores_one_hundred_on_every_signal() {
        let engine = RecommendationEngine::default();
        let scored = engine.score_candidates(&screen_heavy_inputs());

        let full = &scored[0];
        assert_eq!(full.feature_score, 100.0);
        assert_eq!(full.benefit_score, 100.0);
        assert_eq!(full.interconnected_score, 100.0);
        assert!((full.match_score - 100.0).abs() < 1e-9);
        assert_eq!(full.store_price, Decimal::new(9_900, 2));
        assert!(full.in_stock);
    }

    #[test]
    fn candidates_without_associations_score_zero() {
        let engine = RecommendationEngine::default();
        let scored = engine.score_candidates(&screen_heavy_inputs());

        let bare = &scored[2];
        assert_eq!(bare.feature_score, 0.0);
        assert_eq!(bare.benefit_score, 0.0);
        assert_eq!(bare.interconnected_score, 0.0);
        assert_eq!(bare.match_score, 0.0);
    }

    #[test]
    fn missing_store_record_means_out_of_stock_at_base_price() {
        let engine = RecommendationEngine::default();
        let scored = engine.score_candidates(&screen_heavy_inputs());

        let bare = &scored[2];
        assert!(!bare.in_stock);
        assert_eq!(bare.store_price, Decimal::new(12_000, 2));

        let partial = &scored[1];
        assert!(!partial.in_stock, "zero quantity is out of stock");
        assert_eq!(partial.store_price, Decimal::new(12_000, 2));
    }

    #[test]
    fn every_signal_stays_within_bounds() {
        let engine = RecommendationEngine::default();
        let mut inputs = screen_heavy_inputs();
        inputs.feature_mappings.push(feature_mapping("q-screen", "high", "polarized", -2.0));
        for index in 0..8 {
            let strength = index as f64 / 4.0;
            inputs.candidates.push(
                product(&format!("grid-{index}"), Some("Grid"))
                    .with_feature("polarized", strength)
                    .with_feature("blue_filter", 2.0 - strength)
                    .with_benefit("ben-EYE_COMFORT", Some("EYE_COMFORT"), strength * 1.5),
            );
        }

        for candidate in engine.score_candidates(&inputs) {
            for score in [
                candidate.feature_score,
                candidate.benefit_score,
                candidate.interconnected_score,
                candidate.match_score,
            ] {
                assert!((0.0..=100.0).contains(&score), "score {score} out of bounds");
            }
        }
    }

    #[test]
    fn zero_answers_degenerate_to_stock_then_insertion_order() {
        let engine = RecommendationEngine::default();
        let mut inputs = screen_heavy_inputs();
        inputs.answers.clear();
        inputs.store_products.push(stock("bare", true, 1, None));

        let ranked = engine.recommend(&inputs, 10);

        assert!(ranked.iter().all(|candidate| candidate.match_score == 0.0));
        let ids: Vec<&str> = ranked.iter().map(|c| c.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["full", "bare", "partial"]);
    }

    #[test]
    fn zero_answers_over_the_diversity_threshold_keep_insertion_order() {
        let engine = RecommendationEngine::default();
        let mut inputs = RecommendationInputs::default();
        for (id, brand) in
            [("a0", "A"), ("a1", "A"), ("a2", "A"), ("b3", "B"), ("b4", "B"), ("c5", "C")]
        {
            inputs.candidates.push(product(id, Some(brand)).with_feature("blue_filter", 2.0));
            inputs.store_products.push(stock(id, true, 1, None));
        }
        inputs.candidates.push(product("gone", Some("C")));
        inputs.store_products.push(stock("gone", true, 0, None));

        let ranked = engine.recommend(&inputs, 10);

        assert!(ranked.iter().all(|candidate| candidate.match_score == 0.0));
        let ids: Vec<&str> = ranked.iter().map(|c| c.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["a0", "a1", "a2", "b3", "b4", "c5", "gone"]);
    }

    #[test]
    fn output_length_is_bounded_by_limit_and_candidates() {
        let engine = RecommendationEngine::default();
        let inputs = screen_heavy_inputs();

        assert_eq!(engine.recommend(&inputs, 10).len(), 3);
        assert_eq!(engine.recommend(&inputs, 2).len(), 2);
        assert!(engine.recommend(&RecommendationInputs::default(), 10).is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let engine = RecommendationEngine::default();
        let mut inputs = screen_heavy_inputs();
        for index in 0..6 {
            inputs.candidates.push(
                product(&format!("extra-{index}"), Some(if index % 2 == 0 { "Vista" } else { "Lumen" }))
                    .with_feature("anti_reflective", 1.0),
            );
        }

        let first = engine.recommend(&inputs, 10);
        for _ in 0..5 {
            assert_eq!(engine.recommend(&inputs, 10), first);
        }
    }
}
