//! Answer aggregation into preference and benefit maps

use std::collections::HashMap;

use crate::domain::questionnaire::{Answer, AnswerBenefitMapping, FeatureMapping, OptionId};

use super::types::{BenefitScoreMap, PreferenceVector};

/// Sum feature mapping weights for every answered (question, option key) pair.
///
/// `mappings` is the result of one bulk read covering all answers; rows for pairs that were
/// not answered are ignored. A feature referenced by several answers accumulates.
pub fn build_preference_vector(answers: &[Answer], mappings: &[FeatureMapping]) -> PreferenceVector {
    let mut by_answer: HashMap<(&str, &str), Vec<&FeatureMapping>> = HashMap::new();
    for mapping in mappings {
        by_answer
            .entry((mapping.question_id.0.as_str(), mapping.option_key.as_str()))
            .or_default()
            .push(mapping);
    }

    let mut vector = PreferenceVector::new();
    for answer in answers {
        let key = (answer.question_id.0.as_str(), answer.option_key.as_str());
        for mapping in by_answer.get(&key).into_iter().flatten() {
            *vector.entry(mapping.feature_id.clone()).or_insert(0.0) += mapping.weight;
        }
    }

    vector
}

/// Sum benefit points per benefit code across the selected options.
///
/// Rows whose benefit could not be resolved to a code contribute nothing.
pub fn build_benefit_score_map(
    selected_options: &[OptionId],
    mappings: &[AnswerBenefitMapping],
) -> BenefitScoreMap {
    let mut by_option: HashMap<&OptionId, Vec<&AnswerBenefitMapping>> = HashMap::new();
    for mapping in mappings {
        by_option.entry(&mapping.option_id).or_default().push(mapping);
    }

    let mut scores = BenefitScoreMap::new();
    for option_id in selected_options {
        for mapping in by_option.get(option_id).into_iter().flatten() {
            let Some(code) = mapping.benefit_code.as_deref() else {
                continue;
            };
            *scores.entry(code.to_owned()).or_insert(0.0) += mapping.points;
        }
    }

    scores
}
