use serde::{Deserialize, Serialize};

use crate::domain::catalog::{BenefitId, FeatureId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(pub String);

/// A submitted answer: the question and the option the customer picked.
///
/// `option_key` is the option's stable key within its question; feature mappings are keyed
/// on it rather than on the option id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub option_id: OptionId,
    pub option_key: String,
}

impl Answer {
    pub fn new(
        question_id: impl Into<String>,
        option_id: impl Into<String>,
        option_key: impl Into<String>,
    ) -> Self {
        Self {
            question_id: QuestionId(question_id.into()),
            option_id: OptionId(option_id.into()),
            option_key: option_key.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureMapping {
    pub question_id: QuestionId,
    pub option_key: String,
    pub feature_id: FeatureId,
    /// In -2..=2; negative weights express aversion.
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerBenefitMapping {
    pub option_id: OptionId,
    pub benefit_id: BenefitId,
    /// `None` when the benefit catalog row is missing.
    pub benefit_code: Option<String>,
    /// In 0..=3.
    pub points: f64,
}
