pub mod config;
pub mod domain;
pub mod errors;
pub mod recommend;

pub use domain::catalog::{Benefit, BenefitId, Feature, FeatureBenefitMapping, FeatureId};
pub use domain::product::{CandidateProduct, Product, ProductId};
pub use domain::questionnaire::{Answer, OptionId, QuestionId, SessionId};
pub use domain::store::{StoreId, StoreProduct};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use recommend::{
    ProductCategory, RankedRecommendation, RecommendationEngine, RecommendationRequest,
    RecommendationRun, RecommendationService, RecommendationSource, ScoredCandidate, SourceError,
};
