use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenefitId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Catalog attribute a product can exhibit, e.g. an anti-reflective coating. Global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub code: String,
    pub name: String,
}

/// Customer-facing value proposition, owned by one organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: BenefitId,
    pub organization_id: OrganizationId,
    pub code: String,
    pub name: String,
}

/// Satisfying `feature_id` also contributes toward the mapped benefit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureBenefitMapping {
    pub feature_id: FeatureId,
    pub benefit_id: BenefitId,
    /// `None` when the benefit catalog row is missing.
    pub benefit_code: Option<String>,
    pub weight: f64,
}
