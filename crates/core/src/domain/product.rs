use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{BenefitId, FeatureId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Brand-less products share a single bucket when brand diversity is counted.
    pub brand: Option<String>,
    pub product_type: String,
    pub base_price: Decimal,
    pub active: bool,
}

/// Strength (0..=2) with which a product exhibits a catalog feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductFeature {
    pub product_id: ProductId,
    pub feature_id: FeatureId,
    pub strength: f64,
}

/// Strength (0..=3) with which a product delivers a benefit.
///
/// `benefit_code` is resolved at load time and stays `None` when the benefit row is missing,
/// in which case the association never contributes to any score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductBenefit {
    pub product_id: ProductId,
    pub benefit_id: BenefitId,
    pub benefit_code: Option<String>,
    pub strength: f64,
}

/// An active product together with every association the scorer needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateProduct {
    pub product: Product,
    pub features: Vec<ProductFeature>,
    pub benefits: Vec<ProductBenefit>,
}

impl CandidateProduct {
    pub fn new(product: Product) -> Self {
        Self { product, features: Vec::new(), benefits: Vec::new() }
    }

    pub fn with_feature(mut self, feature_id: impl Into<String>, strength: f64) -> Self {
        self.features.push(ProductFeature {
            product_id: self.product.id.clone(),
            feature_id: FeatureId(feature_id.into()),
            strength,
        });
        self
    }

    pub fn with_benefit(
        mut self,
        benefit_id: impl Into<String>,
        benefit_code: Option<&str>,
        strength: f64,
    ) -> Self {
        self.benefits.push(ProductBenefit {
            product_id: self.product.id.clone(),
            benefit_id: BenefitId(benefit_id.into()),
            benefit_code: benefit_code.map(str::to_owned),
            strength,
        });
        self
    }
}
