use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

/// Store-level price override and stock for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub price_override: Option<Decimal>,
    pub is_available: bool,
    pub quantity: i64,
}

impl StoreProduct {
    pub fn in_stock(&self) -> bool {
        self.is_available && self.quantity > 0
    }

    pub fn effective_price(&self, base_price: Decimal) -> Decimal {
        self.price_override.unwrap_or(base_price)
    }
}
