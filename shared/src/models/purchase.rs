//! Purchase request and quote models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One requested product in a purchase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A multi-item purchase against one warehouse
///
/// Lines are applied in order. A product listed twice is validated twice,
/// the second time against the stock left by the first line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub warehouse_id: Uuid,
    #[serde(default)]
    pub products: Vec<PurchaseLine>,
}

impl PurchaseRequest {
    /// Distinct product ids, sorted
    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.products.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Priced line of a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub price_with_discount: Decimal,
    pub total_price: Decimal,
}

/// Dry-run pricing of a purchase request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub total_sum: Decimal,
    pub items: Vec<QuoteItem>,
}
