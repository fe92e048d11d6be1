//! Product catalog model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product that can be stocked in any number of warehouses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form attributes (color, size, ...)
    #[serde(default = "empty_characteristics")]
    pub characteristics: serde_json::Value,
    /// Weight in kilograms
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    pub barcode: String,
}

fn empty_characteristics() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            characteristics: empty_characteristics(),
            weight: Decimal::ZERO,
            barcode: String::new(),
        }
    }
}
