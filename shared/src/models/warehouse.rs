//! Warehouse model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical warehouse holding stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warehouse {
    pub id: Uuid,
    pub address: String,
}

impl Warehouse {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
        }
    }
}
