//! Purchase planning
//!
//! Validates a purchase request against a stock snapshot and prices every
//! line. Both the committing purchase and the dry-run quote go through
//! [`plan_purchase`], so a quote always matches what the purchase would charge
//! against the same stock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InventoryRecord, PurchaseRequest};
use crate::pricing;

/// Deterministic reasons a purchase request is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseRejection {
    #[error("product {product_id} is not stocked in warehouse {warehouse_id}")]
    ProductNotFoundInWarehouse { warehouse_id: Uuid, product_id: Uuid },

    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("invalid quantity {quantity} for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },
}

/// A validated and priced purchase line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub price_with_discount: Decimal,
    pub line_total: Decimal,
    /// Stock left after this line is applied
    pub remaining: i32,
}

/// Result of planning a whole request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePlan {
    pub warehouse_id: Uuid,
    pub lines: Vec<PlannedLine>,
    pub total_sum: Decimal,
}

impl PurchasePlan {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }
}

/// Validate and price `request` against `stock`, keyed by product id
///
/// Lines are checked in request order against a running balance, so a product
/// listed twice is checked the second time against what the first line left.
/// The first failing line rejects the whole request. Prices always come from
/// the snapshot, i.e. the pre-decrement record.
pub fn plan_purchase(
    request: &PurchaseRequest,
    stock: &HashMap<Uuid, InventoryRecord>,
) -> Result<PurchasePlan, PurchaseRejection> {
    let mut remaining: HashMap<Uuid, i32> = HashMap::with_capacity(stock.len());
    let mut lines = Vec::with_capacity(request.products.len());
    let mut total_sum = Decimal::ZERO;

    for line in &request.products {
        if line.quantity <= 0 {
            return Err(PurchaseRejection::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        let record = stock.get(&line.product_id).ok_or(
            PurchaseRejection::ProductNotFoundInWarehouse {
                warehouse_id: request.warehouse_id,
                product_id: line.product_id,
            },
        )?;

        let available = remaining
            .entry(line.product_id)
            .or_insert(record.quantity);

        if *available < line.quantity {
            return Err(PurchaseRejection::InsufficientStock {
                product_id: line.product_id,
                available: *available,
                requested: line.quantity,
            });
        }
        *available -= line.quantity;

        let line_total = pricing::line_total(record.price, record.discount, line.quantity);
        total_sum += line_total;

        lines.push(PlannedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: record.price,
            discount: record.discount,
            price_with_discount: record.price_with_discount(),
            line_total,
            remaining: *available,
        });
    }

    Ok(PurchasePlan {
        warehouse_id: request.warehouse_id,
        lines,
        total_sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurchaseLine;
    use rust_decimal_macros::dec;

    fn record(warehouse_id: Uuid, quantity: i32, price: Decimal, discount: Decimal) -> InventoryRecord {
        InventoryRecord {
            warehouse_id,
            product_id: Uuid::new_v4(),
            quantity,
            price,
            discount,
        }
    }

    fn snapshot(records: &[InventoryRecord]) -> HashMap<Uuid, InventoryRecord> {
        records.iter().map(|r| (r.product_id, r.clone())).collect()
    }

    fn request(warehouse_id: Uuid, lines: &[(Uuid, i32)]) -> PurchaseRequest {
        PurchaseRequest {
            warehouse_id,
            products: lines
                .iter()
                .map(|&(product_id, quantity)| PurchaseLine { product_id, quantity })
                .collect(),
        }
    }

    #[test]
    fn test_plan_prices_every_line() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 10, dec!(100), dec!(10));
        let b = record(warehouse, 4, dec!(25.50), Decimal::ZERO);
        let stock = snapshot(&[a.clone(), b.clone()]);

        let plan = plan_purchase(&request(warehouse, &[(a.product_id, 3), (b.product_id, 2)]), &stock).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].line_total, dec!(270));
        assert_eq!(plan.lines[0].price_with_discount, dec!(90));
        assert_eq!(plan.lines[0].remaining, 7);
        assert_eq!(plan.lines[1].line_total, dec!(51));
        assert_eq!(plan.total_sum, dec!(321));
        assert_eq!(plan.total_quantity(), 5);
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 5, dec!(1), Decimal::ZERO);
        let plan = plan_purchase(&request(warehouse, &[(a.product_id, 5)]), &snapshot(&[a])).unwrap();
        assert_eq!(plan.lines[0].remaining, 0);
    }

    #[test]
    fn test_oversell_rejected() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 5, dec!(1), Decimal::ZERO);
        let err = plan_purchase(&request(warehouse, &[(a.product_id, 6)]), &snapshot(&[a.clone()])).unwrap_err();
        assert_eq!(
            err,
            PurchaseRejection::InsufficientStock {
                product_id: a.product_id,
                available: 5,
                requested: 6,
            }
        );
    }

    #[test]
    fn test_repeated_product_sees_earlier_lines() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 5, dec!(2), Decimal::ZERO);
        let stock = snapshot(&[a.clone()]);

        let ok = plan_purchase(&request(warehouse, &[(a.product_id, 2), (a.product_id, 3)]), &stock).unwrap();
        assert_eq!(ok.lines[1].remaining, 0);
        assert_eq!(ok.total_sum, dec!(10));

        let err = plan_purchase(&request(warehouse, &[(a.product_id, 3), (a.product_id, 3)]), &stock).unwrap_err();
        assert_eq!(
            err,
            PurchaseRejection::InsufficientStock {
                product_id: a.product_id,
                available: 2,
                requested: 3,
            }
        );
    }

    #[test]
    fn test_unknown_product_rejected() {
        let warehouse = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let err = plan_purchase(&request(warehouse, &[(missing, 1)]), &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            PurchaseRejection::ProductNotFoundInWarehouse {
                warehouse_id: warehouse,
                product_id: missing,
            }
        );
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 5, dec!(1), Decimal::ZERO);
        let stock = snapshot(&[a.clone()]);
        for quantity in [0, -3] {
            let err = plan_purchase(&request(warehouse, &[(a.product_id, quantity)]), &stock).unwrap_err();
            assert!(matches!(err, PurchaseRejection::InvalidQuantity { .. }));
        }
    }

    #[test]
    fn test_first_failing_line_wins() {
        let warehouse = Uuid::new_v4();
        let a = record(warehouse, 1, dec!(1), Decimal::ZERO);
        let missing = Uuid::new_v4();
        let err = plan_purchase(&request(warehouse, &[(a.product_id, 2), (missing, 1)]), &snapshot(&[a])).unwrap_err();
        assert!(matches!(err, PurchaseRejection::InsufficientStock { .. }));
    }

    #[test]
    fn test_empty_request_plans_nothing() {
        let plan = plan_purchase(&request(Uuid::new_v4(), &[]), &HashMap::new()).unwrap();
        assert!(plan.lines.is_empty());
        assert_eq!(plan.total_sum, Decimal::ZERO);
    }
}
