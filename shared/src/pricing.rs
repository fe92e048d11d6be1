//! Pricing calculator
//!
//! Pure functions turning a unit price, a percentage discount and a quantity
//! into money amounts. Discount range is not checked here; see
//! [`crate::validation::validate_discount`].

use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Unit price after applying `discount_percent`
///
/// `unit_price * (1 - discount_percent / 100)`
pub fn effective_unit_price(unit_price: Decimal, discount_percent: Decimal) -> Decimal {
    unit_price * (Decimal::ONE - discount_percent / HUNDRED)
}

/// Total for `quantity` units at the discounted price
pub fn line_total(unit_price: Decimal, discount_percent: Decimal, quantity: i32) -> Decimal {
    effective_unit_price(unit_price, discount_percent) * Decimal::from(quantity)
}
