//! WebAssembly module for the Warehouse Sales UI
//!
//! Lets the purchase modal preview prices with the same calculator the
//! server charges with. Money crosses the boundary as decimal strings so no
//! precision is lost to JavaScript numbers.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::pricing;
pub use shared::validation::*;

/// One line of a client-side price preview
#[derive(Debug, Deserialize)]
struct PreviewLine {
    price: Decimal,
    #[serde(default)]
    discount: Decimal,
    quantity: i32,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn preview_total(lines_json: &str) -> Result<Decimal, String> {
    let lines: Vec<PreviewLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid lines JSON: {}", e))?;

    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        validate_purchase_quantity(line.quantity)?;
        validate_discount(line.discount)?;
        Ok(total + pricing::line_total(line.price, line.discount, line.quantity))
    })
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

/// Unit price after discount, as a decimal string
#[wasm_bindgen]
pub fn effective_unit_price(price: &str, discount: &str) -> Result<String, JsValue> {
    let price = parse_decimal("price", price).map_err(|e| JsValue::from_str(&e))?;
    let discount = parse_decimal("discount", discount).map_err(|e| JsValue::from_str(&e))?;
    Ok(pricing::effective_unit_price(price, discount).normalize().to_string())
}

/// Discounted total for `quantity` units, as a decimal string
#[wasm_bindgen]
pub fn line_total(price: &str, discount: &str, quantity: i32) -> Result<String, JsValue> {
    let price = parse_decimal("price", price).map_err(|e| JsValue::from_str(&e))?;
    let discount = parse_decimal("discount", discount).map_err(|e| JsValue::from_str(&e))?;
    Ok(pricing::line_total(price, discount, quantity).normalize().to_string())
}

/// Total of `[{price, discount, quantity}]`, as a decimal string
#[wasm_bindgen]
pub fn quote_total(lines_json: &str) -> Result<String, JsValue> {
    preview_total(lines_json)
        .map(|total| total.normalize().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Discount must be a percentage between 0 and 100
#[wasm_bindgen]
pub fn is_valid_discount(discount: &str) -> bool {
    parse_decimal("discount", discount)
        .map(|d| validate_discount(d).is_ok())
        .unwrap_or(false)
}

/// Purchase quantities must be positive
#[wasm_bindgen]
pub fn is_valid_purchase_quantity(quantity: i32) -> bool {
    validate_purchase_quantity(quantity).is_ok()
}
