//! Validation rules for stock, catalog and purchase input

use rust_decimal::Decimal;

/// Discount is a percentage in [0, 100]
pub fn validate_discount(discount: Decimal) -> Result<(), &'static str> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err("Discount must be between 0 and 100");
    }
    Ok(())
}

/// Unit prices cannot be negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Stocked quantity cannot be negative
pub fn validate_stock_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Requested purchase quantity must be positive
pub fn validate_purchase_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Product weight in kilograms cannot be negative
pub fn validate_weight(weight: Decimal) -> Result<(), &'static str> {
    if weight < Decimal::ZERO {
        return Err("Weight cannot be negative");
    }
    Ok(())
}
