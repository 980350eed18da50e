//! Price arithmetic using rust_decimal.
//!
//! Prices travel as decimal strings on the wire. They are parsed into `Decimal`
//! for every calculation and rounded to cents only at the end.

use rust_decimal::prelude::*;
use tracing::warn;

use crate::model::CartOrderItem;

const DECIMAL_PLACES: u32 = 2;

/// Parse a wire price such as `"9.99"` or `" 12 "`.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// `price * quantity`, unrounded. Unparseable prices count as zero.
pub fn line_total(price: &str, quantity: u32) -> Decimal {
    match parse_price(price) {
        Some(p) => p * Decimal::from(quantity),
        None => {
            warn!(price, "unparseable price; counting as zero");
            Decimal::ZERO
        }
    }
}

/// Sum of `price * quantity` over all items, rounded to two decimals.
pub fn cart_total(items: &[CartOrderItem]) -> Decimal {
    let sum: Decimal = items
        .iter()
        .map(|item| line_total(&item.price, item.quantity))
        .sum();
    round(sum)
}

pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount with exactly two decimals.
pub fn format(value: Decimal) -> String {
    format!("{:.2}", round(value))
}
