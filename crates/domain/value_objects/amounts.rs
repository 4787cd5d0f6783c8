use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Minor units per major unit (kobo per naira).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

const MAX_DECIMAL_PLACES: u32 = 2;

pub fn min_amount_major() -> Decimal {
    Decimal::new(100, 2)
}

pub fn max_amount_major() -> Decimal {
    Decimal::new(100_000_000, 2)
}

/// Converts a caller-supplied major-unit amount (`"1000.00"` or `1000`) to minor units.
pub fn major_to_minor(raw: &serde_json::Value) -> Result<i64, String> {
    let text = match raw {
        serde_json::Value::String(text) => text.trim().to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        _ => return Err("A valid number is required.".to_string()),
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "A valid number is required.".to_string())?
        .normalize();

    if amount.scale() > MAX_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {MAX_DECIMAL_PLACES} decimal places."
        ));
    }
    if amount < min_amount_major() {
        return Err(format!(
            "Ensure this value is greater than or equal to {}.",
            min_amount_major()
        ));
    }
    if amount > max_amount_major() {
        return Err(format!("Amount cannot exceed {}.", max_amount_major()));
    }

    (amount * Decimal::from(MINOR_UNITS_PER_MAJOR))
        .trunc()
        .to_i64()
        .ok_or_else(|| "A valid number is required.".to_string())
}

/// Formats minor units as a two-decimal major-unit string.
pub fn format_minor(amount_minor: i64) -> String {
    Decimal::new(amount_minor, 2).to_string()
}
