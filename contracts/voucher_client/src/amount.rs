//! Conversion between human-entered token amounts and ledger base units.
//!
//! Input is parsed strictly: a value with more fractional digits than the
//! token supports is rejected, never rounded.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::InputError;

/// Parse `"12.5"` into base units for a token with `decimals` places.
pub fn parse_amount(input: &str, decimals: u32) -> Result<i128, InputError> {
    let trimmed = input.trim();
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| InputError::MalformedAmount(trimmed.to_string()))?
        .normalize();
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(InputError::NonPositiveAmount);
    }
    if amount.scale() > decimals {
        return Err(InputError::TooManyDecimals { decimals });
    }
    let mut scaled = amount;
    scaled.rescale(decimals);
    if scaled.scale() != decimals {
        // rescale gives up silently when the mantissa would overflow.
        return Err(InputError::MalformedAmount(trimmed.to_string()));
    }
    Ok(scaled.mantissa())
}

/// Render base units with trailing zeros removed, e.g. `1_050_000` at 7
/// decimals is `"0.105"`.
pub fn format_amount(units: i128, decimals: u32) -> String {
    match Decimal::try_from_i128_with_scale(units, decimals) {
        Ok(amount) => amount.normalize().to_string(),
        Err(_) => format!("{units}e-{decimals}"),
    }
}
