//! Cell formatting for report tables

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Cell value for a missing cross-joined value
pub const PLACEHOLDER: &str = "—";

/// Fixed two-decimal rendering, midpoints rounded away from zero
///
/// Zeros are padded in the text rather than through `rescale`, which cannot
/// raise the scale of values whose mantissa is already near 96 bits.
pub fn decimal(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Term rendered with its unit, e.g. `12 months`
pub fn months(period: i32) -> String {
    format!("{} months", period)
}

pub fn date(value: NaiveDate) -> String {
    value.format("%d.%m.%Y").to_string()
}

pub fn placeholder() -> String {
    PLACEHOLDER.to_string()
}
