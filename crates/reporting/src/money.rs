//! Decimal money helpers
//!
//! Sums stay exact `Decimal`s all the way through aggregation. Rounding to
//! two fractional digits only happens here, at the output boundary.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits used for every displayed amount and percentage
pub const DISPLAY_SCALE: u32 = 2;

/// Round half away from zero to the display scale
pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounded value as a float, for JSON and charts.
///
/// A single correctly-rounded division, so `100.46` comes out as the float
/// nearest to 100.46.
pub fn to_display_f64(value: Decimal) -> f64 {
    let rounded = round_for_display(value);
    rounded.mantissa() as f64 / 10f64.powi(rounded.scale() as i32)
}

/// Exact sum of `amounts`, `None` when it exceeds the decimal range
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// `numerator / denominator * 100`, or zero when the denominator is zero
pub fn ratio_percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Percentage change from `previous` to `current`, rounded to the display scale.
/// A zero `previous` yields zero.
pub fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    round_for_display(ratio_percent(current - previous, previous))
}

/// Serde adapter: serializes a rounded float, deserializes from a JSON number
pub mod rounded {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(super::to_display_f64(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Decimal::try_from(raw).map_err(serde::de::Error::custom)
    }
}
