use std::f64;

use super::error::Error;

/// Tolerance applied to every distance comparison made during relaxation.
pub const RELAXATION_EPS: f64 = 1e-6;

/// Number of significant digits kept when a quoted price is inverted.
pub const PRICE_PRECISION: u32 = 10;

/// Accepts `price` only if it is finite and strictly positive.
pub fn validate_price(price: f64) -> Result<f64, Error> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(Error::InvalidPrice(price))
    }
}

/// Maps a conversion price onto the additive weight used by the cycle search.
///
/// A cycle whose prices multiply to more than 1.0 has a negative weight sum:
/// ```text
/// prices [1.521, 0.741, 0.888] → ∏ = 1.0008
/// weights sum = -ln(1.0008) ≈ -0.0008
/// ```
pub fn price_to_weight(price: f64) -> Result<f64, Error> {
    let price = validate_price(price)?;
    let weight = -price.ln();

    // ln of a finite positive f64 is always finite, subnormals included.
    debug_assert!(weight.is_finite());
    Ok(weight)
}

/// Inverts an ask quote into the price of the opposite conversion, rounded
/// half-up to [`PRICE_PRECISION`] significant digits.
pub fn invert_price(price: f64) -> Result<f64, Error> {
    let price = validate_price(price)?;
    validate_price(round_significant(1.0 / price, PRICE_PRECISION))
}

fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(digits as i32 - 1 - magnitude);
    if !scale.is_finite() || scale == 0.0 {
        return value;
    }

    // f64::round rounds half away from zero.
    (value * scale).round() / scale
}

/// The epsilon gate: true when `candidate` beats `current` by at least `eps`.
///
/// Improvements smaller than `eps` are treated as floating-point noise and
/// ignored, which keeps the relaxation loop from churning on them.
pub fn improves(candidate: f64, current: f64, eps: f64) -> bool {
    // inf - inf is NaN, so an unreached candidate never improves anything.
    current - candidate >= eps
}
