//! Money conversion helpers
//!
//! AMLSim writes balances and amounts as decimal major units. Inside the
//! graph everything is i64 minor units (cents) so that transfers conserve
//! value exactly.

/// Minor units per major unit
pub const MINOR_UNITS: i64 = 100;

/// Convert a decimal major-unit value to i64 cents
///
/// Rounds half away from zero. Returns `None` for NaN, infinities and
/// values outside the i64 range.
///
/// # Example
/// ```
/// use aml_graph_core_rs::models::money::to_minor_units;
///
/// assert_eq!(to_minor_units(749.62), Some(74_962));
/// assert_eq!(to_minor_units(f64::NAN), None);
/// ```
pub fn to_minor_units(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * MINOR_UNITS as f64).round();
    if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Convert cents back to a major-unit float (for display only)
///
/// Takes i128 so that sums of many i64 balances can be reported.
pub fn to_major_units(cents: i128) -> f64 {
    cents as f64 / MINOR_UNITS as f64
}
