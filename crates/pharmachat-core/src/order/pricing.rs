//! Display pricing for order totals.
//!
//! The backend reports a pre-tax subtotal; tax and the flat delivery fee are
//! layered on here, at render time only, and never persisted. This is the
//! one place that arithmetic lives.

/// Sales tax applied to the backend subtotal.
pub const TAX_RATE: f64 = 0.05;

/// Flat delivery fee added to every displayed total.
pub const DELIVERY_FEE: f64 = 2.00;

/// Computes the customer-facing total from a backend subtotal, rounded to
/// two decimal places.
pub fn display_total(subtotal: f64) -> f64 {
    round2(subtotal * (1.0 + TAX_RATE) + DELIVERY_FEE)
}

/// Two-digit decimal rounding applied at render time only.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
