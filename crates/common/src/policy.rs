//! Marketplace pricing policy constants.
//!
//! The delivery fee is a flat threshold charge, not derived from distance
//! or an item's delivery radius.

use crate::Money;

/// Flat delivery charge applied to any non-empty order.
pub const DELIVERY_FEE_CENTS: i64 = 500;

/// Cart discount rate in whole percent, applied to the subtotal.
pub const DISCOUNT_RATE_PERCENT: u32 = 5;

/// Returns the delivery charge for the given subtotal.
pub fn delivery_fee(subtotal: Money) -> Money {
    if subtotal.is_positive() {
        Money::from_cents(DELIVERY_FEE_CENTS)
    } else {
        Money::zero()
    }
}
