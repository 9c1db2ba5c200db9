//! Tick-size pricing helpers.
//!
//! NSE equities trade in 0.05 ticks. Every price the engine sends to a
//! broker goes through [`round_to_tick`] first.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Exchange tick size.
pub const TICK_SIZE: Decimal = dec!(0.05);

/// Round a price to two decimals, then up to the next valid tick.
#[must_use]
pub fn round_to_tick(value: Decimal) -> Decimal {
    let cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    ((cents / TICK_SIZE).ceil() * TICK_SIZE).normalize()
}

/// Price-scaled buffer used to push an entry limit past the trigger.
#[must_use]
pub fn price_delta(price: Decimal) -> Decimal {
    if price <= dec!(250) {
        dec!(0.05)
    } else if price <= dec!(500) {
        dec!(0.10)
    } else if price <= dec!(1000) {
        dec!(0.15)
    } else if price <= dec!(2000) {
        dec!(0.20)
    } else if price <= dec!(3000) {
        dec!(0.25)
    } else if price <= dec!(4000) {
        dec!(0.30)
    } else if price <= dec!(5000) {
        dec!(0.40)
    } else {
        dec!(0.50)
    }
}

/// Limit offset between a stop-loss trigger and its limit price.
///
/// One tick for every 500 rupees of stop price, plus one.
#[must_use]
pub fn stop_loss_offset(stop_loss: Decimal) -> Decimal {
    let slabs = (stop_loss.trunc() / dec!(500)).trunc();
    (slabs + Decimal::ONE) * TICK_SIZE
}
