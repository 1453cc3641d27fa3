// src/utils/precision.rs
use crate::types::{BookTicker, SymbolLimits};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Prices closer than this are treated as equal.
pub const PRICE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 13);

/// Why a candidate order was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BelowMinNotional,
    BelowMinQuantity,
    /// The quantized price sits on the bid or the ask, so the pair would not self-match.
    DegenerateSpread,
    LowBalance,
    UnknownSymbol,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::BelowMinNotional => "notional below exchange minimum",
            SkipReason::BelowMinQuantity => "quantity below exchange minimum",
            SkipReason::DegenerateSpread => "no spread left after quantization",
            SkipReason::LowBalance => "available balance too low",
            SkipReason::UnknownSymbol => "symbol has no limits",
        };
        f.write_str(text)
    }
}

/// Rounds the price DOWN to a multiple of `tick_size`, then to `precision` decimals.
/// Example: price=100.05, tick=0.1 -> 100.0
pub fn quantize_price(raw_price: Decimal, tick_size: Decimal, precision: u32) -> Decimal {
    floor_to_step(raw_price, tick_size).round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Rounds the quantity DOWN to a multiple of `step_size`, then to `precision` decimals,
/// then caps it at `max_qty` (zero means uncapped). Never raised to `min_qty`.
pub fn quantize_quantity(
    raw_qty: Decimal,
    step_size: Decimal,
    precision: u32,
    _min_qty: Decimal,
    max_qty: Decimal,
) -> Decimal {
    let qty = floor_to_step(raw_qty, step_size)
        .round_dp_with_strategy(precision, RoundingStrategy::ToZero);
    if max_qty.is_zero() {
        qty
    } else {
        qty.min(max_qty)
    }
}

fn floor_to_step(amount: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return amount;
    }
    (amount / step).floor() * step
}

/// Decides whether a quantized (price, quantity) pair may be sent against the current book.
pub fn admit_order(
    price: Decimal,
    quantity: Decimal,
    book: &BookTicker,
    limits: &SymbolLimits,
    min_notional: Decimal,
) -> Result<(), SkipReason> {
    let floor = limits
        .min_notional
        .map_or(min_notional, |exchange_min| exchange_min.max(min_notional));
    if quantity * price < floor {
        return Err(SkipReason::BelowMinNotional);
    }
    if quantity < limits.min_qty || quantity.is_zero() {
        return Err(SkipReason::BelowMinQuantity);
    }
    if (price - book.bid).abs() <= PRICE_EPSILON || (book.ask - price).abs() <= PRICE_EPSILON {
        return Err(SkipReason::DegenerateSpread);
    }
    Ok(())
}
