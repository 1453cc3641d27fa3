// src/strategies/traits.rs
use crate::types::{BookTicker, SymbolLimits};
use crate::utils::precision::SkipReason;
use rand::RngCore;
use rust_decimal::Decimal;

/// Market inputs for one trade decision.
#[derive(Debug, Clone)]
pub struct MarketContext<'a> {
    pub limits: &'a SymbolLimits,
    pub book: &'a BookTicker,
    /// Available quote balance; the smaller of both legs in hedge mode.
    pub balance: Decimal,
}

/// A priced and sized pair, ready to be sent as one BUY and one SELL.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub symbol: String,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl TradePlan {
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

pub trait TradeSelector: Send + Sync {
    fn name(&self) -> &str;

    fn select(&self, ctx: &MarketContext<'_>, rng: &mut dyn RngCore) -> Result<TradePlan, SkipReason>;
}
