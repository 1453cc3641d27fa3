use crate::config::{NotionalTarget, RangeConfig};
use crate::strategies::traits::{MarketContext, TradePlan, TradeSelector};
use crate::utils::precision::{admit_order, quantize_price, quantize_quantity, SkipReason};
use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use tracing::debug;

/// Prices both legs at the quantized mid so the BUY and the SELL meet each other.
pub struct SelfMatchSelector {
    notional: NotionalTarget,
    jitter_steps: RangeConfig,
    min_notional: Decimal,
    min_balance: Decimal,
}

impl SelfMatchSelector {
    /// # Arguments
    /// * `notional` - Target pair size in quote currency.
    /// * `jitter_steps` - Range of extra `min_qty` steps added to each pair so sizes vary.
    /// * `min_notional` - Floor below which the exchange rejects an order.
    /// * `min_balance` - Available balance under which no trade is attempted.
    pub fn new(
        notional: NotionalTarget,
        jitter_steps: RangeConfig,
        min_notional: Decimal,
        min_balance: Decimal,
    ) -> Self {
        Self {
            notional,
            jitter_steps,
            min_notional,
            min_balance,
        }
    }
}

impl TradeSelector for SelfMatchSelector {
    fn name(&self) -> &str {
        "self_match"
    }

    fn select(&self, ctx: &MarketContext<'_>, rng: &mut dyn RngCore) -> Result<TradePlan, SkipReason> {
        if ctx.balance < self.min_balance {
            return Err(SkipReason::LowBalance);
        }

        let limits = ctx.limits;
        let mid = ctx.book.mid();
        if mid <= Decimal::ZERO {
            return Err(SkipReason::DegenerateSpread);
        }

        let target = self.notional.resolve(ctx.balance);
        let times = rng.gen_range(self.jitter_steps.min..=self.jitter_steps.max);
        let raw_qty = target / mid + Decimal::from(times) * limits.min_qty;

        let price = quantize_price(mid, limits.tick_size, limits.price_precision);
        let quantity = quantize_quantity(
            raw_qty,
            limits.step_size,
            limits.qty_precision,
            limits.min_qty,
            limits.max_qty,
        );
        debug!(
            symbol = %limits.symbol,
            %target, %mid, times, %price, %quantity,
            "sized candidate pair"
        );

        admit_order(price, quantity, ctx.book, limits, self.min_notional)?;

        Ok(TradePlan {
            symbol: limits.symbol.clone(),
            price,
            quantity,
        })
    }
}
