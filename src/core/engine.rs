// src/core/engine.rs
use crate::config::{CostConfig, TradingConfig};
use crate::connectors::error::{GatewayError, GatewayResult};
use crate::connectors::traits::ExchangeGateway;
use crate::core::cost::{daily_cost, CostScope};
use crate::core::reconciler::{flatten_all, reconcile, Action, ReconcilePolicy};
use crate::strategies::traits::{MarketContext, TradePlan, TradeSelector};
use crate::types::{OrderSpec, Side, SymbolLimits};
use crate::utils::precision::SkipReason;
use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{error, info, warn};

/// One account taking part in a loop.
pub struct Leg<G> {
    pub name: String,
    pub gateway: G,
    /// Daily spend cap in quote currency.
    pub budget: Decimal,
}

/// What a single iteration ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    BudgetExhausted { account: String, cost: Decimal },
    StaleOrdersCleared(usize),
    AwaitingFills(usize),
    Skipped(SkipReason),
    DryRun(TradePlan),
    Placed(TradePlan),
}

/// Budget gate, reconciliation and self-matched placement for one account, or for a
/// hedge pair where `buyer` takes the BUY side and `seller` the SELL side.
pub struct TradingLoop<G, S, R> {
    buyer: Leg<G>,
    seller: Option<Leg<G>>,
    strategy: S,
    rng: R,
    trading: TradingConfig,
    cost: CostConfig,
    scope: CostScope,
    limits: HashMap<String, SymbolLimits>,
    /// Configured symbols that have limits; duplicates weight the random pick.
    universe: Vec<String>,
}

impl<G, S, R> TradingLoop<G, S, R>
where
    G: ExchangeGateway,
    S: TradeSelector,
    R: RngCore + Send + Sync,
{
    pub fn new(
        buyer: Leg<G>,
        seller: Option<Leg<G>>,
        strategy: S,
        rng: R,
        trading: TradingConfig,
        cost: CostConfig,
    ) -> Self {
        let scope = CostScope::new(&cost, &trading.symbols, &trading.quote_asset);
        Self {
            buyer,
            seller,
            strategy,
            rng,
            trading,
            cost,
            scope,
            limits: HashMap::new(),
            universe: Vec::new(),
        }
    }

    fn legs(&self) -> Vec<&Leg<G>> {
        std::iter::once(&self.buyer).chain(self.seller.as_ref()).collect()
    }

    /// Reads exchange metadata once; symbols the exchange does not list are dropped.
    pub async fn load_limits(&mut self) -> Result<()> {
        let metadata = self
            .buyer
            .gateway
            .symbol_metadata()
            .await
            .context("failed to load exchange info")?;

        let mut limits = HashMap::new();
        let mut universe = Vec::new();
        for symbol in &self.trading.symbols {
            match metadata.get(symbol) {
                Some(l) => {
                    limits.insert(symbol.clone(), l.clone());
                    universe.push(symbol.clone());
                }
                None => error!("symbol {} missing from exchange info, dropping it", symbol),
            }
        }
        if universe.is_empty() {
            bail!("none of the configured symbols is listed by the exchange");
        }

        info!("symbol_limits: {:?}", limits);
        self.limits = limits;
        self.universe = universe;
        Ok(())
    }

    /// Never returns once limits are loaded.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Loop starting: accounts={:?} strategy={} hedge={} dry_run={}",
            self.legs().iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            self.strategy.name(),
            self.seller.is_some(),
            self.trading.dry_run
        );
        self.load_limits().await?;

        loop {
            let pause = self.run_once().await;
            info!("sleep_time: {}s", pause.as_secs());
            tokio::time::sleep(pause).await;
        }
    }

    /// One iteration including error handling; returns how long to sleep afterwards.
    pub async fn run_once(&mut self) -> Duration {
        match self.step().await {
            Ok(outcome) => self.log_outcome(&outcome),
            Err(e) => {
                error!(
                    status = ?e.status(),
                    code = ?e.code(),
                    rate_limited = e.is_rate_limited(),
                    "Found error. {}",
                    e
                );
                self.flatten_after_error().await;
            }
        }
        self.next_pause()
    }

    pub async fn step(&mut self) -> GatewayResult<StepOutcome> {
        if let Some(outcome) = self.check_budget().await? {
            return Ok(outcome);
        }

        let policy = ReconcilePolicy {
            order_timeout_ms: self.trading.order_timeout_ms,
            position_stale_ms: self.trading.position_stale_ms,
            noise_floor: self.trading.noise_floor,
        };
        let now_ms = Utc::now().timestamp_millis();
        let mut stale = 0;
        let mut fresh = 0;
        let mut balance: Option<Decimal> = None;

        for leg in self.legs() {
            let orders = leg.gateway.open_orders().await?;
            let snapshot = leg.gateway.account_snapshot().await?;
            let outcome = reconcile(&orders, &snapshot.positions, &policy, now_ms);
            if !outcome.is_noop() {
                self.apply(leg, &outcome.actions).await?;
            }

            stale += outcome.stale_orders;
            fresh += outcome.fresh_orders;
            let available = snapshot.available(&self.trading.quote_asset);
            balance = Some(balance.map_or(available, |b| b.min(available)));
        }

        if stale > 0 {
            return Ok(StepOutcome::StaleOrdersCleared(stale));
        }
        if fresh > 0 && self.trading.skip_while_orders_open {
            return Ok(StepOutcome::AwaitingFills(fresh));
        }

        let Some(symbol) = self.universe.choose(&mut self.rng).cloned() else {
            return Ok(StepOutcome::Skipped(SkipReason::UnknownSymbol));
        };
        let Some(limits) = self.limits.get(&symbol) else {
            return Ok(StepOutcome::Skipped(SkipReason::UnknownSymbol));
        };
        let book = self.buyer.gateway.best_bid_ask(&symbol).await?;
        info!("book_ticker: {} bid={} ask={}", symbol, book.bid, book.ask);

        let ctx = MarketContext {
            limits,
            book: &book,
            balance: balance.unwrap_or(Decimal::ZERO),
        };
        let plan = match self.strategy.select(&ctx, &mut self.rng) {
            Ok(plan) => plan,
            Err(reason) => return Ok(StepOutcome::Skipped(reason)),
        };

        if self.trading.dry_run {
            return Ok(StepOutcome::DryRun(plan));
        }
        self.place(&plan).await?;
        Ok(StepOutcome::Placed(plan))
    }

    /// `Some` when a leg has spent its allowance; open orders are withdrawn and
    /// positions flattened on every leg.
    async fn check_budget(&self) -> GatewayResult<Option<StepOutcome>> {
        let now = Local::now();
        for leg in self.legs() {
            let state = daily_cost(&leg.gateway, &self.cost, &self.scope, leg.budget, now).await?;
            info!("{} cost: {} budget: {}", leg.name, state.cost, state.budget);
            if !state.exhausted {
                continue;
            }

            info!(
                "{} reached its daily budget, flattening and skipping trades",
                leg.name
            );
            for leg in self.legs() {
                self.withdraw_orders(leg).await?;
                self.flatten_leg(leg).await?;
            }
            return Ok(Some(StepOutcome::BudgetExhausted {
                account: leg.name.clone(),
                cost: state.cost,
            }));
        }
        Ok(None)
    }

    async fn apply(&self, leg: &Leg<G>, actions: &[Action]) -> GatewayResult<()> {
        for action in actions {
            match action {
                Action::CancelStale(order) => {
                    info!(
                        "{} order {} {} ({}) {:?} {}@{} stale since {}, cancelling",
                        leg.name,
                        order.symbol,
                        order.order_id,
                        order.client_order_id,
                        order.side,
                        order.remaining(),
                        order.price,
                        order.update_time
                    );
                    leg.gateway.cancel_order(&order.symbol, order.order_id).await?;
                }
                Action::Flatten(order) => {
                    let response = leg.gateway.place_order(order).await?;
                    info!("{} position flattened: {:?}", leg.name, response);
                }
            }
        }
        Ok(())
    }

    async fn withdraw_orders(&self, leg: &Leg<G>) -> GatewayResult<()> {
        let symbols: HashSet<String> = leg
            .gateway
            .open_orders()
            .await?
            .into_iter()
            .map(|o| o.symbol)
            .collect();
        for symbol in symbols {
            leg.gateway.cancel_all_open_orders(&symbol).await?;
            info!("{} open orders on {} cancelled", leg.name, symbol);
        }
        Ok(())
    }

    async fn flatten_leg(&self, leg: &Leg<G>) -> GatewayResult<usize> {
        let snapshot = leg.gateway.account_snapshot().await?;
        let orders = flatten_all(&snapshot.positions, self.trading.noise_floor);
        for order in &orders {
            let response = leg.gateway.place_order(order).await?;
            info!("{} position closed: {:?}", leg.name, response);
        }
        Ok(orders.len())
    }

    /// Best effort after a failed iteration: every leg withdraws its resting orders
    /// and is flattened independently.
    async fn flatten_after_error(&self) {
        for leg in self.legs() {
            if let Err(e) = self.withdraw_orders(leg).await {
                warn!("{} withdrawing orders after error failed: {}", leg.name, e);
            }
            if let Err(e) = self.flatten_leg(leg).await {
                warn!("{} flatten after error failed: {}", leg.name, e);
            }
        }
    }

    async fn place(&self, plan: &TradePlan) -> GatewayResult<()> {
        let buy = OrderSpec::limit(&plan.symbol, Side::Buy, plan.quantity, plan.price);
        let sell = OrderSpec::limit(&plan.symbol, Side::Sell, plan.quantity, plan.price);

        match &self.seller {
            Some(seller) => {
                let response = self.buyer.gateway.place_order(&buy).await?;
                info!("{} new order response: {:?}", self.buyer.name, response);
                let response = seller.gateway.place_order(&sell).await?;
                info!("{} new order response: {:?}", seller.name, response);
            }
            None if self.trading.batch_orders => {
                let results = self.buyer.gateway.place_batch_orders(&[buy, sell]).await?;
                let mut first_error: Option<GatewayError> = None;
                for result in results {
                    match result {
                        Ok(response) => info!("{} new order response: {:?}", self.buyer.name, response),
                        Err(e) => {
                            error!("{} batch entry rejected: {}", self.buyer.name, e);
                            first_error.get_or_insert(e);
                        }
                    }
                }
                if let Some(e) = first_error {
                    return Err(e);
                }
            }
            None => {
                for order in [&buy, &sell] {
                    let response = self.buyer.gateway.place_order(order).await?;
                    info!("{} new order response: {:?}", self.buyer.name, response);
                }
            }
        }
        Ok(())
    }

    fn log_outcome(&self, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::BudgetExhausted { account, cost } => {
                info!("{} over budget (cost {}), not trading", account, cost)
            }
            StepOutcome::StaleOrdersCleared(n) => info!("{} stale orders handled, waiting", n),
            StepOutcome::AwaitingFills(n) => info!("{} orders still resting, waiting", n),
            StepOutcome::Skipped(reason) => info!("no trade this round: {}", reason),
            StepOutcome::DryRun(plan) => info!(
                "[dry run] would place BUY+SELL {} {} @ {} (notional {})",
                plan.symbol,
                plan.quantity,
                plan.price,
                plan.notional()
            ),
            StepOutcome::Placed(plan) => info!(
                "symbol: {} quantity: {} price: {}",
                plan.symbol, plan.quantity, plan.price
            ),
        }
    }

    fn next_pause(&mut self) -> Duration {
        let range = self.trading.sleep_secs;
        Duration::from_secs(self.rng.gen_range(range.min..=range.max))
    }
}
