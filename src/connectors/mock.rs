// src/connectors/mock.rs
//! In-memory gateway for tests. Records every mutating call so assertions can
//! check exactly what the loop sent.
use crate::connectors::error::{GatewayError, GatewayResult};
use crate::connectors::traits::ExchangeGateway;
use crate::types::{
    AccountSnapshot, AccountTrade, BookTicker, IncomeQuery, IncomeRecord, OpenOrder, OrderResponse,
    OrderSpec, OrderType, SymbolLimits,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Cancel { symbol: String, order_id: u64 },
    CancelAll { symbol: String },
    Place(OrderSpec),
    Batch(Vec<OrderSpec>),
    Leverage { symbol: String, leverage: u32 },
    MultiAssets(bool),
}

#[derive(Default)]
pub struct MockState {
    pub snapshot: AccountSnapshot,
    pub open_orders: Vec<OpenOrder>,
    pub books: HashMap<String, BookTicker>,
    pub marks: HashMap<String, Decimal>,
    pub limits: HashMap<String, SymbolLimits>,
    pub income: Vec<IncomeRecord>,
    pub income_page_size: usize,
    /// Serve income pages from the oldest record whatever `start_ms` says.
    pub income_ignores_start: bool,
    pub income_queries: Vec<IncomeQuery>,
    pub trades: Vec<AccountTrade>,
    /// Returned (once) by the next `place_order` / `place_batch_orders`.
    pub fail_next_place: Option<(u16, i64, String)>,
    /// Index, code and message of one entry the next batch rejects.
    pub reject_batch_entry: Option<(usize, i64, String)>,
    pub calls: Vec<Call>,
    next_id: u64,
}

#[derive(Default)]
pub struct MockGateway {
    pub state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.with(|s| s.income_page_size = 1000);
        gateway
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn placed_orders(&self) -> Vec<OrderSpec> {
        self.calls()
            .into_iter()
            .flat_map(|c| match c {
                Call::Place(o) => vec![o],
                Call::Batch(os) => os,
                _ => vec![],
            })
            .collect()
    }

    fn take_failure(state: &mut MockState) -> GatewayResult<()> {
        match state.fail_next_place.take() {
            Some((status, code, msg)) => Err(GatewayError::api(status, code, msg)),
            None => Ok(()),
        }
    }

    /// Limit orders rest on the book until cancelled.
    fn accept(state: &mut MockState, order: &OrderSpec) -> OrderResponse {
        state.next_id += 1;
        if order.order_type == OrderType::Limit {
            state.open_orders.push(OpenOrder {
                symbol: order.symbol.clone(),
                order_id: state.next_id,
                client_order_id: order.client_order_id.clone().unwrap_or_default(),
                side: order.side,
                price: order.price.unwrap_or_default(),
                orig_qty: order.quantity,
                executed_qty: Decimal::ZERO,
                update_time: Utc::now().timestamp_millis(),
            });
        }
        OrderResponse {
            id: state.next_id.to_string(),
            symbol: order.symbol.clone(),
            status: "NEW".to_string(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn account_snapshot(&self) -> GatewayResult<AccountSnapshot> {
        Ok(self.with(|s| s.snapshot.clone()))
    }

    async fn open_orders(&self) -> GatewayResult<Vec<OpenOrder>> {
        Ok(self.with(|s| s.open_orders.clone()))
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> GatewayResult<()> {
        self.with(|s| {
            s.open_orders.retain(|o| o.order_id != order_id);
            s.calls.push(Call::Cancel {
                symbol: symbol.to_string(),
                order_id,
            });
        });
        Ok(())
    }

    async fn cancel_all_open_orders(&self, symbol: &str) -> GatewayResult<()> {
        self.with(|s| {
            s.open_orders.retain(|o| o.symbol != symbol);
            s.calls.push(Call::CancelAll {
                symbol: symbol.to_string(),
            });
        });
        Ok(())
    }

    async fn place_order(&self, order: &OrderSpec) -> GatewayResult<OrderResponse> {
        self.with(|s| {
            Self::take_failure(s)?;
            s.calls.push(Call::Place(order.clone()));
            Ok(Self::accept(s, order))
        })
    }

    async fn place_batch_orders(
        &self,
        orders: &[OrderSpec],
    ) -> GatewayResult<Vec<GatewayResult<OrderResponse>>> {
        self.with(|s| {
            Self::take_failure(s)?;
            s.calls.push(Call::Batch(orders.to_vec()));
            let rejected = s.reject_batch_entry.take();
            let results = orders
                .iter()
                .enumerate()
                .map(|(i, o)| match &rejected {
                    Some((index, code, msg)) if *index == i => {
                        Err(GatewayError::api(400, *code, msg.clone()))
                    }
                    _ => Ok(Self::accept(s, o)),
                })
                .collect();
            Ok(results)
        })
    }

    async fn best_bid_ask(&self, symbol: &str) -> GatewayResult<BookTicker> {
        self.with(|s| s.books.get(symbol).cloned())
            .ok_or_else(|| GatewayError::api(400, -1121, "Invalid symbol."))
    }

    async fn mark_prices(&self) -> GatewayResult<HashMap<String, Decimal>> {
        Ok(self.with(|s| s.marks.clone()))
    }

    async fn symbol_metadata(&self) -> GatewayResult<HashMap<String, SymbolLimits>> {
        Ok(self.with(|s| s.limits.clone()))
    }

    async fn income_history(&self, query: &IncomeQuery) -> GatewayResult<Vec<IncomeRecord>> {
        Ok(self.with(|s| {
            s.income_queries.push(query.clone());
            let ignore_start = s.income_ignores_start;
            let mut matching: Vec<IncomeRecord> = s
                .income
                .iter()
                .filter(|r| ignore_start || r.time >= query.start_ms)
                .filter(|r| r.time <= query.end_ms)
                .filter(|r| query.income_type.map_or(true, |t| t == r.income_type))
                .cloned()
                .collect();
            matching.sort_by_key(|r| r.time);
            matching.truncate(s.income_page_size.min(query.limit as usize));
            matching
        }))
    }

    async fn change_leverage(&self, symbol: &str, leverage: u32) -> GatewayResult<()> {
        self.with(|s| {
            s.calls.push(Call::Leverage {
                symbol: symbol.to_string(),
                leverage,
            })
        });
        Ok(())
    }

    async fn set_multi_assets_margin(&self, enabled: bool) -> GatewayResult<()> {
        self.with(|s| s.calls.push(Call::MultiAssets(enabled)));
        Ok(())
    }

    async fn account_trades(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> GatewayResult<Vec<AccountTrade>> {
        Ok(self.with(|s| {
            s.trades
                .iter()
                .filter(|t| t.symbol == symbol && t.time >= start_ms && t.time <= end_ms)
                .cloned()
                .collect()
        }))
    }
}
