// src/connectors/traits.rs
use crate::connectors::error::GatewayResult;
use crate::types::{
    AccountSnapshot, AccountTrade, BookTicker, IncomeQuery, IncomeRecord, OpenOrder, OrderResponse,
    OrderSpec, SymbolLimits,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Everything the trading loop and the account tools need from the exchange.
/// Implementations never retry; callers decide what to do with a failure.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Balances per asset plus every position row.
    async fn account_snapshot(&self) -> GatewayResult<AccountSnapshot>;

    async fn open_orders(&self) -> GatewayResult<Vec<OpenOrder>>;

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> GatewayResult<()>;

    async fn cancel_all_open_orders(&self, symbol: &str) -> GatewayResult<()>;

    async fn place_order(&self, order: &OrderSpec) -> GatewayResult<OrderResponse>;

    /// One result per submitted order, in submission order. The outer error covers
    /// the request as a whole.
    async fn place_batch_orders(
        &self,
        orders: &[OrderSpec],
    ) -> GatewayResult<Vec<GatewayResult<OrderResponse>>>;

    async fn best_bid_ask(&self, symbol: &str) -> GatewayResult<BookTicker>;

    /// Mark price keyed by symbol.
    async fn mark_prices(&self) -> GatewayResult<HashMap<String, Decimal>>;

    async fn symbol_metadata(&self) -> GatewayResult<HashMap<String, SymbolLimits>>;

    /// One page of the income ledger, oldest first.
    async fn income_history(&self, query: &IncomeQuery) -> GatewayResult<Vec<IncomeRecord>>;

    async fn change_leverage(&self, symbol: &str, leverage: u32) -> GatewayResult<()>;

    async fn set_multi_assets_margin(&self, enabled: bool) -> GatewayResult<()>;

    async fn account_trades(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> GatewayResult<Vec<AccountTrade>>;
}
