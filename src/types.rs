// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Gtc,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// Exchange quantization rules for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLimits {
    pub symbol: String,
    pub price_precision: u32,
    pub qty_precision: u32,
    pub tick_size: Decimal,
    pub step_size: Decimal,
    pub min_qty: Decimal,
    /// Zero when the exchange reports no maximum.
    pub max_qty: Decimal,
    pub min_notional: Option<Decimal>,
}

/// Best bid/ask snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookTicker {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl BookTicker {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Signed: positive is long, negative is short.
    pub amount: Decimal,
    pub notional: Decimal,
    pub update_time: i64,
}

impl Position {
    /// `Buy` for a long, `Sell` for a short, `None` when flat.
    pub fn side(&self) -> Option<Side> {
        if self.amount.is_sign_positive() && !self.amount.is_zero() {
            Some(Side::Buy)
        } else if self.amount.is_sign_negative() && !self.amount.is_zero() {
            Some(Side::Sell)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub update_time: i64,
}

impl OpenOrder {
    pub fn remaining(&self) -> Decimal {
        (self.orig_qty - self.executed_qty).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeType {
    Commission,
    FundingFee,
    RealizedPnl,
    Transfer,
    #[serde(other)]
    Other,
}

impl IncomeType {
    pub fn as_str(self) -> &'static str {
        match self {
            IncomeType::Commission => "COMMISSION",
            IncomeType::FundingFee => "FUNDING_FEE",
            IncomeType::RealizedPnl => "REALIZED_PNL",
            IncomeType::Transfer => "TRANSFER",
            IncomeType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeRecord {
    /// Empty for account-wide entries such as transfers.
    pub symbol: String,
    pub income_type: IncomeType,
    pub amount: Decimal,
    pub asset: String,
    pub time: i64,
}

/// One page request against the income ledger. `end_ms` is inclusive, as on the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeQuery {
    pub start_ms: i64,
    pub end_ms: i64,
    pub income_type: Option<IncomeType>,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBalance {
    pub asset: String,
    pub wallet_balance: Decimal,
    pub available_balance: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSnapshot {
    pub assets: Vec<AssetBalance>,
    pub positions: Vec<Position>,
}

impl AccountSnapshot {
    pub fn available(&self, asset: &str) -> Decimal {
        self.assets
            .iter()
            .find(|a| a.asset == asset)
            .map(|a| a.available_balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| !p.amount.is_zero())
    }
}

/// Everything needed to submit one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub reduce_only: bool,
    pub client_order_id: Option<String>,
}

impl OrderSpec {
    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: Some(TimeInForce::Gtc),
            reduce_only: false,
            client_order_id: Some(uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
            reduce_only: false,
            client_order_id: None,
        }
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderResponse {
    pub id: String,
    pub symbol: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountTrade {
    pub symbol: String,
    pub quote_qty: Decimal,
    pub commission: Decimal,
    pub time: i64,
}
