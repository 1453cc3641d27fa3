// src/connectors/messages.rs
//! Wire formats of the futures REST API. Field names follow the exchange JSON via `rename`;
//! everything is converted into `crate::types` before leaving the connector.
use crate::types::{
    AccountTrade, AssetBalance, BookTicker, IncomeRecord, IncomeType, OpenOrder, OrderResponse,
    Position, Side, SymbolLimits,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Error body, e.g. `{"code":-1021,"msg":"Timestamp for this request is outside of the recvWindow."}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,

    #[serde(rename = "pricePrecision")]
    pub price_precision: u32,

    #[serde(rename = "quantityPrecision")]
    pub quantity_precision: u32,

    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },

    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
        #[serde(rename = "minQty")]
        min_qty: Decimal,
        #[serde(rename = "maxQty")]
        max_qty: Decimal,
    },

    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional { notional: Decimal },

    #[serde(other)]
    Other,
}

impl From<SymbolInfo> for SymbolLimits {
    fn from(info: SymbolInfo) -> Self {
        let mut limits = SymbolLimits {
            symbol: info.symbol,
            price_precision: info.price_precision,
            qty_precision: info.quantity_precision,
            tick_size: Decimal::ZERO,
            step_size: Decimal::ZERO,
            min_qty: Decimal::ZERO,
            max_qty: Decimal::ZERO,
            min_notional: None,
        };
        for filter in info.filters {
            match filter {
                SymbolFilter::Price { tick_size } => limits.tick_size = tick_size,
                SymbolFilter::LotSize {
                    step_size,
                    min_qty,
                    max_qty,
                } => {
                    limits.step_size = step_size;
                    limits.min_qty = min_qty;
                    limits.max_qty = max_qty;
                }
                SymbolFilter::MinNotional { notional } => limits.min_notional = Some(notional),
                SymbolFilter::Other => {}
            }
        }
        limits
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub assets: Vec<AssetInfo>,
}

#[derive(Debug, Deserialize)]
pub struct AssetInfo {
    pub asset: String,

    #[serde(rename = "walletBalance")]
    pub wallet_balance: Decimal,

    #[serde(rename = "availableBalance")]
    pub available_balance: Decimal,
}

impl From<AssetInfo> for AssetBalance {
    fn from(a: AssetInfo) -> Self {
        AssetBalance {
            asset: a.asset,
            wallet_balance: a.wallet_balance,
            available_balance: a.available_balance,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PositionRisk {
    pub symbol: String,

    #[serde(rename = "positionAmt")]
    pub position_amt: Decimal,

    #[serde(rename = "markPrice", default)]
    pub mark_price: Decimal,

    #[serde(default)]
    pub notional: Option<Decimal>,

    #[serde(rename = "updateTime", default)]
    pub update_time: i64,
}

impl From<PositionRisk> for Position {
    fn from(p: PositionRisk) -> Self {
        let notional = p.notional.unwrap_or(p.position_amt * p.mark_price);
        Position {
            symbol: p.symbol,
            amount: p.position_amt,
            notional,
            update_time: p.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenOrderInfo {
    pub symbol: String,

    #[serde(rename = "orderId")]
    pub order_id: u64,

    #[serde(rename = "clientOrderId", default)]
    pub client_order_id: String,

    pub side: Side,
    pub price: Decimal,

    #[serde(rename = "origQty")]
    pub orig_qty: Decimal,

    #[serde(rename = "executedQty", default)]
    pub executed_qty: Decimal,

    #[serde(rename = "updateTime")]
    pub update_time: i64,
}

impl From<OpenOrderInfo> for OpenOrder {
    fn from(o: OpenOrderInfo) -> Self {
        OpenOrder {
            symbol: o.symbol,
            order_id: o.order_id,
            client_order_id: o.client_order_id,
            side: o.side,
            price: o.price,
            orig_qty: o.orig_qty,
            executed_qty: o.executed_qty,
            update_time: o.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacedOrder {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: String,
    pub status: String,
}

impl From<PlacedOrder> for OrderResponse {
    fn from(o: PlacedOrder) -> Self {
        OrderResponse {
            id: o.order_id.to_string(),
            symbol: o.symbol,
            status: o.status,
        }
    }
}

/// Entries of a batch response are either an accepted order or an error body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Placed(PlacedOrder),
    Rejected(ApiErrorBody),
}

#[derive(Debug, Deserialize)]
pub struct BookTickerInfo {
    pub symbol: String,

    #[serde(rename = "bidPrice")]
    pub bid_price: Decimal,

    #[serde(rename = "askPrice")]
    pub ask_price: Decimal,
}

impl From<BookTickerInfo> for BookTicker {
    fn from(t: BookTickerInfo) -> Self {
        BookTicker {
            symbol: t.symbol,
            bid: t.bid_price,
            ask: t.ask_price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PremiumIndex {
    pub symbol: String,

    #[serde(rename = "markPrice")]
    pub mark_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct IncomeInfo {
    #[serde(default)]
    pub symbol: String,

    #[serde(rename = "incomeType")]
    pub income_type: IncomeType,

    pub income: Decimal,
    pub asset: String,
    pub time: i64,
}

impl From<IncomeInfo> for IncomeRecord {
    fn from(i: IncomeInfo) -> Self {
        IncomeRecord {
            symbol: i.symbol,
            income_type: i.income_type,
            amount: i.income,
            asset: i.asset,
            time: i.time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserTrade {
    pub symbol: String,

    #[serde(rename = "quoteQty")]
    pub quote_qty: Decimal,

    #[serde(default)]
    pub commission: Decimal,

    pub time: i64,
}

impl From<UserTrade> for AccountTrade {
    fn from(t: UserTrade) -> Self {
        AccountTrade {
            symbol: t.symbol,
            quote_qty: t.quote_qty,
            commission: t.commission,
            time: t.time,
        }
    }
}
