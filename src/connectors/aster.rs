// src/connectors/aster.rs
use crate::config::{AccountConfig, ExchangeConfig};
use crate::connectors::error::{GatewayError, GatewayResult};
use crate::connectors::messages::{
    AccountInfo, ApiErrorBody, BatchEntry, BookTickerInfo, ExchangeInfo, IncomeInfo, OpenOrderInfo,
    PlacedOrder, PositionRisk, PremiumIndex, UserTrade,
};
use crate::connectors::traits::ExchangeGateway;
use crate::types::{
    AccountSnapshot, AccountTrade, BookTicker, IncomeQuery, IncomeRecord, OpenOrder, OrderResponse,
    OrderSpec, SymbolLimits,
};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Proxy, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Signed REST client for the USDⓈ-M futures API, one per account.
pub struct AsterClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    recv_window_ms: u64,
}

impl AsterClient {
    pub fn new(account: &AccountConfig, exchange: &ExchangeConfig) -> GatewayResult<Self> {
        let base = Url::parse(&exchange.base_url)
            .map_err(|e| GatewayError::Request(format!("invalid base url: {}", e)))?;

        let mut builder = Client::builder().timeout(Duration::from_secs(exchange.timeout_secs));
        if let Some(proxy) = account.proxy_url() {
            builder = builder.proxy(Proxy::https(proxy)?);
        }

        Ok(Self {
            api_key: account.key.clone(),
            secret_key: account.secret.clone(),
            http_client: builder.build()?,
            base_rest_url: base.as_str().trim_end_matches('/').to_string(),
            recv_window_ms: exchange.recv_window_ms,
        })
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> GatewayResult<String> {
        let mut params = params;
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query_string = serde_urlencoded::to_string(&params)?;
        let signature = sign(&self.secret_key, &query_string)?;

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let mut url = format!("{}{}", self.base_rest_url, endpoint);
        if !params.is_empty() {
            url = format!("{}?{}", url, serde_urlencoded::to_string(&params)?);
        }
        let response = self.http_client.get(&url).send().await?;
        read_response(endpoint, response).await
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        read_response(endpoint, response).await
    }
}

fn sign(secret: &str, payload: &str) -> GatewayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Request(format!("invalid secret key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

async fn read_response<T: DeserializeOwned>(endpoint: &str, response: Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => GatewayError::api(status.as_u16(), err.code, err.msg),
            Err(_) => GatewayError::api(status.as_u16(), 0, body),
        });
    }

    serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Exchange-side parameter list for one order. Decimals are normalized so that
/// `100.0` goes out as `100`.
fn order_params(order: &OrderSpec) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", order.symbol.clone()),
        ("side", order.side.as_str().to_string()),
        ("type", order.order_type.as_str().to_string()),
        ("quantity", order.quantity.normalize().to_string()),
    ];
    if let Some(p) = order.price {
        params.push(("price", p.normalize().to_string()));
    }
    if let Some(tif) = order.time_in_force {
        params.push(("timeInForce", tif.as_str().to_string()));
    }
    if order.reduce_only {
        params.push(("reduceOnly", "true".to_string()));
    }
    if let Some(id) = &order.client_order_id {
        params.push(("newClientOrderId", id.clone()));
    }
    params
}

fn batch_payload(orders: &[OrderSpec]) -> GatewayResult<String> {
    let entries: Vec<serde_json::Value> = orders
        .iter()
        .map(|o| {
            let object = order_params(o)
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::to_string(&entries).map_err(|e| GatewayError::Request(e.to_string()))
}

#[async_trait]
impl ExchangeGateway for AsterClient {
    async fn account_snapshot(&self) -> GatewayResult<AccountSnapshot> {
        let account: AccountInfo = self
            .send_signed_request(Method::GET, "/fapi/v2/account", vec![])
            .await?;
        let positions: Vec<PositionRisk> = self
            .send_signed_request(Method::GET, "/fapi/v2/positionRisk", vec![])
            .await?;

        Ok(AccountSnapshot {
            assets: account.assets.into_iter().map(Into::into).collect(),
            positions: positions.into_iter().map(Into::into).collect(),
        })
    }

    async fn open_orders(&self) -> GatewayResult<Vec<OpenOrder>> {
        let orders: Vec<OpenOrderInfo> = self
            .send_signed_request(Method::GET, "/fapi/v1/openOrders", vec![])
            .await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> GatewayResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let _: serde_json::Value = self
            .send_signed_request(Method::DELETE, "/fapi/v1/order", params)
            .await?;
        Ok(())
    }

    async fn cancel_all_open_orders(&self, symbol: &str) -> GatewayResult<()> {
        let _: serde_json::Value = self
            .send_signed_request(
                Method::DELETE,
                "/fapi/v1/allOpenOrders",
                vec![("symbol", symbol.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn place_order(&self, order: &OrderSpec) -> GatewayResult<OrderResponse> {
        info!(
            "🚀 Sending Order: {} {} {} {} @ {:?} reduce_only={}",
            order.order_type.as_str(),
            order.side.as_str(),
            order.quantity,
            order.symbol,
            order.price,
            order.reduce_only
        );

        let resp: PlacedOrder = self
            .send_signed_request(Method::POST, "/fapi/v1/order", order_params(order))
            .await?;
        Ok(resp.into())
    }

    async fn place_batch_orders(
        &self,
        orders: &[OrderSpec],
    ) -> GatewayResult<Vec<GatewayResult<OrderResponse>>> {
        info!("🚀 Sending batch of {} orders", orders.len());

        let params = vec![("batchOrders", batch_payload(orders)?)];
        let entries: Vec<BatchEntry> = self
            .send_signed_request(Method::POST, "/fapi/v1/batchOrders", params)
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                BatchEntry::Placed(order) => Ok(order.into()),
                BatchEntry::Rejected(err) => Err(GatewayError::api(200, err.code, err.msg)),
            })
            .collect())
    }

    async fn best_bid_ask(&self, symbol: &str) -> GatewayResult<BookTicker> {
        let ticker: BookTickerInfo = self
            .send_public(
                "/fapi/v1/ticker/bookTicker",
                vec![("symbol", symbol.to_string())],
            )
            .await?;
        Ok(ticker.into())
    }

    async fn mark_prices(&self) -> GatewayResult<HashMap<String, Decimal>> {
        let indexes: Vec<PremiumIndex> = self.send_public("/fapi/v1/premiumIndex", vec![]).await?;
        Ok(indexes
            .into_iter()
            .map(|i| (i.symbol, i.mark_price))
            .collect())
    }

    async fn symbol_metadata(&self) -> GatewayResult<HashMap<String, SymbolLimits>> {
        let info: ExchangeInfo = self.send_public("/fapi/v1/exchangeInfo", vec![]).await?;
        debug!("exchangeInfo returned {} symbols", info.symbols.len());
        Ok(info
            .symbols
            .into_iter()
            .map(|s| (s.symbol.clone(), SymbolLimits::from(s)))
            .collect())
    }

    async fn income_history(&self, query: &IncomeQuery) -> GatewayResult<Vec<IncomeRecord>> {
        let mut params = vec![
            ("startTime", query.start_ms.to_string()),
            ("endTime", query.end_ms.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(kind) = query.income_type {
            params.push(("incomeType", kind.as_str().to_string()));
        }
        let page: Vec<IncomeInfo> = self
            .send_signed_request(Method::GET, "/fapi/v1/income", params)
            .await?;
        Ok(page.into_iter().map(Into::into).collect())
    }

    async fn change_leverage(&self, symbol: &str, leverage: u32) -> GatewayResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("leverage", leverage.to_string()),
        ];
        let _: serde_json::Value = self
            .send_signed_request(Method::POST, "/fapi/v1/leverage", params)
            .await?;
        Ok(())
    }

    async fn set_multi_assets_margin(&self, enabled: bool) -> GatewayResult<()> {
        let _: serde_json::Value = self
            .send_signed_request(
                Method::POST,
                "/fapi/v1/multiAssetsMargin",
                vec![("multiAssetsMargin", enabled.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn account_trades(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> GatewayResult<Vec<AccountTrade>> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
        ];
        let trades: Vec<UserTrade> = self
            .send_signed_request(Method::GET, "/fapi/v1/userTrades", params)
            .await?;
        Ok(trades.into_iter().map(Into::into).collect())
    }
}
