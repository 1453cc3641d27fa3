// src/core/cost.rs
//! Daily spend tracking from the exchange income ledger.
use crate::config::CostConfig;
use crate::connectors::error::GatewayResult;
use crate::connectors::traits::ExchangeGateway;
use crate::types::{IncomeQuery, IncomeRecord, IncomeType};
use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Half-open `[start_ms, end_ms)` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DayWindow {
    pub fn contains(&self, time: i64) -> bool {
        time >= self.start_ms && time < self.end_ms
    }
}

/// Local midnight to the next local midnight around `now`.
pub fn local_day_window(now: DateTime<Local>) -> DayWindow {
    let today = now.date_naive();
    let start = local_midnight_ms(today).unwrap_or_else(|| now.timestamp_millis());
    let end = today
        .succ_opt()
        .and_then(local_midnight_ms)
        .unwrap_or(start + ChronoDuration::days(1).num_milliseconds());
    DayWindow {
        start_ms: start,
        end_ms: end,
    }
}

fn local_midnight_ms(date: chrono::NaiveDate) -> Option<i64> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => None,
    }
}

/// Which ledger entries count towards the daily spend.
#[derive(Debug, Clone)]
pub struct CostScope {
    pub income_types: HashSet<IncomeType>,
    /// `None` counts every symbol.
    pub symbols: Option<HashSet<String>>,
    pub quote_asset: String,
}

impl CostScope {
    pub fn new(config: &CostConfig, universe: &[String], quote_asset: &str) -> Self {
        Self {
            income_types: config.income_types.iter().copied().collect(),
            symbols: config
                .restrict_to_universe
                .then(|| universe.iter().cloned().collect()),
            quote_asset: quote_asset.to_string(),
        }
    }

    fn counts(&self, record: &IncomeRecord) -> bool {
        if !self.income_types.contains(&record.income_type) {
            return false;
        }
        match &self.symbols {
            Some(symbols) if !record.symbol.is_empty() => symbols.contains(&record.symbol),
            _ => true,
        }
    }

    /// The server-side filter only takes a single type.
    fn query_type(&self) -> Option<IncomeType> {
        if self.income_types.len() == 1 {
            self.income_types.iter().next().copied()
        } else {
            None
        }
    }

    fn asset_price(&self, asset: &str, marks: &HashMap<String, Decimal>) -> Decimal {
        if asset == self.quote_asset {
            return Decimal::ONE;
        }
        let symbol = format!("{}{}", asset, self.quote_asset);
        match marks.get(&symbol) {
            Some(price) => *price,
            None => {
                error!("symbol {} not found in mark prices, counting as zero", symbol);
                Decimal::ZERO
            }
        }
    }
}

/// Per-iteration view of an account's spend. Never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CostState {
    pub cost: Decimal,
    pub budget: Decimal,
    pub exhausted: bool,
}

/// Net expenditure: counted income is negated, so paid commissions come out positive.
pub fn accumulated_cost(
    records: &[IncomeRecord],
    window: DayWindow,
    scope: &CostScope,
    marks: &HashMap<String, Decimal>,
) -> Decimal {
    let income: Decimal = records
        .iter()
        .filter(|r| window.contains(r.time) && scope.counts(r))
        .map(|r| r.amount * scope.asset_price(&r.asset, marks))
        .sum();
    -income
}

pub fn is_budget_exhausted(cost: Decimal, budget: Decimal) -> bool {
    cost.abs() >= budget
}

/// Walks the ledger forward from the window start until a page comes back empty
/// or stops advancing the cursor.
pub async fn fetch_income_history<G>(
    gateway: &G,
    window: DayWindow,
    income_type: Option<IncomeType>,
    page_limit: u32,
    page_delay: Duration,
) -> GatewayResult<Vec<IncomeRecord>>
where
    G: ExchangeGateway + ?Sized,
{
    let mut history = Vec::new();
    let mut cursor = window.start_ms;

    while cursor < window.end_ms {
        let query = IncomeQuery {
            start_ms: cursor,
            end_ms: window.end_ms - 1,
            income_type,
            limit: page_limit,
        };
        let page = gateway.income_history(&query).await?;
        let Some(last) = page.last() else {
            break;
        };
        let next = cursor.max(last.time + 1);
        if next == cursor {
            warn!(
                "income page ending at {} did not move past {}, stopping",
                last.time, cursor
            );
            break;
        }
        cursor = next;
        history.extend(page);
        tokio::time::sleep(page_delay).await;
    }

    debug!("fetched {} income records", history.len());
    Ok(history)
}

/// Fetches today's ledger and mark prices and compares the spend against `budget`.
pub async fn daily_cost<G>(
    gateway: &G,
    config: &CostConfig,
    scope: &CostScope,
    budget: Decimal,
    now: DateTime<Local>,
) -> GatewayResult<CostState>
where
    G: ExchangeGateway + ?Sized,
{
    let window = local_day_window(now);
    let records = fetch_income_history(
        gateway,
        window,
        scope.query_type(),
        config.page_limit,
        Duration::from_millis(config.page_delay_ms),
    )
    .await?;
    let marks = gateway.mark_prices().await?;
    let cost = accumulated_cost(&records, window, scope, &marks);

    Ok(CostState {
        cost,
        budget,
        exhausted: is_budget_exhausted(cost, budget),
    })
}
