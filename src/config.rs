// src/config.rs

use crate::types::IncomeType;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fapi.asterdex.com".to_string(),
            recv_window_ms: 6000,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub proxy: Option<String>,
    /// Daily spend cap in quote currency.
    pub cost_per_day: Decimal,
    #[serde(default)]
    pub name: Option<String>,
}

impl AccountConfig {
    /// Name used for log files and log lines. Falls back to a key prefix, never the full key.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                let prefix: String = self.key.chars().take(8).collect();
                format!("key-{}", prefix)
            }
        }
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RangeConfig {
    pub min: u64,
    pub max: u64,
}

/// How large each self-matched pair should be, in quote currency.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotionalTarget {
    Fixed { value: Decimal },
    /// `min(value, factor * available_balance)`.
    BalanceScaled { value: Decimal, factor: Decimal },
}

impl NotionalTarget {
    pub fn resolve(&self, balance: Decimal) -> Decimal {
        match self {
            NotionalTarget::Fixed { value } => *value,
            NotionalTarget::BalanceScaled { value, factor } => (*value).min(*factor * balance),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    pub quote_asset: String,
    pub hedge_mode: bool,
    pub dry_run: bool,
    pub batch_orders: bool,
    pub skip_while_orders_open: bool,
    pub sleep_secs: RangeConfig,
    /// Extra `min_qty` steps added to each order, drawn uniformly from this range.
    pub jitter_steps: RangeConfig,
    pub notional: NotionalTarget,
    pub min_notional: Decimal,
    pub min_balance: Decimal,
    pub order_timeout_ms: i64,
    pub position_stale_ms: i64,
    pub noise_floor: Decimal,
    pub seed: Option<u64>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbols: ["BTCUSDT", "ETHUSDT", "ASTERUSDT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            quote_asset: "USDT".to_string(),
            hedge_mode: false,
            dry_run: false,
            batch_orders: true,
            skip_while_orders_open: true,
            sleep_secs: RangeConfig { min: 10, max: 30 },
            jitter_steps: RangeConfig { min: 0, max: 3 },
            notional: NotionalTarget::Fixed {
                value: Decimal::from(20),
            },
            min_notional: Decimal::from(5),
            min_balance: Decimal::new(1, 3),
            order_timeout_ms: 300_000,
            position_stale_ms: 300_000,
            noise_floor: Decimal::ONE,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CostConfig {
    pub income_types: Vec<IncomeType>,
    pub restrict_to_universe: bool,
    pub page_delay_ms: u64,
    pub page_limit: u32,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            income_types: vec![IncomeType::Commission],
            restrict_to_universe: true,
            page_delay_ms: 100,
            page_limit: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SupervisorConfig {
    pub restart_delay_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub level: String,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            level: "info".to_string(),
            max_files: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub leverage: u32,
    pub multi_assets_margin: bool,
    pub volume_lookback_days: i64,
    /// Empty means the trading universe.
    pub volume_symbols: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            leverage: 10,
            multi_assets_margin: true,
            volume_lookback_days: 7,
            volume_symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl AppConfig {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("ASTER").separator("__"));

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Message(msg));

        if self.accounts.is_empty() {
            return fail("no accounts configured".into());
        }
        if self.trading.symbols.is_empty() {
            return fail("trading.symbols must not be empty".into());
        }
        let sleep = self.trading.sleep_secs;
        if sleep.min > sleep.max {
            return fail(format!(
                "trading.sleep_secs min {} exceeds max {}",
                sleep.min, sleep.max
            ));
        }
        let jitter = self.trading.jitter_steps;
        if jitter.min > jitter.max {
            return fail(format!(
                "trading.jitter_steps min {} exceeds max {}",
                jitter.min, jitter.max
            ));
        }
        for account in &self.accounts {
            if account.cost_per_day <= Decimal::ZERO {
                return fail(format!(
                    "account {} has a non-positive cost_per_day",
                    account.label()
                ));
            }
        }
        Ok(())
    }
}
