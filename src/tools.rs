// src/tools.rs
//! One-shot account commands. Every account runs concurrently and a failure on
//! one of them is logged without stopping the others.
use crate::cli::Command;
use crate::config::{AccountConfig, AppConfig};
use crate::connectors::aster::AsterClient;
use crate::connectors::error::GatewayResult;
use crate::connectors::traits::ExchangeGateway;
use crate::core::cost::{daily_cost, CostScope};
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{error, info};

pub async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let jobs = config.accounts.iter().map(|account| async move {
        let name = account.label();
        if let Err(e) = run_for_account(command, config, account).await {
            error!("{}: {:#}", name, e);
        }
    });
    join_all(jobs).await;
    Ok(())
}

async fn run_for_account(command: Command, config: &AppConfig, account: &AccountConfig) -> Result<()> {
    let name = account.label();
    let client = AsterClient::new(account, &config.exchange)
        .with_context(|| format!("failed to build client for {}", name))?;

    match command {
        Command::Init => init_account(&name, &client, config, account.cost_per_day).await,
        Command::Balance => report_balance(&name, &client).await,
        Command::Volume => {
            let symbols = if config.tools.volume_symbols.is_empty() {
                &config.trading.symbols
            } else {
                &config.tools.volume_symbols
            };
            let end = Utc::now().timestamp_millis();
            let start = end - ChronoDuration::days(config.tools.volume_lookback_days).num_milliseconds();
            let report = traded_volume(&client, symbols, start, end).await?;
            println!(
                "{} volume={} commission={} trades={}",
                name, report.volume, report.commission, report.trades
            );
            Ok(())
        }
        Command::Run => Ok(()),
    }
}

/// Logs today's cost, sets leverage on every traded symbol and switches the
/// margin mode. The margin switch fails harmlessly when it is already set.
pub async fn init_account<G: ExchangeGateway + ?Sized>(
    name: &str,
    gateway: &G,
    config: &AppConfig,
    budget: Decimal,
) -> Result<()> {
    let scope = CostScope::new(&config.cost, &config.trading.symbols, &config.trading.quote_asset);
    let state = daily_cost(gateway, &config.cost, &scope, budget, Local::now()).await?;
    info!("{} cost: {} budget: {}", name, state.cost, state.budget);

    let mut symbols = config.trading.symbols.clone();
    symbols.sort();
    symbols.dedup();
    for symbol in &symbols {
        gateway
            .change_leverage(symbol, config.tools.leverage)
            .await
            .with_context(|| format!("failed to set leverage on {}", symbol))?;
        info!("{} {} leverage set to {}", name, symbol, config.tools.leverage);
    }

    if let Err(e) = gateway
        .set_multi_assets_margin(config.tools.multi_assets_margin)
        .await
    {
        error!("{} {}", name, e);
    }
    Ok(())
}

pub async fn report_balance<G: ExchangeGateway + ?Sized>(name: &str, gateway: &G) -> Result<()> {
    let snapshot = gateway.account_snapshot().await?;
    for asset in snapshot.assets.iter().filter(|a| !a.wallet_balance.is_zero()) {
        info!(
            "{}: {} wallet={} available={}",
            name, asset.asset, asset.wallet_balance, asset.available_balance
        );
    }
    for position in snapshot.open_positions() {
        info!(
            "{}: position {} amount={} notional={}",
            name, position.symbol, position.amount, position.notional
        );
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
pub struct VolumeReport {
    pub volume: Decimal,
    pub commission: Decimal,
    pub trades: usize,
}

/// Sum of quote-currency trade value across `symbols` in `[start_ms, end_ms]`.
pub async fn traded_volume<G: ExchangeGateway + ?Sized>(
    gateway: &G,
    symbols: &[String],
    start_ms: i64,
    end_ms: i64,
) -> GatewayResult<VolumeReport> {
    let mut report = VolumeReport::default();
    for symbol in symbols {
        for trade in gateway.account_trades(symbol, start_ms, end_ms).await? {
            report.volume += trade.quote_qty;
            report.commission += trade.commission;
            report.trades += 1;
        }
    }
    Ok(report)
}
