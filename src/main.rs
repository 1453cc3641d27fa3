// src/main.rs
use crate::cli::{Cli, Command};
use crate::config::{AccountConfig, AppConfig};
use crate::connectors::aster::AsterClient;
use crate::core::engine::{Leg, TradingLoop};
use crate::core::supervisor::supervise;
use crate::strategies::self_match::SelfMatchSelector;
use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod cli;
mod config;
mod connectors;
mod core;
mod logging;
mod strategies;
mod tools;
mod types;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = AppConfig::new(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    logging::init_console(&config.logging);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_loops(Arc::new(config)).await,
        command => tools::run(command, &config).await,
    }
}

/// Accounts in the order they run: singles, or consecutive pairs in hedge mode.
fn group_accounts(config: &AppConfig) -> Vec<(AccountConfig, Option<AccountConfig>)> {
    if !config.trading.hedge_mode {
        return config
            .accounts
            .iter()
            .map(|a| (a.clone(), None))
            .collect();
    }

    let mut groups = Vec::new();
    for pair in config.accounts.chunks(2) {
        match pair {
            [buyer, seller] => groups.push((buyer.clone(), Some(seller.clone()))),
            [single] => warn!(
                "hedge mode needs accounts in pairs, {} has no partner and will not run",
                single.label()
            ),
            _ => {}
        }
    }
    groups
}

async fn run_loops(config: Arc<AppConfig>) -> anyhow::Result<()> {
    println!("========================================");
    println!("       ASTER VOLUME BOT - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("Accounts: {}", config.accounts.len());
    println!(
        "Mode:     {}{}",
        if config.trading.hedge_mode { "HEDGE PAIRS" } else { "SINGLE" },
        if config.trading.dry_run { " (DRY RUN)" } else { "" }
    );
    println!("========================================");

    let restart_delay = Duration::from_secs(config.supervisor.restart_delay_secs);
    let mut sinks = Vec::new();

    for (index, (buyer, seller)) in group_accounts(&config).into_iter().enumerate() {
        let name = match &seller {
            Some(seller) => format!("{}+{}", buyer.label(), seller.label()),
            None => buyer.label(),
        };

        let dispatch = match logging::account_sink(&config.logging, &name) {
            Ok(sink) => {
                let dispatch = sink.dispatch.clone();
                sinks.push(sink);
                Some(dispatch)
            }
            Err(e) => {
                error!("{:#}, logging {} to the console instead", e, name);
                None
            }
        };

        let config = config.clone();
        let factory = move || {
            let config = config.clone();
            let buyer = buyer.clone();
            let seller = seller.clone();
            // Distinct stream per loop even when a fixed seed is configured.
            let rng = match config.trading.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => StdRng::from_entropy(),
            };
            async move {
                let mut engine = build_loop(&config, &buyer, seller.as_ref(), rng)?;
                engine.run().await
            }
        };

        info!("Launching loop {}", name);
        tokio::spawn(supervise(name, restart_delay, dispatch, factory));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting...");
    drop(sinks);
    Ok(())
}

fn build_loop(
    config: &AppConfig,
    buyer: &AccountConfig,
    seller: Option<&AccountConfig>,
    rng: StdRng,
) -> anyhow::Result<TradingLoop<AsterClient, SelfMatchSelector, StdRng>> {
    let leg = |account: &AccountConfig| -> anyhow::Result<Leg<AsterClient>> {
        Ok(Leg {
            name: account.label(),
            gateway: AsterClient::new(account, &config.exchange)?,
            budget: account.cost_per_day,
        })
    };

    let trading = &config.trading;
    let strategy = SelfMatchSelector::new(
        trading.notional.clone(),
        trading.jitter_steps,
        trading.min_notional,
        trading.min_balance,
    );

    Ok(TradingLoop::new(
        leg(buyer)?,
        seller.map(leg).transpose()?,
        strategy,
        rng,
        trading.clone(),
        config.cost.clone(),
    ))
}
