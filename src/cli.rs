// src/cli.rs
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aster_volume", version, about = "Self-matching volume bot for Aster futures")]
pub struct Cli {
    /// Configuration file, with or without extension.
    #[arg(short, long, default_value = "config")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the trading loops (default).
    Run,
    /// Set leverage and margin mode on every account, and report today's cost.
    Init,
    /// Print balances and open positions of every account.
    Balance,
    /// Print traded volume per account over the configured lookback.
    Volume,
}
