//! Command-line interface definitions.

pub mod control;
pub mod run;
pub mod status;
pub mod strategies;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// ArBot - cross-exchange cryptocurrency arbitrage engine.
#[derive(Parser, Debug)]
#[command(name = "arbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the arbitrage engine (foreground)
    Run(RunArgs),

    /// Query a running instance's status over its control socket
    Status(SocketArgs),

    /// Cancel all open orders on every exchange and reject new signals
    EmergencyStop(SocketArgs),

    /// Clear a tripped circuit breaker
    CircuitBreakerReset(SocketArgs),

    /// Reload fee tables and risk thresholds from a config file
    ReloadConfig(ReloadConfigArgs),

    /// List the built-in detectors
    Strategies,
}

/// Arguments shared by every client subcommand that talks to a running
/// instance over the control socket.
#[derive(Parser, Debug)]
pub struct SocketArgs {
    /// Path to the running instance's control socket
    #[arg(long, default_value = "/tmp/arbot.sock")]
    pub socket: PathBuf,
}

/// Arguments for the `reload-config` subcommand.
#[derive(Parser, Debug)]
pub struct ReloadConfigArgs {
    #[command(flatten)]
    pub socket: SocketArgs,

    /// Config file the running instance should reload from
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Override execution mode (backtest, paper, live)
    #[arg(long)]
    pub execution_mode: Option<String>,

    /// Override the detector cycle interval
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Override max total exposure across all positions
    #[arg(long)]
    pub max_total_exposure: Option<Decimal>,

    /// Override max position size per coin
    #[arg(long)]
    pub max_position_per_coin: Option<Decimal>,
}
