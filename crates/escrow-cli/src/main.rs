//! # escrow CLI entry point
//!
//! Parses command-line arguments, resolves configuration, installs the
//! tracing subscriber, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use escrow_cli::config::{CliConfig, LEDGER_ENV};
use escrow_cli::escrow::{run_escrow, EscrowCommand};
use escrow_cli::ledger::{run_ledger, run_mint, run_token, LedgerArgs, MintArgs, TokenArgs};
use escrow_cli::wallet::{run_keygen, KeygenArgs};

/// Escrow CLI: three-party token escrow on a local ledger.
///
/// Manages wallets, a JSON-persisted ledger with token mints and
/// accounts, and the full escrow lifecycle (initialize, fund, release,
/// dispute, resolve, cancel, close).
#[derive(Parser, Debug)]
#[command(name = "escrow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overriding configuration and ESCROW_LEDGER.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a wallet keypair.
    Keygen(KeygenArgs),

    /// Local ledger management (init, warp, status).
    Ledger(LedgerArgs),

    /// Token mint operations.
    Mint(MintArgs),

    /// Token account operations (create, mint-to, balance).
    Token(TokenArgs),

    #[command(flatten)]
    Escrow(EscrowCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    tracing::debug!("escrow CLI starting");

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(std::env::var(LEDGER_ENV).ok(), cli.ledger.clone()),
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };
    tracing::debug!(ledger = %config.ledger_path.display(), "resolved configuration");

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args, &config),
        Commands::Ledger(args) => run_ledger(args, &config),
        Commands::Mint(args) => run_mint(args, &config),
        Commands::Token(args) => run_token(args, &config),
        Commands::Escrow(command) => run_escrow(command, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Install the subscriber. `RUST_LOG` wins over the `-v` level.
fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
