//! # escrow-cli — Command-Line Client for the Escrow Engine
//!
//! Provides the `escrow` binary. State lives in a JSON-persisted
//! [`escrow_engine::LocalLedger`]; signers are hex-seed wallet files.
//!
//! ## Subcommands
//!
//! - `escrow keygen` — Create a wallet.
//! - `escrow ledger` — Initialize the ledger, warp its clock, show status.
//! - `escrow mint` / `escrow token` — Token mints and accounts.
//! - `escrow init|fund|release|dispute|resolve|cancel|close` — Escrow
//!   transitions.
//! - `escrow view|derive` — Inspect records and derived addresses.
//!
//! ```bash
//! escrow keygen alice
//! escrow ledger init
//! escrow init --depositor alice --id 1 --beneficiary bob --arbiter carol \
//!     --mint <MINT> --amount 1000000
//! escrow view --depositor alice --id 1
//! ```

pub mod config;
pub mod escrow;
pub mod ledger;
pub mod wallet;

pub use config::CliConfig;
