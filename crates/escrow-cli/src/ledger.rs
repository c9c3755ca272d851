//! # Ledger, Mint, and Token Subcommands
//!
//! The local ledger persists as a single JSON file. Every command loads
//! it, applies one change, and writes it back.
//!
//! ## Subcommands
//!
//! - `ledger init` / `ledger warp` / `ledger status`
//! - `mint create`
//! - `token create` / `token mint-to` / `token balance` / `token close`

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use escrow_core::{Address, Slot};
use escrow_engine::LocalLedger;

use crate::config::CliConfig;
use crate::wallet::{load_keypair, resolve_address};

// ── Persistence ────────────────────────────────────────────────────────

/// Load the ledger at `path`.
pub fn load_ledger(path: &Path) -> Result<LocalLedger> {
    if !path.exists() {
        bail!(
            "ledger not found at {} (run `escrow ledger init`)",
            path.display()
        );
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse ledger: {}", path.display()))
}

/// Write the ledger to `path`, creating parent directories.
pub fn save_ledger(path: &Path, ledger: &LocalLedger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create ledger directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(ledger)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write ledger: {}", path.display()))
}

// ── ledger ─────────────────────────────────────────────────────────────

/// Arguments for `escrow ledger`.
#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Create an empty ledger at slot 0.
    Init {
        /// Replace an existing ledger.
        #[arg(long)]
        force: bool,
    },

    /// Move the slot clock forward.
    Warp {
        /// Absolute target slot.
        #[arg(long, conflicts_with = "advance", required_unless_present = "advance")]
        slot: Option<Slot>,
        /// Number of slots to advance.
        #[arg(long)]
        advance: Option<Slot>,
    },

    /// Show program id and current slot.
    Status,
}

/// Execute `escrow ledger`.
pub fn run_ledger(args: &LedgerArgs, config: &CliConfig) -> Result<u8> {
    let path = &config.ledger_path;
    match &args.command {
        LedgerCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "ledger already exists: {} (use --force to replace)",
                    path.display()
                );
            }
            let ledger = LocalLedger::new(config.program_id()?);
            save_ledger(path, &ledger)?;
            println!(
                "OK: initialized ledger {} (program {})",
                path.display(),
                ledger.program_id()
            );
            Ok(0)
        }
        LedgerCommand::Warp { slot, advance } => {
            let mut ledger = load_ledger(path)?;
            match (slot, advance) {
                (Some(slot), _) => ledger.warp_to_slot(*slot)?,
                (None, Some(n)) => {
                    ledger.advance_slots(*n);
                }
                (None, None) => bail!("either --slot or --advance is required"),
            }
            save_ledger(path, &ledger)?;
            println!("slot: {}", ledger.slot());
            Ok(0)
        }
        LedgerCommand::Status => {
            let ledger = load_ledger(path)?;
            println!("program: {}", ledger.program_id());
            println!("slot:    {}", ledger.slot());
            Ok(0)
        }
    }
}

// ── mint ───────────────────────────────────────────────────────────────

/// Arguments for `escrow mint`.
#[derive(Args, Debug)]
pub struct MintArgs {
    #[command(subcommand)]
    pub command: MintCommand,
}

/// Mint subcommands.
#[derive(Subcommand, Debug)]
pub enum MintCommand {
    /// Create a token mint.
    Create {
        /// Mint authority (address or wallet name).
        #[arg(long)]
        authority: String,
        /// Display precision.
        #[arg(long, default_value_t = 6)]
        decimals: u8,
    },
}

/// Execute `escrow mint`.
pub fn run_mint(args: &MintArgs, config: &CliConfig) -> Result<u8> {
    match &args.command {
        MintCommand::Create {
            authority,
            decimals,
        } => {
            let authority = resolve_address(authority, &config.wallet_dir)?;
            let mut ledger = load_ledger(&config.ledger_path)?;
            let mint = ledger.create_mint(&authority, *decimals);
            save_ledger(&config.ledger_path, &ledger)?;
            println!("{mint}");
            Ok(0)
        }
    }
}

// ── token ──────────────────────────────────────────────────────────────

/// Arguments for `escrow token`.
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token account subcommands.
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Create an empty token account.
    Create {
        /// Owner (address or wallet name).
        #[arg(long)]
        owner: String,
        /// Mint address.
        #[arg(long)]
        mint: Address,
    },

    /// Mint new tokens into an account.
    MintTo {
        /// Mint address.
        #[arg(long)]
        mint: Address,
        /// Mint authority wallet.
        #[arg(long)]
        authority: String,
        /// Destination token account.
        #[arg(long)]
        to: Address,
        /// Quantity in base units.
        #[arg(long)]
        amount: u64,
    },

    /// Show a token account.
    Balance {
        /// Token account address.
        account: Address,
    },

    /// Close an empty token account.
    Close {
        /// Token account address.
        account: Address,
        /// Owner wallet.
        #[arg(long)]
        owner: String,
    },
}

/// Execute `escrow token`.
pub fn run_token(args: &TokenArgs, config: &CliConfig) -> Result<u8> {
    let path = &config.ledger_path;
    match &args.command {
        TokenCommand::Create { owner, mint } => {
            let owner = resolve_address(owner, &config.wallet_dir)?;
            let mut ledger = load_ledger(path)?;
            let account = ledger
                .create_token_account(&owner, mint)
                .context("failed to create token account")?;
            save_ledger(path, &ledger)?;
            println!("{account}");
            Ok(0)
        }
        TokenCommand::MintTo {
            mint,
            authority,
            to,
            amount,
        } => {
            let authority = load_keypair(authority, &config.wallet_dir)?;
            let mut ledger = load_ledger(path)?;
            ledger
                .mint_to(mint, &authority, to, *amount)
                .context("mint-to rejected")?;
            save_ledger(path, &ledger)?;
            println!("OK: minted {amount} to {to}");
            Ok(0)
        }
        TokenCommand::Balance { account } => {
            let ledger = load_ledger(path)?;
            let Some(info) = ledger.token_account(account) else {
                bail!("token account not found: {account}");
            };
            println!("mint:    {}", info.mint);
            println!("owner:   {}", info.owner);
            println!("balance: {}", info.amount);
            Ok(0)
        }
        TokenCommand::Close { account, owner } => {
            let owner = load_keypair(owner, &config.wallet_dir)?;
            let mut ledger = load_ledger(path)?;
            ledger
                .close_token_account(account, &owner)
                .with_context(|| format!("failed to close token account {account}"))?;
            save_ledger(path, &ledger)?;
            println!("OK: closed {account}");
            Ok(0)
        }
    }
}
