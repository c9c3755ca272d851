//! # Escrow Subcommands
//!
//! Every transition is addressed by `(--depositor, --id)`; the escrow,
//! vault, and vault-authority addresses are derived from that pair, so
//! the user never types a derived address.
//!
//! Transitions build a signed [`Transaction`] at the ledger's current
//! slot, submit it, persist the ledger, and print the resulting status
//! and transaction id. A rejected transaction leaves the ledger file
//! untouched.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use escrow_core::{Address, EscrowAddresses, Keypair, Slot};
use escrow_engine::{
    CloseAccounts, FundAccounts, InitializeAccounts, Instruction, ReleaseAccounts,
    ResolveAccounts, Transaction, TransactionReceipt,
};
use escrow_state::EscrowRecord;

use crate::config::CliConfig;
use crate::ledger::{load_ledger, save_ledger};
use crate::wallet::{load_keypair, resolve_address};

/// Identifies one escrow.
#[derive(Args, Debug, Clone)]
pub struct EscrowRef {
    /// Depositor (address or wallet name).
    #[arg(long)]
    pub depositor: String,
    /// Depositor-chosen escrow identifier.
    #[arg(long)]
    pub id: u64,
}

/// Escrow transitions and queries.
#[derive(Subcommand, Debug)]
pub enum EscrowCommand {
    /// Create an escrow in CREATED status (signed by the depositor).
    Init {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Beneficiary (address or wallet name).
        #[arg(long)]
        beneficiary: String,
        /// Arbiter (address or wallet name).
        #[arg(long)]
        arbiter: String,
        /// Token mint.
        #[arg(long)]
        mint: Address,
        /// Quantity to escrow, in base units.
        #[arg(long)]
        amount: u64,
        /// Slot from which anyone may trigger release.
        #[arg(long)]
        auto_release_slot: Option<Slot>,
    },

    /// Deposit the escrowed amount into the vault (CREATED → FUNDED).
    Fund {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Depositor's source token account.
        #[arg(long)]
        from: Address,
    },

    /// Pay the vault out to the beneficiary (FUNDED → RELEASED).
    Release {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Beneficiary's destination token account.
        #[arg(long)]
        to: Address,
        /// Signing wallet; defaults to the depositor. Anyone may sign once
        /// the auto-release slot is reached.
        #[arg(long)]
        signer: Option<String>,
    },

    /// Raise a dispute (depositor or beneficiary).
    Dispute {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Reason, at most 128 bytes.
        #[arg(long)]
        reason: String,
        /// Signing wallet; defaults to the depositor.
        #[arg(long)]
        signer: Option<String>,
    },

    /// Arbiter settles a dispute.
    Resolve {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Arbiter wallet.
        #[arg(long)]
        signer: String,
        /// Destination token account.
        #[arg(long)]
        to: Address,
        /// Refund the depositor instead of paying the beneficiary.
        #[arg(long)]
        refund: bool,
    },

    /// Abandon a never-funded escrow (CREATED → CANCELLED).
    Cancel {
        #[command(flatten)]
        escrow: EscrowRef,
    },

    /// Remove a terminal escrow and its empty vault.
    Close {
        #[command(flatten)]
        escrow: EscrowRef,
    },

    /// Print every field of an escrow record.
    View {
        #[command(flatten)]
        escrow: EscrowRef,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the derived escrow, vault, and vault-authority addresses.
    Derive {
        #[command(flatten)]
        escrow: EscrowRef,
    },
}

/// Execute an escrow subcommand.
pub fn run_escrow(command: &EscrowCommand, config: &CliConfig) -> Result<u8> {
    let wallets = &config.wallet_dir;
    match command {
        EscrowCommand::Init {
            escrow,
            beneficiary,
            arbiter,
            mint,
            amount,
            auto_release_slot,
        } => {
            let depositor = load_keypair(&escrow.depositor, wallets)?;
            let addrs = derive(config, &depositor.address(), escrow.id)?;
            let instruction = Instruction::Initialize {
                accounts: InitializeAccounts {
                    escrow: addrs.escrow.address,
                    vault: addrs.vault.address,
                    beneficiary: resolve_address(beneficiary, wallets)?,
                    arbiter: resolve_address(arbiter, wallets)?,
                    mint: *mint,
                },
                escrow_id: escrow.id,
                amount: *amount,
                auto_release_slot: *auto_release_slot,
            };
            submit(config, &depositor, instruction)
        }

        EscrowCommand::Fund { escrow, from } => {
            let depositor = load_keypair(&escrow.depositor, wallets)?;
            let addrs = derive(config, &depositor.address(), escrow.id)?;
            let instruction = Instruction::Fund {
                accounts: FundAccounts {
                    escrow: addrs.escrow.address,
                    vault: addrs.vault.address,
                    depositor_token: *from,
                },
            };
            submit(config, &depositor, instruction)
        }

        EscrowCommand::Release { escrow, to, signer } => {
            let signer = load_keypair(signer.as_deref().unwrap_or(&escrow.depositor), wallets)?;
            let addrs = derive_ref(config, escrow)?;
            let instruction = Instruction::Release {
                accounts: ReleaseAccounts {
                    escrow: addrs.escrow.address,
                    vault: addrs.vault.address,
                    beneficiary_token: *to,
                },
            };
            submit(config, &signer, instruction)
        }

        EscrowCommand::Dispute {
            escrow,
            reason,
            signer,
        } => {
            let signer = load_keypair(signer.as_deref().unwrap_or(&escrow.depositor), wallets)?;
            let addrs = derive_ref(config, escrow)?;
            let instruction = Instruction::Dispute {
                escrow: addrs.escrow.address,
                reason: reason.clone(),
            };
            submit(config, &signer, instruction)
        }

        EscrowCommand::Resolve {
            escrow,
            signer,
            to,
            refund,
        } => {
            let signer = load_keypair(signer, wallets)?;
            let addrs = derive_ref(config, escrow)?;
            let instruction = Instruction::ResolveDispute {
                accounts: ResolveAccounts {
                    escrow: addrs.escrow.address,
                    vault: addrs.vault.address,
                    destination: *to,
                },
                refund_to_depositor: *refund,
            };
            submit(config, &signer, instruction)
        }

        EscrowCommand::Cancel { escrow } => {
            let depositor = load_keypair(&escrow.depositor, wallets)?;
            let addrs = derive(config, &depositor.address(), escrow.id)?;
            let instruction = Instruction::Cancel {
                escrow: addrs.escrow.address,
            };
            submit(config, &depositor, instruction)
        }

        EscrowCommand::Close { escrow } => {
            let depositor = load_keypair(&escrow.depositor, wallets)?;
            let addrs = derive(config, &depositor.address(), escrow.id)?;
            let instruction = Instruction::Close {
                accounts: CloseAccounts {
                    escrow: addrs.escrow.address,
                    vault: addrs.vault.address,
                },
            };
            submit(config, &depositor, instruction)
        }

        EscrowCommand::View { escrow, json } => {
            let addrs = derive_ref(config, escrow)?;
            let ledger = load_ledger(&config.ledger_path)?;
            let address = addrs.escrow.address;
            let Some(record) = ledger.escrow(&address).context("corrupt escrow account")? else {
                bail!("escrow not found: {address}");
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                let vault_balance = ledger.balance(&record.vault);
                print!("{}", render_record(&address, &record, vault_balance));
            }
            Ok(0)
        }

        EscrowCommand::Derive { escrow } => {
            let addrs = derive_ref(config, escrow)?;
            println!("escrow:          {} (bump {})", addrs.escrow.address, addrs.escrow.bump);
            println!("vault:           {} (bump {})", addrs.vault.address, addrs.vault.bump);
            println!(
                "vault authority: {} (bump {})",
                addrs.vault_authority.address, addrs.vault_authority.bump
            );
            Ok(0)
        }
    }
}

fn derive(config: &CliConfig, depositor: &Address, escrow_id: u64) -> Result<EscrowAddresses> {
    EscrowAddresses::derive(depositor, escrow_id, &config.program_id()?)
        .context("address derivation failed")
}

fn derive_ref(config: &CliConfig, escrow: &EscrowRef) -> Result<EscrowAddresses> {
    let depositor = resolve_address(&escrow.depositor, &config.wallet_dir)?;
    derive(config, &depositor, escrow.id)
}

/// Sign `instruction` at the current slot, submit it, and persist the
/// ledger on success.
fn submit(config: &CliConfig, signer: &Keypair, instruction: Instruction) -> Result<u8> {
    let path = &config.ledger_path;
    let mut ledger = load_ledger(path)?;
    let operation = instruction.name();
    let escrow = instruction.escrow();
    let tx = Transaction::new(instruction, ledger.slot(), signer)?;
    let receipt = ledger
        .submit(&tx)
        .with_context(|| format!("{operation} rejected for escrow {escrow}"))?;
    save_ledger(path, &ledger)?;
    print!("{}", render_receipt(&receipt));
    Ok(0)
}

/// Text shown after a committed transition.
pub fn render_receipt(receipt: &TransactionReceipt) -> String {
    let mut out = format!(
        "status:      {}\ntransaction: {}\n",
        receipt.status, receipt.transaction_id
    );
    if receipt.transferred > 0 {
        out.push_str(&format!("transferred: {}\n", receipt.transferred));
    }
    if receipt.closed {
        out.push_str("closed:      true\n");
    }
    out
}

/// Every record field, one per line.
pub fn render_record(
    address: &Address,
    record: &EscrowRecord,
    vault_balance: Option<u64>,
) -> String {
    let optional = |v: Option<Slot>| v.map_or_else(|| "none".to_string(), |s| s.to_string());
    let lines = [
        ("escrow", address.to_string()),
        ("escrow_id", record.escrow_id.to_string()),
        ("depositor", record.depositor.to_string()),
        ("beneficiary", record.beneficiary.to_string()),
        ("arbiter", record.arbiter.to_string()),
        ("mint", record.mint.to_string()),
        ("vault", record.vault.to_string()),
        ("amount", record.amount.to_string()),
        ("status", record.status.to_string()),
        ("auto_release_slot", optional(record.auto_release_slot)),
        ("created_at_slot", record.created_at_slot.to_string()),
        ("updated_at_slot", record.updated_at_slot.to_string()),
        ("funded_at_slot", optional(record.funded_at_slot)),
        (
            "dispute_reason",
            record.dispute_reason.clone().unwrap_or_else(|| "none".to_string()),
        ),
        ("bump", record.bump.to_string()),
        ("vault_authority_bump", record.vault_authority_bump.to_string()),
        ("vault_balance", optional(vault_balance)),
    ];
    lines
        .iter()
        .map(|(name, value)| format!("{name:<21} {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{save_keypair, wallet_path};
    use escrow_engine::LocalLedger;
    use escrow_state::EscrowStatus;
    use std::path::Path;

    struct Env {
        _dir: tempfile::TempDir,
        config: CliConfig,
        mint: Address,
        depositor_token: Address,
        beneficiary_token: Address,
    }

    fn env() -> Env {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            ledger_path: dir.path().join("ledger.json"),
            wallet_dir: dir.path().join("wallets"),
            program_id: None,
        };
        let wallets = [("depositor", 1u8), ("beneficiary", 2), ("arbiter", 3), ("issuer", 4)];
        for (name, seed) in wallets {
            let kp = Keypair::from_seed(&[seed; 32]);
            save_keypair(&wallet_path(&config.wallet_dir, name).unwrap(), &kp).unwrap();
        }
        let issuer = Keypair::from_seed(&[4; 32]);
        let mut ledger = LocalLedger::new(config.program_id().unwrap());
        let mint = ledger.create_mint(&issuer.address(), 6);
        let depositor_token = ledger
            .create_token_account(&Keypair::from_seed(&[1; 32]).address(), &mint)
            .unwrap();
        let beneficiary_token = ledger
            .create_token_account(&Keypair::from_seed(&[2; 32]).address(), &mint)
            .unwrap();
        ledger.mint_to(&mint, &issuer, &depositor_token, 1_000).unwrap();
        save_ledger(&config.ledger_path, &ledger).unwrap();
        Env {
            _dir: dir,
            config,
            mint,
            depositor_token,
            beneficiary_token,
        }
    }

    fn escrow_ref(id: u64) -> EscrowRef {
        EscrowRef {
            depositor: "depositor".to_string(),
            id,
        }
    }

    fn record(env: &Env, id: u64) -> Option<EscrowRecord> {
        let addrs = derive_ref(&env.config, &escrow_ref(id)).unwrap();
        load_ledger(&env.config.ledger_path)
            .unwrap()
            .escrow(&addrs.escrow.address)
            .unwrap()
    }

    fn balance(path: &Path, account: &Address) -> Option<u64> {
        load_ledger(path).unwrap().balance(account)
    }

    #[test]
    fn init_fund_release_through_cli() {
        let env = env();
        let init = EscrowCommand::Init {
            escrow: escrow_ref(1),
            beneficiary: "beneficiary".to_string(),
            arbiter: "arbiter".to_string(),
            mint: env.mint,
            amount: 1_000,
            auto_release_slot: None,
        };
        assert_eq!(run_escrow(&init, &env.config).unwrap(), 0);
        assert_eq!(record(&env, 1).unwrap().status, EscrowStatus::Created);

        let fund = EscrowCommand::Fund {
            escrow: escrow_ref(1),
            from: env.depositor_token,
        };
        run_escrow(&fund, &env.config).unwrap();
        assert_eq!(record(&env, 1).unwrap().status, EscrowStatus::Funded);

        let release = EscrowCommand::Release {
            escrow: escrow_ref(1),
            to: env.beneficiary_token,
            signer: None,
        };
        run_escrow(&release, &env.config).unwrap();
        assert_eq!(record(&env, 1).unwrap().status, EscrowStatus::Released);
        assert_eq!(
            balance(&env.config.ledger_path, &env.beneficiary_token),
            Some(1_000)
        );

        let close = EscrowCommand::Close {
            escrow: escrow_ref(1),
        };
        run_escrow(&close, &env.config).unwrap();
        assert!(record(&env, 1).is_none());
    }

    #[test]
    fn rejected_transition_leaves_ledger_file_unchanged() {
        let env = env();
        let before = std::fs::read_to_string(&env.config.ledger_path).unwrap();
        let cancel = EscrowCommand::Cancel {
            escrow: escrow_ref(9),
        };
        let err = run_escrow(&cancel, &env.config).unwrap_err();
        let escrow = derive_ref(&env.config, &escrow_ref(9)).unwrap().escrow.address;
        let message = format!("{err:#}");
        assert!(message.contains("cancel rejected"));
        assert!(message.contains(&escrow.to_string()));
        let after = std::fs::read_to_string(&env.config.ledger_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn beneficiary_cannot_release_early() {
        let env = env();
        let init = EscrowCommand::Init {
            escrow: escrow_ref(2),
            beneficiary: "beneficiary".to_string(),
            arbiter: "arbiter".to_string(),
            mint: env.mint,
            amount: 500,
            auto_release_slot: Some(10_000),
        };
        run_escrow(&init, &env.config).unwrap();
        let fund = EscrowCommand::Fund {
            escrow: escrow_ref(2),
            from: env.depositor_token,
        };
        run_escrow(&fund, &env.config).unwrap();
        let release = EscrowCommand::Release {
            escrow: escrow_ref(2),
            to: env.beneficiary_token,
            signer: Some("beneficiary".to_string()),
        };
        assert!(run_escrow(&release, &env.config).is_err());
        assert_eq!(record(&env, 2).unwrap().status, EscrowStatus::Funded);
    }

    #[test]
    fn render_record_lists_every_field() {
        let address = Address::new([9; 32]);
        let record = EscrowRecord {
            escrow_id: 7,
            depositor: Address::new([1; 32]),
            beneficiary: Address::new([2; 32]),
            arbiter: Address::new([3; 32]),
            mint: Address::new([4; 32]),
            vault: Address::new([5; 32]),
            amount: 1_000_000,
            status: EscrowStatus::Disputed,
            auto_release_slot: None,
            created_at_slot: 3,
            updated_at_slot: 8,
            funded_at_slot: Some(5),
            dispute_reason: Some("Service not delivered as agreed".to_string()),
            bump: 254,
            vault_authority_bump: 253,
        };
        let text = render_record(&address, &record, Some(0));
        for field in [
            "escrow_id",
            "depositor",
            "beneficiary",
            "arbiter",
            "mint",
            "vault",
            "amount",
            "status",
            "auto_release_slot",
            "created_at_slot",
            "updated_at_slot",
            "funded_at_slot",
            "dispute_reason",
            "vault_authority_bump",
        ] {
            assert!(text.contains(field), "missing {field}");
        }
        assert!(text.contains("DISPUTED"));
        assert!(text.contains("Service not delivered as agreed"));
        assert!(text.contains("1000000"));
    }
}
