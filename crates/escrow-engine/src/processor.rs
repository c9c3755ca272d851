//! # Transition Engine
//!
//! Executes one [`Instruction`] on behalf of a verified signer against an
//! [`ExecutionHost`] and a [`LedgerAssetService`].
//!
//! Every operation validates in a fixed order before any effect:
//!
//! 1. load the escrow record and confirm its address re-derives from the
//!    stored `(depositor, escrow_id, bump)`,
//! 2. signer authority,
//! 3. current status,
//! 4. supplied accounts (vault address, token account owner and mint).
//!
//! Only then are tokens moved and the record written. A failure at any
//! point returns an [`EscrowError`]; the host discards every tentative
//! write of the transaction.
//!
//! ## Security Invariant
//!
//! The vault is debited only with a [`VaultAuthority`] recomputed from the
//! record, and always for its full balance, so the vault holds `amount`
//! exactly while `Funded` and zero in every other status.

use serde::{Deserialize, Serialize};

use escrow_core::{Address, EscrowAddresses, Slot, ESCROW_SEED, VAULT_AUTHORITY_SEED, VAULT_SEED};
use escrow_state::{EscrowRecord, EscrowStatus, EscrowTerms};

use crate::authority::VaultAuthority;
use crate::error::EscrowError;
use crate::host::{Authority, ExecutionHost, LedgerAssetService, TokenAccount};
use crate::instruction::{
    CloseAccounts, FundAccounts, InitializeAccounts, Instruction, ReleaseAccounts,
    ResolveAccounts,
};
use crate::timeout::{authorize_release, ReleaseAuthorization};

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// The escrow record address.
    pub escrow: Address,
    /// Status after the transition. For `close`, the status at closing.
    pub status: EscrowStatus,
    /// Tokens moved by the transition.
    pub transferred: u64,
    /// Whether the record account was removed.
    pub closed: bool,
}

/// Execute `instruction` signed by `signer`.
pub fn process_instruction<H, A>(
    host: &mut H,
    assets: &mut A,
    signer: &Address,
    instruction: &Instruction,
) -> Result<Outcome, EscrowError>
where
    H: ExecutionHost,
    A: LedgerAssetService,
{
    tracing::debug!(operation = instruction.name(), %signer, "processing instruction");
    match instruction {
        Instruction::Initialize {
            accounts,
            escrow_id,
            amount,
            auto_release_slot,
        } => initialize(host, assets, signer, accounts, *escrow_id, *amount, *auto_release_slot),
        Instruction::Fund { accounts } => fund(host, assets, signer, accounts),
        Instruction::Release { accounts } => release(host, assets, signer, accounts),
        Instruction::Dispute { escrow, reason } => dispute(host, signer, escrow, reason),
        Instruction::ResolveDispute {
            accounts,
            refund_to_depositor,
        } => resolve_dispute(host, assets, signer, accounts, *refund_to_depositor),
        Instruction::Cancel { escrow } => cancel(host, signer, escrow),
        Instruction::Close { accounts } => close(host, assets, signer, accounts),
    }
}

// ── Operations ─────────────────────────────────────────────────────────

fn initialize<H: ExecutionHost, A: LedgerAssetService>(
    host: &mut H,
    assets: &mut A,
    depositor: &Address,
    accounts: &InitializeAccounts,
    escrow_id: u64,
    amount: u64,
    auto_release_slot: Option<Slot>,
) -> Result<Outcome, EscrowError> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount { amount });
    }

    let id = escrow_id.to_le_bytes();
    let escrow = host.derive_address(&[ESCROW_SEED, depositor.as_ref(), &id])?;
    if escrow.address != accounts.escrow {
        return Err(EscrowError::mismatch("escrow", &escrow.address, &accounts.escrow));
    }
    let vault = host.derive_address(&[VAULT_SEED, escrow.address.as_ref()])?;
    if vault.address != accounts.vault {
        return Err(EscrowError::mismatch("vault", &vault.address, &accounts.vault));
    }
    let authority = host.derive_address(&[VAULT_AUTHORITY_SEED, escrow.address.as_ref()])?;

    if host.load_account(&escrow.address).is_some() {
        return Err(EscrowError::AccountAlreadyInUse(escrow.address));
    }

    let slot = host.current_slot();
    if let Some(threshold) = auto_release_slot {
        if threshold <= slot {
            tracing::warn!(
                escrow = %escrow.address,
                auto_release_slot = threshold,
                slot,
                "auto-release slot already reached at initialization"
            );
        }
    }

    let record = EscrowRecord::create(
        EscrowTerms {
            escrow_id,
            depositor: *depositor,
            beneficiary: accounts.beneficiary,
            arbiter: accounts.arbiter,
            mint: accounts.mint,
            amount,
            auto_release_slot,
        },
        vault.address,
        escrow.bump,
        authority.bump,
        slot,
    )?;

    assets.open_account(vault.address, accounts.mint, authority.address)?;
    host.create_account(escrow.address, record.to_account_data()?)?;

    tracing::info!(
        escrow = %escrow.address,
        escrow_id,
        amount,
        status = %record.status,
        slot,
        "escrow initialized"
    );
    Ok(outcome(&escrow.address, &record, 0))
}

fn fund<H: ExecutionHost, A: LedgerAssetService>(
    host: &mut H,
    assets: &mut A,
    signer: &Address,
    accounts: &FundAccounts,
) -> Result<Outcome, EscrowError> {
    let mut record = load_escrow(host, &accounts.escrow)?;
    if *signer != record.depositor {
        return Err(EscrowError::unauthorized("fund", signer));
    }
    record.require_status("fund", &[EscrowStatus::Created])?;
    check_vault(&record, &accounts.vault)?;
    let source = token_account(assets, "depositor token", &accounts.depositor_token)?;
    check_token_account("depositor token", &source, &record.depositor, &record.mint)?;
    let balance = vault_balance(assets, &record)?;
    if balance != 0 {
        return Err(EscrowError::VaultNotEmpty {
            vault: record.vault,
            balance,
        });
    }

    assets.transfer(
        &accounts.depositor_token,
        &accounts.vault,
        &Authority::Signer(*signer),
        record.amount,
    )?;

    let slot = host.current_slot();
    record.fund(slot)?;
    store_escrow(host, &accounts.escrow, &record)?;

    tracing::info!(
        escrow = %accounts.escrow,
        amount = record.amount,
        status = %record.status,
        slot,
        "escrow funded"
    );
    Ok(outcome(&accounts.escrow, &record, record.amount))
}

fn release<H: ExecutionHost, A: LedgerAssetService>(
    host: &mut H,
    assets: &mut A,
    signer: &Address,
    accounts: &ReleaseAccounts,
) -> Result<Outcome, EscrowError> {
    let mut record = load_escrow(host, &accounts.escrow)?;
    let slot = host.current_slot();
    let authorization = authorize_release(&record, signer, slot)?;
    record.require_status("release", &[EscrowStatus::Funded])?;
    check_vault(&record, &accounts.vault)?;
    let destination = token_account(assets, "beneficiary token", &accounts.beneficiary_token)?;
    check_token_account("beneficiary token", &destination, &record.beneficiary, &record.mint)?;

    let authority = vault_authority(host, &accounts.escrow, &record)?;
    let moved = drain_vault(assets, &record, &accounts.beneficiary_token, &authority)?;

    record.release(slot)?;
    store_escrow(host, &accounts.escrow, &record)?;

    match authorization {
        ReleaseAuthorization::Depositor => tracing::info!(
            escrow = %accounts.escrow,
            amount = moved,
            status = %record.status,
            slot,
            "escrow released by depositor"
        ),
        ReleaseAuthorization::AutoRelease { threshold } => tracing::info!(
            escrow = %accounts.escrow,
            amount = moved,
            status = %record.status,
            slot,
            auto_release_slot = threshold,
            caller = %signer,
            "escrow auto-released"
        ),
    }
    Ok(outcome(&accounts.escrow, &record, moved))
}

fn dispute<H: ExecutionHost>(
    host: &mut H,
    signer: &Address,
    escrow: &Address,
    reason: &str,
) -> Result<Outcome, EscrowError> {
    let mut record = load_escrow(host, escrow)?;
    if *signer != record.depositor && *signer != record.beneficiary {
        return Err(EscrowError::unauthorized("dispute", signer));
    }
    let slot = host.current_slot();
    record.dispute(reason.to_string(), slot)?;
    store_escrow(host, escrow, &record)?;

    tracing::info!(
        escrow = %escrow,
        raised_by = %signer,
        reason,
        status = %record.status,
        slot,
        "escrow disputed"
    );
    Ok(outcome(escrow, &record, 0))
}

fn resolve_dispute<H: ExecutionHost, A: LedgerAssetService>(
    host: &mut H,
    assets: &mut A,
    signer: &Address,
    accounts: &ResolveAccounts,
    refund_to_depositor: bool,
) -> Result<Outcome, EscrowError> {
    let mut record = load_escrow(host, &accounts.escrow)?;
    if *signer != record.arbiter {
        return Err(EscrowError::unauthorized("resolve dispute", signer));
    }
    record.require_status("resolve dispute on", &[EscrowStatus::Disputed])?;
    check_vault(&record, &accounts.vault)?;
    let (role, recipient) = if refund_to_depositor {
        ("depositor token", record.depositor)
    } else {
        ("beneficiary token", record.beneficiary)
    };
    let destination = token_account(assets, role, &accounts.destination)?;
    check_token_account(role, &destination, &recipient, &record.mint)?;

    let slot = host.current_slot();
    let status = record.resolve(refund_to_depositor, slot)?;
    let moved = if vault_balance(assets, &record)? == 0 {
        0
    } else {
        let authority = vault_authority(host, &accounts.escrow, &record)?;
        drain_vault(assets, &record, &accounts.destination, &authority)?
    };
    store_escrow(host, &accounts.escrow, &record)?;

    tracing::info!(
        escrow = %accounts.escrow,
        refund_to_depositor,
        amount = moved,
        status = %status,
        slot,
        "escrow dispute resolved"
    );
    Ok(outcome(&accounts.escrow, &record, moved))
}

fn cancel<H: ExecutionHost>(
    host: &mut H,
    signer: &Address,
    escrow: &Address,
) -> Result<Outcome, EscrowError> {
    let mut record = load_escrow(host, escrow)?;
    if *signer != record.depositor {
        return Err(EscrowError::unauthorized("cancel", signer));
    }
    let slot = host.current_slot();
    record.cancel(slot)?;
    store_escrow(host, escrow, &record)?;

    tracing::info!(escrow = %escrow, status = %record.status, slot, "escrow cancelled");
    Ok(outcome(escrow, &record, 0))
}

fn close<H: ExecutionHost, A: LedgerAssetService>(
    host: &mut H,
    assets: &mut A,
    signer: &Address,
    accounts: &CloseAccounts,
) -> Result<Outcome, EscrowError> {
    let record = load_escrow(host, &accounts.escrow)?;
    if *signer != record.depositor {
        return Err(EscrowError::unauthorized("close", signer));
    }
    if !record.status.is_terminal() {
        return Err(EscrowError::InvalidState {
            operation: "close".to_string(),
            status: record.status,
        });
    }
    check_vault(&record, &accounts.vault)?;

    if assets.token_account(&record.vault).is_some() {
        let balance = vault_balance(assets, &record)?;
        if balance != 0 {
            return Err(EscrowError::VaultNotEmpty {
                vault: record.vault,
                balance,
            });
        }
        let authority = vault_authority(host, &accounts.escrow, &record)?;
        assets.close_account(&record.vault, &Authority::Vault(&authority))?;
    }
    host.close_account(&accounts.escrow)?;

    tracing::info!(
        escrow = %accounts.escrow,
        status = %record.status,
        slot = host.current_slot(),
        "escrow closed"
    );
    Ok(Outcome {
        escrow: accounts.escrow,
        status: record.status,
        transferred: 0,
        closed: true,
    })
}

// ── Validation helpers ─────────────────────────────────────────────────

/// Load and decode the record at `escrow`, confirming the address
/// re-derives from the record's own seeds and bump.
pub fn load_escrow<H: ExecutionHost>(
    host: &H,
    escrow: &Address,
) -> Result<EscrowRecord, EscrowError> {
    let data = host
        .load_account(escrow)
        .ok_or(EscrowError::AccountNotFound {
            account: "escrow",
            address: *escrow,
        })?;
    let record = EscrowRecord::from_account_data(&data)?;
    let derived = EscrowAddresses::verify_escrow(
        &record.depositor,
        record.escrow_id,
        record.bump,
        &host.program_id(),
    )?;
    if derived != *escrow {
        return Err(EscrowError::mismatch("escrow", &derived, escrow));
    }
    Ok(record)
}

fn store_escrow<H: ExecutionHost>(
    host: &mut H,
    escrow: &Address,
    record: &EscrowRecord,
) -> Result<(), EscrowError> {
    record.check_invariants()?;
    host.store_account(escrow, record.to_account_data()?)?;
    Ok(())
}

fn check_vault(record: &EscrowRecord, supplied: &Address) -> Result<(), EscrowError> {
    if record.vault != *supplied {
        return Err(EscrowError::mismatch("vault", &record.vault, supplied));
    }
    Ok(())
}

fn token_account<A: LedgerAssetService>(
    assets: &A,
    role: &'static str,
    address: &Address,
) -> Result<TokenAccount, EscrowError> {
    assets
        .token_account(address)
        .ok_or(EscrowError::AccountNotFound {
            account: role,
            address: *address,
        })
}

fn check_token_account(
    role: &'static str,
    account: &TokenAccount,
    owner: &Address,
    mint: &Address,
) -> Result<(), EscrowError> {
    if account.owner != *owner {
        return Err(EscrowError::mismatch(role, owner, &account.owner));
    }
    if account.mint != *mint {
        return Err(EscrowError::mismatch("mint", mint, &account.mint));
    }
    Ok(())
}

fn vault_authority<H: ExecutionHost>(
    host: &H,
    escrow: &Address,
    record: &EscrowRecord,
) -> Result<VaultAuthority, EscrowError> {
    VaultAuthority::for_escrow(escrow, record.vault_authority_bump, &host.program_id())
}

fn vault_balance<A: LedgerAssetService>(
    assets: &A,
    record: &EscrowRecord,
) -> Result<u64, EscrowError> {
    Ok(token_account(assets, "vault", &record.vault)?.amount)
}

/// Transfer the full vault balance to `destination`.
fn drain_vault<A: LedgerAssetService>(
    assets: &mut A,
    record: &EscrowRecord,
    destination: &Address,
    authority: &VaultAuthority,
) -> Result<u64, EscrowError> {
    let balance = vault_balance(assets, record)?;
    assets.transfer(&record.vault, destination, &Authority::Vault(authority), balance)?;
    Ok(balance)
}

fn outcome(escrow: &Address, record: &EscrowRecord, transferred: u64) -> Outcome {
    Outcome {
        escrow: *escrow,
        status: record.status,
        transferred,
        closed: false,
    }
}
