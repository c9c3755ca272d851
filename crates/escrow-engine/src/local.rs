//! # Local Ledger
//!
//! An in-memory ledger implementing both host interfaces: program account
//! storage, a token ledger with mints and token accounts, a slot clock,
//! signature verification, and a replay cache.
//!
//! [`LocalLedger::submit`] is atomic. The account store and token ledger
//! are snapshotted before the transition runs and restored on any error,
//! so a rejected transaction leaves no trace. Each committed transaction
//! advances the clock by one slot.
//!
//! The whole ledger is `Serialize + Deserialize` so the CLI can persist it
//! between invocations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use escrow_core::{Address, Keypair, Slot, TransactionId};
use escrow_state::{EscrowRecord, LayoutError};

use crate::error::EscrowError;
use crate::host::{
    AssetError, Authority, ExecutionHost, HostError, LedgerAssetService, TokenAccount,
};
use crate::instruction::{Transaction, TransactionError};
use crate::processor::process_instruction;
use crate::receipt::TransactionReceipt;
use crate::RECENT_SLOT_WINDOW;

/// Errors from [`LocalLedger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Signature or encoding failure.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The transaction was already committed.
    #[error("transaction {0} already processed")]
    Replay(TransactionId),

    /// `recent_slot` lies ahead of the ledger clock.
    #[error("recent slot {recent_slot} is ahead of current slot {current_slot}")]
    FutureSlot {
        /// Slot named by the message.
        recent_slot: Slot,
        /// Ledger clock.
        current_slot: Slot,
    },

    /// `recent_slot` is older than the replay window.
    #[error("recent slot {recent_slot} expired at current slot {current_slot} (window {window})")]
    Expired {
        /// Slot named by the message.
        recent_slot: Slot,
        /// Ledger clock.
        current_slot: Slot,
        /// Accepted age in slots.
        window: Slot,
    },

    /// The clock cannot move backwards.
    #[error("cannot warp from slot {current} back to {requested}")]
    SlotRegression {
        /// Ledger clock.
        current: Slot,
        /// Requested slot.
        requested: Slot,
    },

    /// The transition was rejected.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// A direct token operation was rejected.
    #[error(transparent)]
    Asset(#[from] AssetError),
}

// ── Program account store ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountStore {
    accounts: BTreeMap<Address, Vec<u8>>,
}

/// The store as seen by one executing transaction.
struct ProgramHost<'a> {
    program_id: Address,
    slot: Slot,
    store: &'a mut AccountStore,
}

impl ExecutionHost for ProgramHost<'_> {
    fn program_id(&self) -> Address {
        self.program_id
    }

    fn current_slot(&self) -> Slot {
        self.slot
    }

    fn load_account(&self, address: &Address) -> Option<Vec<u8>> {
        self.store.accounts.get(address).cloned()
    }

    fn create_account(&mut self, address: Address, data: Vec<u8>) -> Result<(), HostError> {
        if self.store.accounts.contains_key(&address) {
            return Err(HostError::AccountAlreadyExists(address));
        }
        self.store.accounts.insert(address, data);
        Ok(())
    }

    fn store_account(&mut self, address: &Address, data: Vec<u8>) -> Result<(), HostError> {
        let existing = self
            .store
            .accounts
            .get_mut(address)
            .ok_or(HostError::AccountNotFound(*address))?;
        if existing.len() != data.len() {
            return Err(HostError::SizeMismatch {
                address: *address,
                expected: existing.len(),
                actual: data.len(),
            });
        }
        *existing = data;
        Ok(())
    }

    fn close_account(&mut self, address: &Address) -> Result<Vec<u8>, HostError> {
        self.store
            .accounts
            .remove(address)
            .ok_or(HostError::AccountNotFound(*address))
    }
}

// ── Token ledger ───────────────────────────────────────────────────────

/// A token type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// Principal allowed to mint new supply.
    pub authority: Address,
    /// Display precision.
    pub decimals: u8,
    /// Total minted.
    pub supply: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenLedger {
    mints: BTreeMap<Address, Mint>,
    accounts: BTreeMap<Address, TokenAccount>,
}

impl TokenLedger {
    fn check_authority(
        account: &Address,
        owner: &Address,
        authority: &Authority<'_>,
    ) -> Result<(), AssetError> {
        if let Authority::Signer(signer) = authority {
            if !signer.is_on_curve() {
                return Err(AssetError::KeylessSigner(*signer));
            }
        }
        if authority.address() != *owner {
            return Err(AssetError::OwnerMismatch {
                account: *account,
                owner: *owner,
                authority: authority.address(),
            });
        }
        Ok(())
    }
}

impl LedgerAssetService for TokenLedger {
    fn token_account(&self, address: &Address) -> Option<TokenAccount> {
        self.accounts.get(address).cloned()
    }

    fn open_account(
        &mut self,
        address: Address,
        mint: Address,
        owner: Address,
    ) -> Result<(), AssetError> {
        if !self.mints.contains_key(&mint) {
            return Err(AssetError::UnknownMint(mint));
        }
        if self.accounts.contains_key(&address) {
            return Err(AssetError::AccountAlreadyExists(address));
        }
        self.accounts.insert(
            address,
            TokenAccount {
                mint,
                owner,
                amount: 0,
            },
        );
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        authority: &Authority<'_>,
        amount: u64,
    ) -> Result<(), AssetError> {
        let source = self
            .accounts
            .get(from)
            .ok_or(AssetError::InvalidAccount(*from))?;
        let destination = self
            .accounts
            .get(to)
            .ok_or(AssetError::InvalidAccount(*to))?;
        if source.mint != destination.mint {
            return Err(AssetError::MintMismatch {
                from: *from,
                from_mint: source.mint,
                to: *to,
                to_mint: destination.mint,
            });
        }
        Self::check_authority(from, &source.owner, authority)?;
        if source.amount < amount {
            return Err(AssetError::InsufficientFunds {
                account: *from,
                available: source.amount,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = destination
            .amount
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;

        if let Some(source) = self.accounts.get_mut(from) {
            source.amount -= amount;
        }
        if let Some(destination) = self.accounts.get_mut(to) {
            destination.amount = credited;
        }
        Ok(())
    }

    fn close_account(
        &mut self,
        address: &Address,
        authority: &Authority<'_>,
    ) -> Result<(), AssetError> {
        let account = self
            .accounts
            .get(address)
            .ok_or(AssetError::InvalidAccount(*address))?;
        Self::check_authority(address, &account.owner, authority)?;
        if account.amount != 0 {
            return Err(AssetError::NonZeroBalance {
                account: *address,
                amount: account.amount,
            });
        }
        self.accounts.remove(address);
        Ok(())
    }
}

// ── Ledger ─────────────────────────────────────────────────────────────

/// In-memory ledger hosting the escrow program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLedger {
    program_id: Address,
    slot: Slot,
    accounts: AccountStore,
    tokens: TokenLedger,
    /// Committed transaction ids and their `recent_slot`, kept while the
    /// transaction could still pass the freshness check.
    recent_transactions: BTreeMap<TransactionId, Slot>,
}

impl LocalLedger {
    /// An empty ledger at slot 0 hosting `program_id`.
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            slot: 0,
            accounts: AccountStore::default(),
            tokens: TokenLedger::default(),
            recent_transactions: BTreeMap::new(),
        }
    }

    /// The hosted program.
    pub fn program_id(&self) -> Address {
        self.program_id
    }

    /// Current slot.
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Advance the clock by `slots`.
    pub fn advance_slots(&mut self, slots: Slot) -> Slot {
        self.slot = self.slot.saturating_add(slots);
        self.prune_recent();
        self.slot
    }

    /// Move the clock forward to `slot`.
    pub fn warp_to_slot(&mut self, slot: Slot) -> Result<(), LedgerError> {
        if slot < self.slot {
            return Err(LedgerError::SlotRegression {
                current: self.slot,
                requested: slot,
            });
        }
        self.slot = slot;
        self.prune_recent();
        Ok(())
    }

    /// Verify and execute a signed transaction.
    ///
    /// # Errors
    ///
    /// Signature, replay, and freshness failures are checked first. Any
    /// transition error rolls back every write of the transaction.
    pub fn submit(&mut self, tx: &Transaction) -> Result<TransactionReceipt, LedgerError> {
        let id = tx.id();
        let operation = tx.message.instruction.name();
        match self.execute(tx, id) {
            Ok(receipt) => {
                tracing::info!(
                    transaction = %id,
                    operation,
                    escrow = %receipt.escrow,
                    status = %receipt.status,
                    slot = receipt.slot,
                    "transaction committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(
                    transaction = %id,
                    operation,
                    escrow = %tx.message.instruction.escrow(),
                    signer = %tx.message.signer,
                    error = %e,
                    "transaction rejected"
                );
                Err(e)
            }
        }
    }

    fn execute(
        &mut self,
        tx: &Transaction,
        id: TransactionId,
    ) -> Result<TransactionReceipt, LedgerError> {
        tx.verify()?;
        if self.recent_transactions.contains_key(&id) {
            return Err(LedgerError::Replay(id));
        }
        let recent_slot = tx.message.recent_slot;
        if recent_slot > self.slot {
            return Err(LedgerError::FutureSlot {
                recent_slot,
                current_slot: self.slot,
            });
        }
        if self.slot - recent_slot > RECENT_SLOT_WINDOW {
            return Err(LedgerError::Expired {
                recent_slot,
                current_slot: self.slot,
                window: RECENT_SLOT_WINDOW,
            });
        }

        let accounts_snapshot = self.accounts.clone();
        let tokens_snapshot = self.tokens.clone();
        let mut host = ProgramHost {
            program_id: self.program_id,
            slot: self.slot,
            store: &mut self.accounts,
        };
        let result = process_instruction(
            &mut host,
            &mut self.tokens,
            &tx.message.signer,
            &tx.message.instruction,
        );
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.accounts = accounts_snapshot;
                self.tokens = tokens_snapshot;
                return Err(e.into());
            }
        };

        self.recent_transactions.insert(id, recent_slot);
        let receipt = TransactionReceipt::new(
            id,
            self.slot,
            tx.message.instruction.name(),
            tx.message.signer,
            outcome,
        );
        self.advance_slots(1);
        Ok(receipt)
    }

    fn prune_recent(&mut self) {
        let slot = self.slot;
        self.recent_transactions
            .retain(|_, recent| slot - (*recent).min(slot) <= RECENT_SLOT_WINDOW);
    }

    // ── Program accounts ───────────────────────────────────────────────

    /// Decode the escrow record at `address`, if the account exists.
    pub fn escrow(&self, address: &Address) -> Result<Option<EscrowRecord>, LayoutError> {
        self.accounts
            .accounts
            .get(address)
            .map(|data| EscrowRecord::from_account_data(data))
            .transpose()
    }

    /// Raw data of a program account.
    pub fn account_data(&self, address: &Address) -> Option<&[u8]> {
        self.accounts.accounts.get(address).map(Vec::as_slice)
    }

    // ── Tokens ─────────────────────────────────────────────────────────

    /// Create a mint controlled by `authority` and return its address.
    pub fn create_mint(&mut self, authority: &Address, decimals: u8) -> Address {
        let address = Keypair::generate().address();
        self.tokens.mints.insert(
            address,
            Mint {
                authority: *authority,
                decimals,
                supply: 0,
            },
        );
        tracing::debug!(mint = %address, %authority, decimals, "mint created");
        address
    }

    /// Look up a mint.
    pub fn mint(&self, address: &Address) -> Option<&Mint> {
        self.tokens.mints.get(address)
    }

    /// Create an empty token account for `owner` and return its address.
    pub fn create_token_account(
        &mut self,
        owner: &Address,
        mint: &Address,
    ) -> Result<Address, AssetError> {
        let address = Keypair::generate().address();
        self.tokens.open_account(address, *mint, *owner)?;
        tracing::debug!(account = %address, %owner, %mint, "token account created");
        Ok(address)
    }

    /// Mint new supply into `destination`, signed by the mint authority.
    pub fn mint_to(
        &mut self,
        mint: &Address,
        authority: &Keypair,
        destination: &Address,
        amount: u64,
    ) -> Result<(), AssetError> {
        let info = self
            .tokens
            .mints
            .get(mint)
            .ok_or(AssetError::UnknownMint(*mint))?;
        if authority.address() != info.authority {
            return Err(AssetError::OwnerMismatch {
                account: *mint,
                owner: info.authority,
                authority: authority.address(),
            });
        }
        let account = self
            .tokens
            .accounts
            .get(destination)
            .ok_or(AssetError::InvalidAccount(*destination))?;
        if account.mint != *mint {
            return Err(AssetError::MintMismatch {
                from: *mint,
                from_mint: *mint,
                to: *destination,
                to_mint: account.mint,
            });
        }
        let supply = info.supply.checked_add(amount).ok_or(AssetError::Overflow)?;
        let balance = account.amount.checked_add(amount).ok_or(AssetError::Overflow)?;

        if let Some(info) = self.tokens.mints.get_mut(mint) {
            info.supply = supply;
        }
        if let Some(account) = self.tokens.accounts.get_mut(destination) {
            account.amount = balance;
        }
        tracing::debug!(%mint, account = %destination, amount, "tokens minted");
        Ok(())
    }

    /// Transfer between token accounts, signed by the source owner.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        owner: &Keypair,
        amount: u64,
    ) -> Result<(), AssetError> {
        self.tokens
            .transfer(from, to, &Authority::Signer(owner.address()), amount)
    }

    /// Close an empty token account, signed by its owner.
    pub fn close_token_account(
        &mut self,
        address: &Address,
        owner: &Keypair,
    ) -> Result<(), AssetError> {
        self.tokens
            .close_account(address, &Authority::Signer(owner.address()))
    }

    /// Look up a token account.
    pub fn token_account(&self, address: &Address) -> Option<TokenAccount> {
        self.tokens.token_account(address)
    }

    /// Balance of a token account.
    pub fn balance(&self, address: &Address) -> Option<u64> {
        self.tokens.accounts.get(address).map(|a| a.amount)
    }
}
