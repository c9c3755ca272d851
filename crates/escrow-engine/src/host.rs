//! # Host Interfaces
//!
//! The two external collaborators the transition engine runs against:
//!
//! - [`ExecutionHost`]: program account storage, the slot clock, and
//!   address derivation for the running program.
//! - [`LedgerAssetService`]: token accounts and transfers between them.
//!
//! The engine is generic over both, so the same transition code runs
//! against [`LocalLedger`](crate::local::LocalLedger) in tests and the CLI
//! and against any other host that implements these traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use escrow_core::{find_address, Address, DerivationError, DerivedAddress, Slot};

use crate::authority::VaultAuthority;

// ── Execution host ─────────────────────────────────────────────────────

/// Program account storage and runtime context.
///
/// All accounts reachable through this trait are owned by the running
/// program. Writes are tentative until the host commits the transaction.
pub trait ExecutionHost {
    /// Identity of the running program.
    fn program_id(&self) -> Address;

    /// Current ledger time.
    fn current_slot(&self) -> Slot;

    /// Data of a program account, if it exists.
    fn load_account(&self, address: &Address) -> Option<Vec<u8>>;

    /// Create a new program account.
    fn create_account(&mut self, address: Address, data: Vec<u8>) -> Result<(), HostError>;

    /// Overwrite an existing program account. The size must not change.
    fn store_account(&mut self, address: &Address, data: Vec<u8>) -> Result<(), HostError>;

    /// Remove a program account, returning its last data.
    fn close_account(&mut self, address: &Address) -> Result<Vec<u8>, HostError>;

    /// Derive a program address for `seeds` under this program.
    fn derive_address(&self, seeds: &[&[u8]]) -> Result<DerivedAddress, DerivationError> {
        let (address, bump) = find_address(seeds, &self.program_id())?;
        Ok(DerivedAddress { address, bump })
    }
}

/// Errors from program account storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Account creation targeted an address that is already in use.
    #[error("account {0} already exists")]
    AccountAlreadyExists(Address),

    /// No account at the address.
    #[error("account {0} not found")]
    AccountNotFound(Address),

    /// A store would resize the account.
    #[error("account {address} is {expected} bytes, write was {actual}")]
    SizeMismatch {
        /// The account address.
        address: Address,
        /// Allocated size.
        expected: usize,
        /// Size of the rejected write.
        actual: usize,
    },
}

// ── Ledger asset service ───────────────────────────────────────────────

/// A fungible-token holding account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Token type held.
    pub mint: Address,
    /// Principal allowed to move the balance.
    pub owner: Address,
    /// Current balance.
    pub amount: u64,
}

/// Who authorizes a debit from a token account.
#[derive(Debug, Clone, Copy)]
pub enum Authority<'a> {
    /// A principal that signed the enclosing transaction.
    Signer(Address),
    /// The program's keyless authority over one vault.
    Vault(&'a VaultAuthority),
}

impl Authority<'_> {
    /// The address acting as owner.
    pub fn address(&self) -> Address {
        match self {
            Self::Signer(address) => *address,
            Self::Vault(vault) => vault.address(),
        }
    }
}

/// Token accounts and balance movement.
pub trait LedgerAssetService {
    /// Look up a token account.
    fn token_account(&self, address: &Address) -> Option<TokenAccount>;

    /// Create an empty token account at a caller-chosen address.
    fn open_account(&mut self, address: Address, mint: Address, owner: Address)
        -> Result<(), AssetError>;

    /// Move `amount` tokens from `from` to `to`. `authority` must own `from`.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        authority: &Authority<'_>,
        amount: u64,
    ) -> Result<(), AssetError>;

    /// Remove an empty token account. `authority` must own it.
    fn close_account(&mut self, address: &Address, authority: &Authority<'_>)
        -> Result<(), AssetError>;
}

/// Errors from the ledger asset service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Source balance is lower than the transfer amount.
    #[error("insufficient funds in {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Source token account.
        account: Address,
        /// Its balance.
        available: u64,
        /// Requested amount.
        requested: u64,
    },

    /// No token account at the address.
    #[error("invalid token account {0}")]
    InvalidAccount(Address),

    /// No mint at the address.
    #[error("unknown mint {0}")]
    UnknownMint(Address),

    /// Source and destination hold different tokens.
    #[error("mint mismatch: {from} holds {from_mint}, {to} holds {to_mint}")]
    MintMismatch {
        /// Source account.
        from: Address,
        /// Source mint.
        from_mint: Address,
        /// Destination account.
        to: Address,
        /// Destination mint.
        to_mint: Address,
    },

    /// The authority does not own the account it tried to debit.
    #[error("{authority} is not the owner of {account} (owner {owner})")]
    OwnerMismatch {
        /// The debited account.
        account: Address,
        /// Its owner.
        owner: Address,
        /// The authority presented.
        authority: Address,
    },

    /// An off-curve address was presented as a transaction signer.
    #[error("{0} has no private key and cannot sign")]
    KeylessSigner(Address),

    /// Account creation targeted an address that is already in use.
    #[error("token account {0} already exists")]
    AccountAlreadyExists(Address),

    /// Only empty accounts can be closed.
    #[error("token account {account} still holds {amount}")]
    NonZeroBalance {
        /// The account.
        account: Address,
        /// Its balance.
        amount: u64,
    },

    /// A balance or supply would exceed `u64::MAX`.
    #[error("token amount overflow")]
    Overflow,
}
