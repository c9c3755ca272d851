#![deny(missing_docs)]

//! # escrow-engine — Escrow Transitions over a Host Ledger
//!
//! Executes the seven escrow transitions against two host interfaces:
//!
//! - [`ExecutionHost`] stores program accounts and supplies the program
//!   identity and the current slot.
//! - [`LedgerAssetService`] holds token accounts and moves balances.
//!
//! [`process_instruction`] is the single entry point. Every transition
//! validates in the same order (record derivation, signer authority,
//! status, supplied accounts) and performs no writes until validation
//! passes. Vault debits require the keyless [`VaultAuthority`], which only
//! this crate can construct.
//!
//! [`LocalLedger`] implements both interfaces in memory, adds signature
//! verification and replay protection, and commits each transaction
//! atomically.
//!
//! ## Security Invariant
//!
//! The engine trusts nothing in an instruction beyond the signer identity.
//! Every supplied address is re-derived or compared against the stored
//! record before use.

pub mod authority;
pub mod error;
pub mod host;
pub mod instruction;
pub mod local;
pub mod processor;
pub mod receipt;
pub mod timeout;

pub use authority::VaultAuthority;
pub use error::{ErrorKind, EscrowError};
pub use host::{AssetError, Authority, ExecutionHost, HostError, LedgerAssetService, TokenAccount};
pub use instruction::{
    CloseAccounts, FundAccounts, InitializeAccounts, Instruction, Message, ReleaseAccounts,
    ResolveAccounts, Transaction, TransactionError,
};
pub use local::{LedgerError, LocalLedger, Mint};
pub use processor::{load_escrow, process_instruction, Outcome};
pub use receipt::TransactionReceipt;
pub use timeout::{authorize_release, permits_release, ReleaseAuthorization};

use escrow_core::{sha256, Address, Slot};

/// How many slots a transaction's `recent_slot` may trail the ledger clock.
pub const RECENT_SLOT_WINDOW: Slot = 150;

/// Program identity used when none is configured.
pub fn default_program_id() -> Address {
    Address::new(sha256(b"escrow-engine"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_id_is_stable() {
        assert_eq!(default_program_id(), default_program_id());
        assert_ne!(default_program_id(), Address::default());
    }
}
