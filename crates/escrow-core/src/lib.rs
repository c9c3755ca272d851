#![deny(missing_docs)]

//! # escrow-core — Foundational Types for the Escrow Engine
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal crate dependencies; its external stack is `serde`,
//! `thiserror`, `sha2`, `ed25519-dalek`, and `rand`.
//!
//! ## Design Principles
//!
//! 1. **One address type.** Principals, mints, token accounts, and
//!    program-derived addresses are all [`Address`] values. Whether an
//!    address can sign is a property of the bytes (on or off the Ed25519
//!    curve), not of the type.
//!
//! 2. **Derivation is pure.** [`find_address`] and [`create_address`]
//!    depend only on their inputs. The escrow-specific seed schemes live in
//!    [`EscrowAddresses`] so that no caller assembles seeds by hand.
//!
//! 3. **Keys never serialize.** [`Keypair`] has no `Serialize` impl; only
//!    its public [`Address`] and produced [`Signature`]s cross boundaries.

pub mod address;
pub mod derivation;
pub mod digest;
pub mod error;
pub mod keypair;

pub use address::Address;
pub use derivation::{
    create_address, find_address, DerivedAddress, EscrowAddresses, ESCROW_SEED, MAX_SEEDS,
    MAX_SEED_LEN, VAULT_AUTHORITY_SEED, VAULT_SEED,
};
pub use digest::{account_discriminator, sha256, TransactionId};
pub use error::{CryptoError, DerivationError, ValidationError};
pub use keypair::{Keypair, Signature};

/// Ledger time: a monotonically increasing logical clock maintained by
/// the execution host.
pub type Slot = u64;
