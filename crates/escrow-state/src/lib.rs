//! # escrow-state — Escrow Record and Status Machine
//!
//! The persisted state of one escrow agreement and the rules that govern
//! how it may change.
//!
//! - **Status** (`status.rs`): the closed status enumeration and its
//!   transition graph. `Released` and `Cancelled` are terminal.
//! - **Record** (`record.rs`): the escrow record, its lifecycle methods,
//!   and invariant checks.
//! - **Layout** (`layout.rs`): the fixed-width binary encoding stored in
//!   the record's program account.
//!
//! This crate performs no authorization and moves no tokens. Signer
//! checks and vault custody belong to `escrow-engine`.

#![deny(missing_docs)]

pub mod error;
pub mod layout;
pub mod record;
pub mod status;

pub use error::{LayoutError, StateError};
pub use layout::{escrow_discriminator, ESCROW_ACCOUNT_LEN, ESCROW_ACCOUNT_NAME};
pub use record::{EscrowRecord, EscrowTerms, MAX_DISPUTE_REASON_LEN};
pub use status::EscrowStatus;
