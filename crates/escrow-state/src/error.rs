//! # State Error Types
//!
//! Rejections raised by the escrow record itself. Every variant carries
//! the operation and status at the time of failure.

use thiserror::Error;

use crate::status::EscrowStatus;

/// Errors arising from escrow record transitions and invariant checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Escrow amount must be strictly positive.
    #[error("escrow amount must be positive, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: u64,
    },

    /// The operation requires a different current status.
    #[error("cannot {operation} an escrow in status {status}")]
    InvalidState {
        /// The attempted operation (e.g. "fund", "release").
        operation: String,
        /// The current escrow status.
        status: EscrowStatus,
    },

    /// `from → to` is not an edge of the status graph.
    #[error("invalid escrow transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: EscrowStatus,
        /// Attempted target status.
        to: EscrowStatus,
    },

    /// Dispute reason exceeds the persisted field width.
    #[error("dispute reason is {len} bytes long (max {max})")]
    DisputeReasonTooLong {
        /// Length of the rejected reason in bytes.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The beneficiary cannot be paid from an escrow that was never funded.
    #[error("escrow was never funded; only a refund can resolve it")]
    NeverFunded,

    /// Ledger time went backwards relative to the record.
    #[error("slot {slot} precedes last update at slot {updated_at}")]
    SlotRegression {
        /// The record's `updated_at_slot`.
        updated_at: u64,
        /// The slot supplied for the new transition.
        slot: u64,
    },

    /// A lifecycle invariant does not hold on a decoded or mutated record.
    #[error("escrow invariant violated: {0}")]
    InvariantViolation(String),
}

impl StateError {
    pub(crate) fn invalid_state(operation: &str, status: EscrowStatus) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            status,
        }
    }
}

/// Errors decoding or encoding the fixed-width account layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Account data is not exactly the layout width.
    #[error("escrow account data is {actual} bytes (expected {expected})")]
    InvalidLength {
        /// Required width.
        expected: usize,
        /// Actual width.
        actual: usize,
    },

    /// The first 8 bytes do not identify an escrow account.
    #[error("account discriminator mismatch")]
    DiscriminatorMismatch,

    /// Unknown status tag byte.
    #[error("unknown escrow status tag {0}")]
    InvalidStatus(u8),

    /// An option flag byte is neither 0 nor 1.
    #[error("invalid option flag {value} for field {field}")]
    InvalidFlag {
        /// Field name.
        field: &'static str,
        /// The flag byte found.
        value: u8,
    },

    /// Dispute reason does not fit the reserved field.
    #[error("dispute reason is {len} bytes long (max {max})")]
    ReasonTooLong {
        /// Encoded length.
        len: usize,
        /// Field capacity.
        max: usize,
    },

    /// Dispute reason bytes are not UTF-8.
    #[error("dispute reason is not valid UTF-8")]
    InvalidUtf8,
}
