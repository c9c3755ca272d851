//! # Engine Error Types
//!
//! [`EscrowError`] is the tagged failure value returned by every
//! transition. Any error aborts the whole transaction; the host discards
//! tentative writes, so the engine never attempts local recovery.
//!
//! Callers that only need the category use [`EscrowError::kind`]; hosts
//! that report numeric failure codes use [`EscrowError::code`].

use thiserror::Error;

use escrow_core::{Address, DerivationError};
use escrow_state::{EscrowStatus, LayoutError, StateError};

use crate::host::{AssetError, HostError};

/// Failure category of an [`EscrowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong signer for the requested operation.
    Unauthorized,
    /// The record is not in the status the operation requires.
    InvalidState,
    /// Zero amount at initialization.
    InvalidAmount,
    /// A supplied account does not match its derivation, owner, or mint.
    AccountMismatch,
    /// The asset service could not cover a transfer.
    InsufficientFunds,
    /// No off-curve address exists for the seeds.
    AddressDerivationFailure,
    /// A malformed argument such as an oversized dispute reason.
    InvalidArgument,
}

impl ErrorKind {
    /// Stable numeric code reported by hosts.
    pub fn code(&self) -> u32 {
        match self {
            Self::Unauthorized => 6000,
            Self::InvalidState => 6001,
            Self::InvalidAmount => 6002,
            Self::AccountMismatch => 6003,
            Self::InsufficientFunds => 6004,
            Self::AddressDerivationFailure => 6005,
            Self::InvalidArgument => 6006,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::AccountMismatch => "ACCOUNT_MISMATCH",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::AddressDerivationFailure => "ADDRESS_DERIVATION_FAILURE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by the transition engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// The signer may not perform this operation on this record.
    #[error("{signer} is not authorized to {operation}")]
    Unauthorized {
        /// The attempted operation.
        operation: &'static str,
        /// The transaction signer.
        signer: Address,
    },

    /// The record is not in a status that permits the operation.
    #[error("cannot {operation} an escrow in status {status}")]
    InvalidState {
        /// The attempted operation.
        operation: String,
        /// The current status.
        status: EscrowStatus,
    },

    /// Escrow amount must be strictly positive.
    #[error("escrow amount must be positive, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: u64,
    },

    /// A supplied account is not the one the record requires.
    #[error("{account} account mismatch: expected {expected}, got {actual}")]
    AccountMismatch {
        /// Role of the account (e.g. "vault", "beneficiary token owner").
        account: &'static str,
        /// Required address.
        expected: Address,
        /// Supplied address.
        actual: Address,
    },

    /// A referenced account does not exist.
    #[error("{account} account {address} not found")]
    AccountNotFound {
        /// Role of the account.
        account: &'static str,
        /// Supplied address.
        address: Address,
    },

    /// The escrow address for `(depositor, escrow_id)` is already in use.
    #[error("escrow account {0} already in use")]
    AccountAlreadyInUse(Address),

    /// The funding account cannot cover the transfer.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance of the source account.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// Address derivation found no off-curve candidate.
    #[error("address derivation failed: {0}")]
    AddressDerivationFailure(DerivationError),

    /// Derivation seeds exceed the scheme's limits.
    #[error("invalid derivation seeds: {0}")]
    InvalidSeeds(DerivationError),

    /// Dispute reason exceeds the persisted field width.
    #[error("dispute reason is {len} bytes long (max {max})")]
    DisputeReasonTooLong {
        /// Length of the rejected reason.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The vault still holds tokens.
    #[error("vault {vault} still holds {balance} tokens")]
    VaultNotEmpty {
        /// Vault address.
        vault: Address,
        /// Its balance.
        balance: u64,
    },

    /// Any other record-level rejection.
    #[error("escrow state error: {0}")]
    State(StateError),

    /// Stored account data is not a valid escrow record.
    #[error("escrow account layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Program account storage failure.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Asset service failure other than insufficient funds.
    #[error("asset service error: {0}")]
    Asset(AssetError),
}

impl EscrowError {
    /// The failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidState { .. } | Self::VaultNotEmpty { .. } | Self::State(_) => {
                ErrorKind::InvalidState
            }
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::AccountMismatch { .. }
            | Self::AccountNotFound { .. }
            | Self::AccountAlreadyInUse(_)
            | Self::Layout(_)
            | Self::Host(_)
            | Self::Asset(_) => ErrorKind::AccountMismatch,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AddressDerivationFailure(_) => ErrorKind::AddressDerivationFailure,
            Self::InvalidSeeds(_) | Self::DisputeReasonTooLong { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Stable numeric code of [`kind`](Self::kind).
    pub fn code(&self) -> u32 {
        self.kind().code()
    }

    pub(crate) fn unauthorized(operation: &'static str, signer: &Address) -> Self {
        Self::Unauthorized {
            operation,
            signer: *signer,
        }
    }

    pub(crate) fn mismatch(account: &'static str, expected: &Address, actual: &Address) -> Self {
        Self::AccountMismatch {
            account,
            expected: *expected,
            actual: *actual,
        }
    }
}

impl From<StateError> for EscrowError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InvalidAmount { amount } => Self::InvalidAmount { amount },
            StateError::InvalidState { operation, status } => {
                Self::InvalidState { operation, status }
            }
            StateError::DisputeReasonTooLong { len, max } => {
                Self::DisputeReasonTooLong { len, max }
            }
            other => Self::State(other),
        }
    }
}

impl From<DerivationError> for EscrowError {
    fn from(err: DerivationError) -> Self {
        match err {
            DerivationError::TooManySeeds { .. } | DerivationError::SeedTooLong { .. } => {
                Self::InvalidSeeds(err)
            }
            DerivationError::OnCurve | DerivationError::Exhausted => {
                Self::AddressDerivationFailure(err)
            }
        }
    }
}

impl From<AssetError> for EscrowError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InsufficientFunds {
                available,
                requested,
                ..
            } => Self::InsufficientFunds {
                available,
                requested,
            },
            other => Self::Asset(other),
        }
    }
}
