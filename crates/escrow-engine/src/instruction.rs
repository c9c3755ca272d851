//! # Instructions and Signed Transactions
//!
//! An [`Instruction`] names one transition and the accounts it touches. A
//! [`Message`] binds the instruction to its signer and a recent slot, and a
//! [`Transaction`] carries the signer's Ed25519 signature over the message's
//! JSON encoding.
//!
//! The transaction identifier is the SHA-256 of the signature, so a
//! replayed transaction is recognizable by identifier alone. Because
//! Ed25519 signatures are deterministic, re-signing an identical message
//! also yields the same identifier; clients vary `recent_slot` to submit a
//! second, distinct attempt.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use escrow_core::{Address, CryptoError, Keypair, Signature, Slot, TransactionId};

/// Accounts of [`Instruction::Initialize`]. The signer is the depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeAccounts {
    /// Escrow record address derived from `(depositor, escrow_id)`.
    pub escrow: Address,
    /// Vault address derived from the escrow address.
    pub vault: Address,
    /// Beneficiary principal.
    pub beneficiary: Address,
    /// Arbiter principal.
    pub arbiter: Address,
    /// Token mint accepted by the escrow.
    pub mint: Address,
}

/// Accounts of [`Instruction::Fund`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundAccounts {
    /// Escrow record.
    pub escrow: Address,
    /// The record's vault.
    pub vault: Address,
    /// Depositor-owned source token account.
    pub depositor_token: Address,
}

/// Accounts of [`Instruction::Release`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAccounts {
    /// Escrow record.
    pub escrow: Address,
    /// The record's vault.
    pub vault: Address,
    /// Beneficiary-owned destination token account.
    pub beneficiary_token: Address,
}

/// Accounts of [`Instruction::ResolveDispute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveAccounts {
    /// Escrow record.
    pub escrow: Address,
    /// The record's vault.
    pub vault: Address,
    /// Destination token account: depositor-owned when refunding,
    /// beneficiary-owned otherwise.
    pub destination: Address,
}

/// Accounts of [`Instruction::Close`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAccounts {
    /// Escrow record.
    pub escrow: Address,
    /// The record's vault.
    pub vault: Address,
}

/// One escrow transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// Create a record in `Created` status and its empty vault.
    Initialize {
        /// Accounts.
        accounts: InitializeAccounts,
        /// Depositor-chosen identifier.
        escrow_id: u64,
        /// Quantity to escrow.
        amount: u64,
        /// Optional permissionless release threshold.
        auto_release_slot: Option<Slot>,
    },
    /// Move `amount` from the depositor into the vault.
    Fund {
        /// Accounts.
        accounts: FundAccounts,
    },
    /// Pay the vault out to the beneficiary.
    Release {
        /// Accounts.
        accounts: ReleaseAccounts,
    },
    /// Freeze the escrow pending arbitration.
    Dispute {
        /// Escrow record.
        escrow: Address,
        /// Free-text reason, at most 128 bytes.
        reason: String,
    },
    /// Arbiter settles a dispute.
    ResolveDispute {
        /// Accounts.
        accounts: ResolveAccounts,
        /// Refund the depositor (`Cancelled`) instead of paying the
        /// beneficiary (`Released`).
        refund_to_depositor: bool,
    },
    /// Abandon a never-funded escrow.
    Cancel {
        /// Escrow record.
        escrow: Address,
    },
    /// Reclaim the storage of a terminal escrow.
    Close {
        /// Accounts.
        accounts: CloseAccounts,
    },
}

impl Instruction {
    /// Short operation name used in logs and receipts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::Fund { .. } => "fund",
            Self::Release { .. } => "release",
            Self::Dispute { .. } => "dispute",
            Self::ResolveDispute { .. } => "resolve_dispute",
            Self::Cancel { .. } => "cancel",
            Self::Close { .. } => "close",
        }
    }

    /// The escrow record this instruction targets.
    pub fn escrow(&self) -> Address {
        match self {
            Self::Initialize { accounts, .. } => accounts.escrow,
            Self::Fund { accounts } => accounts.escrow,
            Self::Release { accounts } => accounts.escrow,
            Self::Dispute { escrow, .. } | Self::Cancel { escrow } => *escrow,
            Self::ResolveDispute { accounts, .. } => accounts.escrow,
            Self::Close { accounts } => accounts.escrow,
        }
    }
}

/// The signed payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The signing principal.
    pub signer: Address,
    /// A slot the signer observed recently; bounds the replay window.
    pub recent_slot: Slot,
    /// The requested transition.
    pub instruction: Instruction,
}

impl Message {
    /// The exact bytes covered by the signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        serde_json::to_vec(self).map_err(|e| TransactionError::Encoding(e.to_string()))
    }
}

/// A message and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed payload.
    pub message: Message,
    /// Signature by `message.signer`.
    pub signature: Signature,
}

impl Transaction {
    /// Build and sign a transaction for `instruction`.
    pub fn new(
        instruction: Instruction,
        recent_slot: Slot,
        signer: &Keypair,
    ) -> Result<Self, TransactionError> {
        let message = Message {
            signer: signer.address(),
            recent_slot,
            instruction,
        };
        let signature = signer.sign(&message.signing_bytes()?);
        Ok(Self { message, signature })
    }

    /// Identifier derived from the signature.
    pub fn id(&self) -> TransactionId {
        TransactionId::from_signature(&self.signature)
    }

    /// Check the signature against `message.signer`.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let bytes = self.message.signing_bytes()?;
        self.signature
            .verify(&bytes, &self.message.signer)
            .map_err(TransactionError::Signature)
    }
}

/// Errors building or verifying a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The message could not be encoded.
    #[error("message encoding failed: {0}")]
    Encoding(String),

    /// The signature does not verify.
    #[error("invalid transaction signature: {0}")]
    Signature(CryptoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancel(escrow: u8) -> Instruction {
        Instruction::Cancel {
            escrow: Address::new([escrow; 32]),
        }
    }

    #[test]
    fn signed_transaction_verifies() {
        let kp = Keypair::from_seed(&[1; 32]);
        let tx = Transaction::new(cancel(9), 5, &kp).unwrap();
        assert_eq!(tx.message.signer, kp.address());
        tx.verify().unwrap();
    }

    #[test]
    fn tampered_instruction_fails_verification() {
        let kp = Keypair::from_seed(&[1; 32]);
        let mut tx = Transaction::new(cancel(9), 5, &kp).unwrap();
        tx.message.instruction = cancel(8);
        assert!(matches!(tx.verify(), Err(TransactionError::Signature(_))));
    }

    #[test]
    fn substituted_signer_fails_verification() {
        let kp = Keypair::from_seed(&[1; 32]);
        let mut tx = Transaction::new(cancel(9), 5, &kp).unwrap();
        tx.message.signer = Keypair::from_seed(&[2; 32]).address();
        assert!(tx.verify().is_err());
    }

    #[test]
    fn id_depends_on_recent_slot() {
        let kp = Keypair::from_seed(&[1; 32]);
        let a = Transaction::new(cancel(9), 5, &kp).unwrap();
        let b = Transaction::new(cancel(9), 5, &kp).unwrap();
        let c = Transaction::new(cancel(9), 6, &kp).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn json_roundtrip_preserves_signature_validity() {
        let kp = Keypair::from_seed(&[3; 32]);
        let tx = Transaction::new(
            Instruction::Dispute {
                escrow: Address::new([4; 32]),
                reason: "Service not delivered as agreed".to_string(),
            },
            11,
            &kp,
        )
        .unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"type\":\"dispute\""));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        back.verify().unwrap();
        assert_eq!(back.id(), tx.id());
    }

    #[test]
    fn instruction_metadata() {
        assert_eq!(cancel(1).name(), "cancel");
        assert_eq!(cancel(1).escrow(), Address::new([1; 32]));
    }
}
