//! Receipts of committed transactions.

use serde::{Deserialize, Serialize};

use escrow_core::{Address, Slot, TransactionId};
use escrow_state::EscrowStatus;

use crate::processor::Outcome;

/// What a committed transaction did: the externally observable result of
/// one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Identifier of the committed transaction.
    pub transaction_id: TransactionId,
    /// Slot at which it executed.
    pub slot: Slot,
    /// Operation name.
    pub operation: String,
    /// Transaction signer.
    pub signer: Address,
    /// Escrow record address.
    pub escrow: Address,
    /// Resulting status.
    pub status: EscrowStatus,
    /// Tokens moved.
    pub transferred: u64,
    /// Whether the record was closed.
    pub closed: bool,
}

impl TransactionReceipt {
    pub(crate) fn new(
        transaction_id: TransactionId,
        slot: Slot,
        operation: &str,
        signer: Address,
        outcome: Outcome,
    ) -> Self {
        Self {
            transaction_id,
            slot,
            operation: operation.to_string(),
            signer,
            escrow: outcome.escrow,
            status: outcome.status,
            transferred: outcome.transferred,
            closed: outcome.closed,
        }
    }
}

impl std::fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} status={} slot={} tx={}",
            self.operation, self.escrow, self.status, self.slot, self.transaction_id
        )?;
        if self.closed {
            write!(f, " (closed)")?;
        }
        Ok(())
    }
}
