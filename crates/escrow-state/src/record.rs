//! # Escrow Record
//!
//! The persisted entity of one escrow agreement, keyed by
//! `(depositor, escrow_id)`.
//!
//! ## Security Invariant
//!
//! Every mutating method checks the current status against the status
//! graph before touching any field, and a rejected call leaves the record
//! unchanged. After every successful call the lifecycle invariants hold:
//!
//! - `amount > 0`, fixed at creation.
//! - Terminal statuses accept no further transition.
//! - `dispute_reason` is written once, on entry to `Disputed`.
//! - `funded_at_slot` is written once, by `fund`. Only a funded escrow
//!   can be resolved in the beneficiary's favour.
//! - `created_at_slot <= updated_at_slot`, and `updated_at_slot` never
//!   decreases.
//!
//! Token custody is not tracked here. The vault balance invariant is
//! enforced by the engine, which owns both the record and the vault.

use serde::{Deserialize, Serialize};

use escrow_core::{Address, Slot};

use crate::error::StateError;
use crate::status::EscrowStatus;

/// Maximum dispute reason length in bytes.
pub const MAX_DISPUTE_REASON_LEN: usize = 128;

/// The parameters a depositor fixes when initializing an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// Depositor-chosen identifier, unique per depositor.
    pub escrow_id: u64,
    /// The funding party.
    pub depositor: Address,
    /// The party paid on release.
    pub beneficiary: Address,
    /// The party that resolves disputes.
    pub arbiter: Address,
    /// Accepted token type.
    pub mint: Address,
    /// Exact quantity to be escrowed.
    pub amount: u64,
    /// Optional slot from which anyone may trigger release.
    pub auto_release_slot: Option<Slot>,
}

/// One escrow agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Depositor-chosen identifier.
    pub escrow_id: u64,
    /// The funding party. Immutable.
    pub depositor: Address,
    /// The party paid on release. Immutable.
    pub beneficiary: Address,
    /// The party that resolves disputes. Immutable.
    pub arbiter: Address,
    /// Accepted token type. Immutable.
    pub mint: Address,
    /// Vault token account holding the escrowed tokens.
    pub vault: Address,
    /// Escrowed quantity. Immutable and positive.
    pub amount: u64,
    /// Current lifecycle status.
    pub status: EscrowStatus,
    /// Slot from which release no longer requires the depositor.
    pub auto_release_slot: Option<Slot>,
    /// Slot of initialization.
    pub created_at_slot: Slot,
    /// Slot of the most recent transition.
    pub updated_at_slot: Slot,
    /// Slot at which the depositor funded the vault, if ever.
    pub funded_at_slot: Option<Slot>,
    /// Reason given when the dispute was raised.
    pub dispute_reason: Option<String>,
    /// Bump of the record's derived address.
    pub bump: u8,
    /// Bump of the vault authority's derived address.
    pub vault_authority_bump: u8,
}

impl EscrowRecord {
    /// Create a record in [`Created`](EscrowStatus::Created) status.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidAmount`] if `terms.amount` is zero.
    pub fn create(
        terms: EscrowTerms,
        vault: Address,
        bump: u8,
        vault_authority_bump: u8,
        slot: Slot,
    ) -> Result<Self, StateError> {
        if terms.amount == 0 {
            return Err(StateError::InvalidAmount {
                amount: terms.amount,
            });
        }
        Ok(Self {
            escrow_id: terms.escrow_id,
            depositor: terms.depositor,
            beneficiary: terms.beneficiary,
            arbiter: terms.arbiter,
            mint: terms.mint,
            vault,
            amount: terms.amount,
            status: EscrowStatus::Created,
            auto_release_slot: terms.auto_release_slot,
            created_at_slot: slot,
            updated_at_slot: slot,
            funded_at_slot: None,
            dispute_reason: None,
            bump,
            vault_authority_bump,
        })
    }

    /// Reject `operation` unless the current status is one of `allowed`.
    pub fn require_status(
        &self,
        operation: &str,
        allowed: &[EscrowStatus],
    ) -> Result<(), StateError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(StateError::invalid_state(operation, self.status))
        }
    }

    /// `Created → Funded`.
    pub fn fund(&mut self, slot: Slot) -> Result<(), StateError> {
        self.require_status("fund", &[EscrowStatus::Created])?;
        self.transition(EscrowStatus::Funded, slot)?;
        self.funded_at_slot = Some(slot);
        Ok(())
    }

    /// `Funded → Released`.
    pub fn release(&mut self, slot: Slot) -> Result<(), StateError> {
        self.require_status("release", &[EscrowStatus::Funded])?;
        self.transition(EscrowStatus::Released, slot)
    }

    /// `Created | Funded → Disputed`, recording `reason`.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidState`] from any other status, and
    /// [`StateError::DisputeReasonTooLong`] if `reason` exceeds
    /// [`MAX_DISPUTE_REASON_LEN`] bytes.
    pub fn dispute(&mut self, reason: String, slot: Slot) -> Result<(), StateError> {
        self.require_status("dispute", &[EscrowStatus::Created, EscrowStatus::Funded])?;
        if reason.len() > MAX_DISPUTE_REASON_LEN {
            return Err(StateError::DisputeReasonTooLong {
                len: reason.len(),
                max: MAX_DISPUTE_REASON_LEN,
            });
        }
        self.transition(EscrowStatus::Disputed, slot)?;
        self.dispute_reason = Some(reason);
        Ok(())
    }

    /// `Disputed → Cancelled` when refunding, `Disputed → Released`
    /// otherwise. Returns the new status.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidState`] outside `Disputed`, and
    /// [`StateError::NeverFunded`] when paying the beneficiary of an escrow
    /// that was never funded.
    pub fn resolve(
        &mut self,
        refund_to_depositor: bool,
        slot: Slot,
    ) -> Result<EscrowStatus, StateError> {
        self.require_status("resolve dispute on", &[EscrowStatus::Disputed])?;
        if !refund_to_depositor && self.funded_at_slot.is_none() {
            return Err(StateError::NeverFunded);
        }
        let to = if refund_to_depositor {
            EscrowStatus::Cancelled
        } else {
            EscrowStatus::Released
        };
        self.transition(to, slot)?;
        Ok(to)
    }

    /// `Created → Cancelled`.
    pub fn cancel(&mut self, slot: Slot) -> Result<(), StateError> {
        self.require_status("cancel", &[EscrowStatus::Created])?;
        self.transition(EscrowStatus::Cancelled, slot)
    }

    /// Check the lifecycle invariants that can be verified on the record
    /// alone.
    pub fn check_invariants(&self) -> Result<(), StateError> {
        if self.amount == 0 {
            return Err(StateError::InvariantViolation(
                "amount must be positive".to_string(),
            ));
        }
        if self.updated_at_slot < self.created_at_slot {
            return Err(StateError::InvariantViolation(format!(
                "updated_at_slot {} precedes created_at_slot {}",
                self.updated_at_slot, self.created_at_slot
            )));
        }
        if let Some(reason) = &self.dispute_reason {
            if matches!(self.status, EscrowStatus::Created | EscrowStatus::Funded) {
                return Err(StateError::InvariantViolation(format!(
                    "dispute reason present in status {}",
                    self.status
                )));
            }
            if reason.len() > MAX_DISPUTE_REASON_LEN {
                return Err(StateError::InvariantViolation(format!(
                    "dispute reason is {} bytes long",
                    reason.len()
                )));
            }
        } else if self.status == EscrowStatus::Disputed {
            return Err(StateError::InvariantViolation(
                "disputed escrow has no reason".to_string(),
            ));
        }
        match (self.status, self.funded_at_slot) {
            (EscrowStatus::Created, Some(_)) => Err(StateError::InvariantViolation(
                "created escrow has a funding slot".to_string(),
            )),
            (EscrowStatus::Funded, None) => Err(StateError::InvariantViolation(
                "funded escrow has no funding slot".to_string(),
            )),
            (_, Some(funded)) if funded < self.created_at_slot => {
                Err(StateError::InvariantViolation(format!(
                    "funded_at_slot {funded} precedes created_at_slot {}",
                    self.created_at_slot
                )))
            }
            _ => Ok(()),
        }
    }

    fn transition(&mut self, to: EscrowStatus, slot: Slot) -> Result<(), StateError> {
        if !self.status.can_transition_to(to) {
            return Err(StateError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if slot < self.updated_at_slot {
            return Err(StateError::SlotRegression {
                updated_at: self.updated_at_slot,
                slot,
            });
        }
        self.status = to;
        self.updated_at_slot = slot;
        Ok(())
    }
}
