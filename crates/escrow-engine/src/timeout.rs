//! # Timeout Policy
//!
//! Auto-release is a permission, not a trigger. The host has no scheduler,
//! so someone must still submit `release`; once the threshold slot is
//! reached the signer no longer has to be the depositor.
//!
//! The predicate is evaluated against the slot of the executing
//! transaction and never cached.

use escrow_core::{Address, Slot};
use escrow_state::EscrowRecord;

use crate::error::EscrowError;

/// Why a release was permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAuthorization {
    /// The depositor signed.
    Depositor,
    /// The threshold slot has been reached; any signer may release.
    AutoRelease {
        /// The record's auto-release slot.
        threshold: Slot,
    },
}

/// Whether `current_slot` has reached an optional threshold.
pub fn permits_release(auto_release_slot: Option<Slot>, current_slot: Slot) -> bool {
    matches!(auto_release_slot, Some(threshold) if current_slot >= threshold)
}

/// Decide whether `signer` may release `record` at `current_slot`.
///
/// # Errors
///
/// [`EscrowError::Unauthorized`] if the signer is not the depositor and the
/// auto-release threshold is unset or not yet reached.
pub fn authorize_release(
    record: &EscrowRecord,
    signer: &Address,
    current_slot: Slot,
) -> Result<ReleaseAuthorization, EscrowError> {
    if *signer == record.depositor {
        return Ok(ReleaseAuthorization::Depositor);
    }
    match record.auto_release_slot {
        Some(threshold) if permits_release(Some(threshold), current_slot) => {
            Ok(ReleaseAuthorization::AutoRelease { threshold })
        }
        _ => Err(EscrowError::unauthorized("release", signer)),
    }
}
