//! # Vault Authority
//!
//! The keyless principal that owns an escrow's vault token account.
//!
//! ## Security Invariant
//!
//! A [`VaultAuthority`] can only be constructed inside this crate, and only
//! after its address has been recomputed from the escrow record address
//! and the stored bump. Holding one is the proof that the engine itself is
//! authorizing a vault debit; no signature can stand in for it because the
//! authority address is off the Ed25519 curve.

use escrow_core::{Address, EscrowAddresses};

use crate::error::EscrowError;

/// Capability to debit the vault of one escrow record.
#[derive(Debug)]
pub struct VaultAuthority {
    escrow: Address,
    address: Address,
}

impl VaultAuthority {
    /// Recompute the authority of `escrow` from its stored bump.
    pub(crate) fn for_escrow(
        escrow: &Address,
        bump: u8,
        program_id: &Address,
    ) -> Result<Self, EscrowError> {
        let address = EscrowAddresses::verify_vault_authority(escrow, bump, program_id)?;
        Ok(Self {
            escrow: *escrow,
            address,
        })
    }

    /// The authority's address, which owns the vault token account.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The escrow record this authority is scoped to.
    pub fn escrow(&self) -> Address {
        self.escrow
    }
}
