//! # Program-Derived Address Derivation
//!
//! Maps an ordered list of byte-string seeds plus an owning program to an
//! address that no private key controls:
//!
//! ```text
//! candidate = sha256(seed_0 || ... || seed_n || [bump] || program_id || "ProgramDerivedAddress")
//! ```
//!
//! [`find_address`] searches `bump` from 255 down to 0 and returns the
//! first candidate that is *not* a valid Ed25519 point. [`create_address`]
//! recomputes a single candidate from seeds that already include the bump,
//! which is how a stored `(address, bump)` pair is verified without
//! searching again.
//!
//! ## Escrow Seed Scheme
//!
//! | Account          | Seeds                                             |
//! |------------------|---------------------------------------------------|
//! | escrow record    | `"escrow"`, depositor, `escrow_id` (8 bytes, LE)  |
//! | vault            | `"vault"`, escrow record address                  |
//! | vault authority  | `"vault_authority"`, escrow record address        |
//!
//! Each scheme starts with a distinct prefix, so addresses derived for one
//! purpose cannot collide with another purpose's namespace.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::digest::sha256;
use crate::error::DerivationError;

/// Maximum number of seeds, including the bump seed.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Seed prefix of the escrow record address.
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Seed prefix of the vault token account address.
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed prefix of the vault authority address.
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault_authority";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Recompute a program-derived address from seeds that already include
/// the bump.
///
/// # Errors
///
/// - [`DerivationError::TooManySeeds`] / [`DerivationError::SeedTooLong`]
///   when the seed list violates the size limits.
/// - [`DerivationError::OnCurve`] when the candidate has a private key.
pub fn create_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, DerivationError> {
    check_seeds(seeds, MAX_SEEDS)?;

    let mut preimage =
        Vec::with_capacity(seeds.iter().map(|s| s.len()).sum::<usize>() + 32 + PDA_MARKER.len());
    for seed in seeds {
        preimage.extend_from_slice(seed);
    }
    preimage.extend_from_slice(program_id.as_bytes());
    preimage.extend_from_slice(PDA_MARKER);

    let candidate = Address::new(sha256(&preimage));
    if candidate.is_on_curve() {
        return Err(DerivationError::OnCurve);
    }
    Ok(candidate)
}

/// Find the canonical program-derived address and bump for `seeds`.
///
/// # Errors
///
/// Seed size violations are reported as in [`create_address`] (with one
/// slot reserved for the bump). [`DerivationError::Exhausted`] if all 256
/// bumps land on the curve.
pub fn find_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DerivationError> {
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);
        match create_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(DerivationError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(DerivationError::Exhausted)
}

fn check_seeds(seeds: &[&[u8]], max: usize) -> Result<(), DerivationError> {
    if seeds.len() > max {
        return Err(DerivationError::TooManySeeds {
            count: seeds.len(),
            max,
        });
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(DerivationError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

// ── Escrow seed scheme ─────────────────────────────────────────────────

/// A derived address together with the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    /// The off-curve address.
    pub address: Address,
    /// The bump disambiguator.
    pub bump: u8,
}

/// The three addresses owned by one escrow agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAddresses {
    /// Escrow record account.
    pub escrow: DerivedAddress,
    /// Vault token account.
    pub vault: DerivedAddress,
    /// Keyless authority over the vault.
    pub vault_authority: DerivedAddress,
}

impl EscrowAddresses {
    /// Derive all three addresses for `(depositor, escrow_id)`.
    pub fn derive(
        depositor: &Address,
        escrow_id: u64,
        program_id: &Address,
    ) -> Result<Self, DerivationError> {
        let escrow = Self::escrow(depositor, escrow_id, program_id)?;
        Ok(Self {
            escrow,
            vault: Self::vault(&escrow.address, program_id)?,
            vault_authority: Self::vault_authority(&escrow.address, program_id)?,
        })
    }

    /// Derive the escrow record address.
    pub fn escrow(
        depositor: &Address,
        escrow_id: u64,
        program_id: &Address,
    ) -> Result<DerivedAddress, DerivationError> {
        let id = escrow_id.to_le_bytes();
        let (address, bump) = find_address(&[ESCROW_SEED, depositor.as_ref(), &id], program_id)?;
        Ok(DerivedAddress { address, bump })
    }

    /// Derive the vault address of an escrow record.
    pub fn vault(
        escrow: &Address,
        program_id: &Address,
    ) -> Result<DerivedAddress, DerivationError> {
        let (address, bump) = find_address(&[VAULT_SEED, escrow.as_ref()], program_id)?;
        Ok(DerivedAddress { address, bump })
    }

    /// Derive the vault authority address of an escrow record.
    pub fn vault_authority(
        escrow: &Address,
        program_id: &Address,
    ) -> Result<DerivedAddress, DerivationError> {
        let (address, bump) = find_address(&[VAULT_AUTHORITY_SEED, escrow.as_ref()], program_id)?;
        Ok(DerivedAddress { address, bump })
    }

    /// Recompute the escrow record address from a stored bump.
    pub fn verify_escrow(
        depositor: &Address,
        escrow_id: u64,
        bump: u8,
        program_id: &Address,
    ) -> Result<Address, DerivationError> {
        let id = escrow_id.to_le_bytes();
        create_address(&[ESCROW_SEED, depositor.as_ref(), &id, &[bump]], program_id)
    }

    /// Recompute the vault authority address from a stored bump.
    pub fn verify_vault_authority(
        escrow: &Address,
        bump: u8,
        program_id: &Address,
    ) -> Result<Address, DerivationError> {
        create_address(&[VAULT_AUTHORITY_SEED, escrow.as_ref(), &[bump]], program_id)
    }
}
