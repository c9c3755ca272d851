//! # Address Derivation and Persistence Properties
//!
//! Derived addresses are deterministic, off-curve, verifiable from the
//! stored bump, and distinct across escrows. Persisted records decode to
//! exactly what the engine wrote.

mod common;

use common::{Harness, AMOUNT};
use escrow_core::{
    create_address, Address, EscrowAddresses, Keypair, ESCROW_SEED, VAULT_AUTHORITY_SEED,
};
use escrow_engine::LocalLedger;
use escrow_state::{EscrowRecord, ESCROW_ACCOUNT_LEN};
use proptest::prelude::*;

proptest! {
    #[test]
    fn derivation_is_deterministic(
        depositor in any::<[u8; 32]>(),
        escrow_id in any::<u64>(),
        program in any::<[u8; 32]>(),
    ) {
        let depositor = Address::new(depositor);
        let program = Address::new(program);
        let a = EscrowAddresses::derive(&depositor, escrow_id, &program).unwrap();
        let b = EscrowAddresses::derive(&depositor, escrow_id, &program).unwrap();
        prop_assert_eq!(a, b);
        prop_assert!(!a.escrow.address.is_on_curve());
        prop_assert!(!a.vault.address.is_on_curve());
        prop_assert!(!a.vault_authority.address.is_on_curve());
    }

    #[test]
    fn stored_bump_reproduces_address(
        depositor in any::<[u8; 32]>(),
        escrow_id in any::<u64>(),
    ) {
        let depositor = Address::new(depositor);
        let program = escrow_engine::default_program_id();
        let addrs = EscrowAddresses::derive(&depositor, escrow_id, &program).unwrap();
        let id = escrow_id.to_le_bytes();
        let bump = [addrs.escrow.bump];
        let direct =
            create_address(&[ESCROW_SEED, depositor.as_ref(), &id, &bump], &program).unwrap();
        prop_assert_eq!(direct, addrs.escrow.address);

        let escrow = addrs.escrow.address;
        let bump = [addrs.vault_authority.bump];
        let authority =
            create_address(&[VAULT_AUTHORITY_SEED, escrow.as_ref(), &bump], &program).unwrap();
        prop_assert_eq!(authority, addrs.vault_authority.address);
    }

    #[test]
    fn distinct_ids_never_share_accounts(a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        let depositor = Keypair::from_seed(&[0x11; 32]).address();
        let program = escrow_engine::default_program_id();
        let x = EscrowAddresses::derive(&depositor, a, &program).unwrap();
        let y = EscrowAddresses::derive(&depositor, b, &program).unwrap();
        prop_assert_ne!(x.escrow.address, y.escrow.address);
        prop_assert_ne!(x.vault.address, y.vault.address);
        prop_assert_ne!(x.vault_authority.address, y.vault_authority.address);
    }
}

#[test]
fn program_id_scopes_derivation() {
    let depositor = Address::new([1; 32]);
    let a = EscrowAddresses::derive(&depositor, 1, &Address::new([2; 32])).unwrap();
    let b = EscrowAddresses::derive(&depositor, 1, &Address::new([3; 32])).unwrap();
    assert_ne!(a.escrow.address, b.escrow.address);
}

#[test]
fn persisted_record_matches_engine_view() {
    let mut h = Harness::new(AMOUNT);
    h.initialize(7, AMOUNT, Some(9_000));
    h.fund(7);
    h.dispute(7, "Service not delivered as agreed");

    let addrs = h.addrs(7);
    let data = h.ledger.account_data(&addrs.escrow.address).unwrap();
    assert_eq!(data.len(), ESCROW_ACCOUNT_LEN);

    let record = EscrowRecord::from_account_data(data).unwrap();
    assert_eq!(record, h.record(7));
    assert_eq!(record.escrow_id, 7);
    assert_eq!(record.vault, addrs.vault.address);
    assert_eq!(record.bump, addrs.escrow.bump);
    assert_eq!(record.vault_authority_bump, addrs.vault_authority.bump);
    assert_eq!(record.auto_release_slot, Some(9_000));
    record.check_invariants().unwrap();
}

#[test]
fn ledger_survives_json_persistence() {
    let mut h = Harness::new(AMOUNT);
    h.initialize(1, AMOUNT, None);
    h.fund(1);

    let json = serde_json::to_string(&h.ledger).unwrap();
    let restored: LocalLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.slot(), h.ledger.slot());
    assert_eq!(restored.balance(&h.vault(1)), Some(AMOUNT));
    assert_eq!(
        restored.escrow(&h.addrs(1).escrow.address).unwrap(),
        Some(h.record(1))
    );

    // The restored ledger keeps executing transitions.
    h.ledger = restored;
    let ix = h.release_ix(1, h.beneficiary_token);
    h.submit(ix, common::Party::Depositor).unwrap();
    assert_eq!(h.balance(&h.beneficiary_token), AMOUNT);
}
