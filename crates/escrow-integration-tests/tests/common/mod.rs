//! Shared harness: a local ledger with a depositor, beneficiary, arbiter,
//! and one mint.

#![allow(dead_code)]

use escrow_core::{Address, EscrowAddresses, Keypair, Slot};
use escrow_engine::{
    CloseAccounts, EscrowError, FundAccounts, InitializeAccounts, Instruction, LedgerError,
    LocalLedger, ReleaseAccounts, ResolveAccounts, Transaction, TransactionReceipt,
};
use escrow_state::EscrowRecord;

pub const AMOUNT: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Depositor,
    Beneficiary,
    Arbiter,
    Outsider,
}

pub struct Harness {
    pub ledger: LocalLedger,
    pub mint_authority: Keypair,
    pub depositor: Keypair,
    pub beneficiary: Keypair,
    pub arbiter: Keypair,
    pub outsider: Keypair,
    pub mint: Address,
    pub depositor_token: Address,
    pub beneficiary_token: Address,
}

impl Harness {
    /// Depositor holds `balance` tokens; beneficiary holds none.
    pub fn new(balance: u64) -> Self {
        let mut ledger = LocalLedger::new(escrow_engine::default_program_id());
        let mint_authority = Keypair::from_seed(&[0x10; 32]);
        let depositor = Keypair::from_seed(&[0x11; 32]);
        let beneficiary = Keypair::from_seed(&[0x12; 32]);
        let arbiter = Keypair::from_seed(&[0x13; 32]);
        let outsider = Keypair::from_seed(&[0x14; 32]);
        let mint = ledger.create_mint(&mint_authority.address(), 6);
        let depositor_token = ledger
            .create_token_account(&depositor.address(), &mint)
            .unwrap();
        let beneficiary_token = ledger
            .create_token_account(&beneficiary.address(), &mint)
            .unwrap();
        if balance > 0 {
            ledger
                .mint_to(&mint, &mint_authority, &depositor_token, balance)
                .unwrap();
        }
        Self {
            ledger,
            mint_authority,
            depositor,
            beneficiary,
            arbiter,
            outsider,
            mint,
            depositor_token,
            beneficiary_token,
        }
    }

    pub fn addrs(&self, escrow_id: u64) -> EscrowAddresses {
        EscrowAddresses::derive(&self.depositor.address(), escrow_id, &self.ledger.program_id())
            .unwrap()
    }

    pub fn vault(&self, escrow_id: u64) -> Address {
        self.addrs(escrow_id).vault.address
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.ledger.balance(account).unwrap_or(0)
    }

    pub fn record(&self, escrow_id: u64) -> EscrowRecord {
        self.ledger
            .escrow(&self.addrs(escrow_id).escrow.address)
            .unwrap()
            .expect("escrow record exists")
    }

    pub fn record_exists(&self, escrow_id: u64) -> bool {
        self.ledger
            .escrow(&self.addrs(escrow_id).escrow.address)
            .unwrap()
            .is_some()
    }

    /// A fresh empty token account of the harness mint.
    pub fn token_account(&mut self, owner: &Address) -> Address {
        self.ledger.create_token_account(owner, &self.mint).unwrap()
    }

    pub fn keypair(&self, party: Party) -> &Keypair {
        match party {
            Party::Depositor => &self.depositor,
            Party::Beneficiary => &self.beneficiary,
            Party::Arbiter => &self.arbiter,
            Party::Outsider => &self.outsider,
        }
    }

    pub fn submit(
        &mut self,
        instruction: Instruction,
        party: Party,
    ) -> Result<TransactionReceipt, LedgerError> {
        let tx = Transaction::new(instruction, self.ledger.slot(), self.keypair(party)).unwrap();
        self.ledger.submit(&tx)
    }

    /// Submit signed by a keypair outside the harness.
    pub fn submit_with(
        &mut self,
        instruction: Instruction,
        signer: &Keypair,
    ) -> Result<TransactionReceipt, LedgerError> {
        let tx = Transaction::new(instruction, self.ledger.slot(), signer).unwrap();
        self.ledger.submit(&tx)
    }

    // ── Instruction builders ───────────────────────────────────────────

    pub fn initialize_ix(&self, escrow_id: u64, amount: u64, auto: Option<Slot>) -> Instruction {
        let addrs = self.addrs(escrow_id);
        Instruction::Initialize {
            accounts: InitializeAccounts {
                escrow: addrs.escrow.address,
                vault: addrs.vault.address,
                beneficiary: self.beneficiary.address(),
                arbiter: self.arbiter.address(),
                mint: self.mint,
            },
            escrow_id,
            amount,
            auto_release_slot: auto,
        }
    }

    pub fn fund_ix(&self, escrow_id: u64) -> Instruction {
        let addrs = self.addrs(escrow_id);
        Instruction::Fund {
            accounts: FundAccounts {
                escrow: addrs.escrow.address,
                vault: addrs.vault.address,
                depositor_token: self.depositor_token,
            },
        }
    }

    pub fn release_ix(&self, escrow_id: u64, to: Address) -> Instruction {
        let addrs = self.addrs(escrow_id);
        Instruction::Release {
            accounts: ReleaseAccounts {
                escrow: addrs.escrow.address,
                vault: addrs.vault.address,
                beneficiary_token: to,
            },
        }
    }

    pub fn dispute_ix(&self, escrow_id: u64, reason: &str) -> Instruction {
        Instruction::Dispute {
            escrow: self.addrs(escrow_id).escrow.address,
            reason: reason.to_string(),
        }
    }

    pub fn resolve_ix(&self, escrow_id: u64, to: Address, refund: bool) -> Instruction {
        let addrs = self.addrs(escrow_id);
        Instruction::ResolveDispute {
            accounts: ResolveAccounts {
                escrow: addrs.escrow.address,
                vault: addrs.vault.address,
                destination: to,
            },
            refund_to_depositor: refund,
        }
    }

    pub fn cancel_ix(&self, escrow_id: u64) -> Instruction {
        Instruction::Cancel {
            escrow: self.addrs(escrow_id).escrow.address,
        }
    }

    pub fn close_ix(&self, escrow_id: u64) -> Instruction {
        let addrs = self.addrs(escrow_id);
        Instruction::Close {
            accounts: CloseAccounts {
                escrow: addrs.escrow.address,
                vault: addrs.vault.address,
            },
        }
    }

    // ── Signed shortcuts ───────────────────────────────────────────────

    pub fn initialize(&mut self, escrow_id: u64, amount: u64, auto: Option<Slot>) {
        let ix = self.initialize_ix(escrow_id, amount, auto);
        self.submit(ix, Party::Depositor).unwrap();
    }

    pub fn fund(&mut self, escrow_id: u64) {
        let ix = self.fund_ix(escrow_id);
        self.submit(ix, Party::Depositor).unwrap();
    }

    pub fn dispute(&mut self, escrow_id: u64, reason: &str) {
        let ix = self.dispute_ix(escrow_id, reason);
        self.submit(ix, Party::Depositor).unwrap();
    }
}

/// Unwrap a transition rejection.
pub fn escrow_err(result: Result<TransactionReceipt, LedgerError>) -> EscrowError {
    match result {
        Err(LedgerError::Escrow(e)) => e,
        other => panic!("expected an escrow error, got {other:?}"),
    }
}
