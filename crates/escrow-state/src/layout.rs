//! # Persisted Account Layout
//!
//! Fixed-width binary encoding of an [`EscrowRecord`] as stored in its
//! program account. Every record occupies exactly [`ESCROW_ACCOUNT_LEN`]
//! bytes regardless of the dispute reason, so account storage is sized
//! once at initialization.
//!
//! ```text
//! offset  size  field
//!      0     8  discriminator  sha256("account:EscrowAccount")[..8]
//!      8     8  escrow_id            u64 LE
//!     16    32  depositor
//!     48    32  beneficiary
//!     80    32  arbiter
//!    112    32  mint
//!    144    32  vault
//!    176     8  amount               u64 LE
//!    184     1  status tag
//!    185     1  auto_release flag    0 | 1
//!    186     8  auto_release_slot    u64 LE (0 when absent)
//!    194     8  created_at_slot      u64 LE
//!    202     8  updated_at_slot      u64 LE
//!    210     1  funded flag          0 | 1
//!    211     8  funded_at_slot       u64 LE (0 when absent)
//!    219     1  dispute_reason flag  0 | 1
//!    220     2  dispute_reason len   u16 LE
//!    222   128  dispute_reason bytes (zero padded)
//!    350     1  bump
//!    351     1  vault_authority_bump
//! ```

use escrow_core::{account_discriminator, Address};

use crate::error::LayoutError;
use crate::record::{EscrowRecord, MAX_DISPUTE_REASON_LEN};
use crate::status::EscrowStatus;

/// Account type name hashed into the discriminator.
pub const ESCROW_ACCOUNT_NAME: &str = "EscrowAccount";

/// Width of an encoded escrow account in bytes.
pub const ESCROW_ACCOUNT_LEN: usize =
    8 + 8 + 5 * 32 + 8 + 1 + 9 + 8 + 8 + 9 + 1 + 2 + MAX_DISPUTE_REASON_LEN + 2;

/// The discriminator that prefixes every escrow account.
pub fn escrow_discriminator() -> [u8; 8] {
    account_discriminator(ESCROW_ACCOUNT_NAME)
}

impl EscrowRecord {
    /// Encode into the fixed-width account layout.
    ///
    /// # Errors
    ///
    /// [`LayoutError::ReasonTooLong`] if the dispute reason does not fit.
    pub fn to_account_data(&self) -> Result<Vec<u8>, LayoutError> {
        let mut out = Vec::with_capacity(ESCROW_ACCOUNT_LEN);
        out.extend_from_slice(&escrow_discriminator());
        out.extend_from_slice(&self.escrow_id.to_le_bytes());
        for address in [
            &self.depositor,
            &self.beneficiary,
            &self.arbiter,
            &self.mint,
            &self.vault,
        ] {
            out.extend_from_slice(address.as_bytes());
        }
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.push(self.status.tag());
        put_option_u64(&mut out, self.auto_release_slot);
        out.extend_from_slice(&self.created_at_slot.to_le_bytes());
        out.extend_from_slice(&self.updated_at_slot.to_le_bytes());
        put_option_u64(&mut out, self.funded_at_slot);

        let reason = self.dispute_reason.as_deref().unwrap_or_default().as_bytes();
        if reason.len() > MAX_DISPUTE_REASON_LEN {
            return Err(LayoutError::ReasonTooLong {
                len: reason.len(),
                max: MAX_DISPUTE_REASON_LEN,
            });
        }
        out.push(u8::from(self.dispute_reason.is_some()));
        // Bounded by MAX_DISPUTE_REASON_LEN above.
        out.extend_from_slice(&(reason.len() as u16).to_le_bytes());
        out.extend_from_slice(reason);
        out.resize(out.len() + MAX_DISPUTE_REASON_LEN - reason.len(), 0);

        out.push(self.bump);
        out.push(self.vault_authority_bump);
        debug_assert_eq!(out.len(), ESCROW_ACCOUNT_LEN);
        Ok(out)
    }

    /// Decode from the fixed-width account layout.
    pub fn from_account_data(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != ESCROW_ACCOUNT_LEN {
            return Err(LayoutError::InvalidLength {
                expected: ESCROW_ACCOUNT_LEN,
                actual: data.len(),
            });
        }
        let mut r = Reader { data, pos: 0 };
        if r.take::<8>() != escrow_discriminator() {
            return Err(LayoutError::DiscriminatorMismatch);
        }
        let escrow_id = r.u64();
        let depositor = r.address();
        let beneficiary = r.address();
        let arbiter = r.address();
        let mint = r.address();
        let vault = r.address();
        let amount = r.u64();
        let tag = r.u8();
        let status = EscrowStatus::from_tag(tag).ok_or(LayoutError::InvalidStatus(tag))?;
        let auto_release_flag = r.flag("auto_release_slot")?;
        let auto_release_value = r.u64();
        let created_at_slot = r.u64();
        let updated_at_slot = r.u64();
        let funded_flag = r.flag("funded_at_slot")?;
        let funded_value = r.u64();

        let reason_flag = r.flag("dispute_reason")?;
        let reason_len = usize::from(u16::from_le_bytes(r.take::<2>()));
        let reason_field = r.take::<MAX_DISPUTE_REASON_LEN>();
        if reason_len > MAX_DISPUTE_REASON_LEN {
            return Err(LayoutError::ReasonTooLong {
                len: reason_len,
                max: MAX_DISPUTE_REASON_LEN,
            });
        }
        let dispute_reason = if reason_flag {
            let text = std::str::from_utf8(&reason_field[..reason_len])
                .map_err(|_| LayoutError::InvalidUtf8)?;
            Some(text.to_string())
        } else {
            None
        };

        Ok(Self {
            escrow_id,
            depositor,
            beneficiary,
            arbiter,
            mint,
            vault,
            amount,
            status,
            auto_release_slot: auto_release_flag.then_some(auto_release_value),
            created_at_slot,
            updated_at_slot,
            funded_at_slot: funded_flag.then_some(funded_value),
            dispute_reason,
            bump: r.u8(),
            vault_authority_bump: r.u8(),
        })
    }
}

fn put_option_u64(out: &mut Vec<u8>, value: Option<u64>) {
    out.push(u8::from(value.is_some()));
    out.extend_from_slice(&value.unwrap_or(0).to_le_bytes());
}

/// Cursor over a buffer whose total length has already been checked.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn address(&mut self) -> Address {
        Address::new(self.take::<32>())
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, LayoutError> {
        match self.u8() {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(LayoutError::InvalidFlag { field, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EscrowTerms;
    use proptest::prelude::*;

    fn record(auto_release_slot: Option<u64>) -> EscrowRecord {
        EscrowRecord::create(
            EscrowTerms {
                escrow_id: 7,
                depositor: Address::new([1; 32]),
                beneficiary: Address::new([2; 32]),
                arbiter: Address::new([3; 32]),
                mint: Address::new([4; 32]),
                amount: 500,
                auto_release_slot,
            },
            Address::new([5; 32]),
            250,
            249,
            3,
        )
        .unwrap()
    }

    #[test]
    fn account_len_is_fixed() {
        assert_eq!(ESCROW_ACCOUNT_LEN, 352);
        let plain = record(None).to_account_data().unwrap();
        let mut disputed = record(Some(9));
        disputed
            .dispute("x".repeat(MAX_DISPUTE_REASON_LEN), 4)
            .unwrap();
        let full = disputed.to_account_data().unwrap();
        assert_eq!(plain.len(), ESCROW_ACCOUNT_LEN);
        assert_eq!(full.len(), ESCROW_ACCOUNT_LEN);
    }

    #[test]
    fn starts_with_discriminator() {
        let data = record(None).to_account_data().unwrap();
        assert_eq!(&data[..8], &escrow_discriminator());
        assert_eq!(data[184], EscrowStatus::Created.tag());
        assert_eq!(data[210], 0);
        assert_eq!(data[350], 250);
        assert_eq!(data[351], 249);
    }

    #[test]
    fn decode_restores_record() {
        let mut original = record(Some(42));
        original.fund(5).unwrap();
        original.dispute("Service not delivered as agreed".to_string(), 6).unwrap();
        let data = original.to_account_data().unwrap();
        assert_eq!(data[210], 1);
        assert_eq!(&data[211..219], &5u64.to_le_bytes());
        let decoded = EscrowRecord::from_account_data(&data).unwrap();
        assert_eq!(decoded.funded_at_slot, Some(5));
        assert_eq!(decoded, original);
    }

    #[test]
    fn empty_reason_is_distinct_from_absent() {
        let mut original = record(None);
        original.dispute(String::new(), 4).unwrap();
        let data = original.to_account_data().unwrap();
        let decoded = EscrowRecord::from_account_data(&data).unwrap();
        assert_eq!(decoded.dispute_reason.as_deref(), Some(""));
    }

    #[test]
    fn rejects_wrong_length() {
        let data = record(None).to_account_data().unwrap();
        assert_eq!(
            EscrowRecord::from_account_data(&data[..100]).unwrap_err(),
            LayoutError::InvalidLength {
                expected: ESCROW_ACCOUNT_LEN,
                actual: 100
            }
        );
    }

    #[test]
    fn rejects_foreign_discriminator() {
        let mut data = record(None).to_account_data().unwrap();
        data[0] ^= 0xff;
        assert_eq!(
            EscrowRecord::from_account_data(&data).unwrap_err(),
            LayoutError::DiscriminatorMismatch
        );
    }

    #[test]
    fn rejects_unknown_status_and_flags() {
        let mut data = record(None).to_account_data().unwrap();
        data[184] = 9;
        assert_eq!(
            EscrowRecord::from_account_data(&data).unwrap_err(),
            LayoutError::InvalidStatus(9)
        );

        let mut data = record(None).to_account_data().unwrap();
        data[185] = 2;
        assert!(matches!(
            EscrowRecord::from_account_data(&data),
            Err(LayoutError::InvalidFlag {
                field: "auto_release_slot",
                value: 2
            })
        ));

        let mut data = record(None).to_account_data().unwrap();
        data[210] = 3;
        assert!(matches!(
            EscrowRecord::from_account_data(&data),
            Err(LayoutError::InvalidFlag {
                field: "funded_at_slot",
                value: 3
            })
        ));
    }

    #[test]
    fn rejects_oversized_reason_on_encode() {
        let mut r = record(None);
        r.status = EscrowStatus::Disputed;
        r.dispute_reason = Some("y".repeat(MAX_DISPUTE_REASON_LEN + 1));
        assert!(matches!(
            r.to_account_data(),
            Err(LayoutError::ReasonTooLong { .. })
        ));
    }

    proptest! {
        /// Decoding an encoded record always yields the same record.
        #[test]
        fn layout_is_stable(
            escrow_id in any::<u64>(),
            amount in 1u64..,
            auto in proptest::option::of(any::<u64>()),
            funded in proptest::option::of(any::<u64>()),
            reason in proptest::option::of("[a-zA-Z0-9 ]{0,128}"),
            status_tag in 0u8..5,
        ) {
            let mut r = record(auto);
            r.escrow_id = escrow_id;
            r.amount = amount;
            r.funded_at_slot = funded;
            r.status = EscrowStatus::from_tag(status_tag).unwrap();
            r.dispute_reason = reason;
            let data = r.to_account_data().unwrap();
            prop_assert_eq!(data.len(), ESCROW_ACCOUNT_LEN);
            prop_assert_eq!(EscrowRecord::from_account_data(&data).unwrap(), r);
        }
    }
}
