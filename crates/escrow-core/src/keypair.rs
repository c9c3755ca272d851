//! # Ed25519 Keypairs and Signatures
//!
//! A principal's [`Address`] is its Ed25519 public key. Transactions are
//! authorized by a [`Signature`] over the message bytes.
//!
//! ## Security Invariant
//!
//! [`Keypair`] does not implement `Serialize` or `Debug` with key
//! material. The only way to persist a key is the explicit
//! [`Keypair::to_seed`] call used by wallet files.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::{hex_to_bytes, to_hex, Address};
use crate::error::{CryptoError, ValidationError};

/// An Ed25519 signature (64 bytes). Serializes as a hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

/// An Ed25519 signing keypair.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the operating system RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Rebuild a keypair from its 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The 32-byte seed. Handle with care: this is the private key.
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The seed as lowercase hex, the wallet file format.
    pub fn to_seed_hex(&self) -> String {
        to_hex(&self.to_seed())
    }

    /// Rebuild a keypair from a 64-character hex seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, ValidationError> {
        let bytes = hex_to_bytes(hex.trim())?;
        let seed: [u8; 32] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ValidationError::InvalidLength {
                    expected: 32,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_seed(&seed))
    }

    /// The public address of this keypair.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign arbitrary message bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({:?})", self.address())
    }
}

impl Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse from a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let bytes = hex_to_bytes(hex.trim())?;
        let arr: [u8; 64] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ValidationError::InvalidLength {
                    expected: 64,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Verify this signature over `message` against `signer`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyError`] if `signer` is not a valid public key
    /// (for example a program-derived address), and
    /// [`CryptoError::VerificationFailed`] if the signature does not match.
    pub fn verify(&self, message: &[u8], signer: &Address) -> Result<(), CryptoError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes())
            .map_err(|e| CryptoError::KeyError(format!("invalid public key {signer}: {e}")))?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify(message, &sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"fund escrow 1");
        assert!(sig.verify(b"fund escrow 1", &kp.address()).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let sig = kp.sign(b"release");
        let err = sig.verify(b"cancel", &kp.address()).unwrap_err();
        assert!(matches!(err, CryptoError::VerificationFailed(_)));
    }

    #[test]
    fn verify_rejects_other_signer() {
        let alice = Keypair::from_seed(&[1u8; 32]);
        let mallory = Keypair::from_seed(&[2u8; 32]);
        let sig = mallory.sign(b"release");
        assert!(sig.verify(b"release", &alice.address()).is_err());
    }

    #[test]
    fn seed_roundtrip_preserves_address() {
        let kp = Keypair::generate();
        let restored = Keypair::from_seed(&kp.to_seed());
        assert_eq!(restored.address(), kp.address());
    }

    #[test]
    fn seed_hex_restores_keypair() {
        let kp = Keypair::from_seed(&[7u8; 32]);
        let restored = Keypair::from_seed_hex(&format!("{}\n", kp.to_seed_hex())).unwrap();
        assert_eq!(restored.address(), kp.address());
        assert!(Keypair::from_seed_hex("00ff").is_err());
    }

    #[test]
    fn keypair_address_is_on_curve() {
        assert!(Keypair::generate().address().is_on_curve());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sig = Keypair::from_seed(&[5u8; 32]).sign(b"x");
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert!(Signature::from_hex("abcd").is_err());
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let kp = Keypair::from_seed(&[0x42u8; 32]);
        let dbg = format!("{kp:?}");
        assert!(!dbg.contains("4242424242"));
    }
}
