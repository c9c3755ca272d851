//! # Error Hierarchy
//!
//! Structured error types for the foundational layer, built with
//! `thiserror`. Each variant carries the input that was rejected so the
//! failure can be diagnosed without reproducing it.

use thiserror::Error;

/// Errors raised while deriving or verifying a program-derived address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    /// More seeds were supplied than the derivation scheme accepts.
    #[error("too many seeds: {count} (max {max})")]
    TooManySeeds {
        /// Number of seeds supplied, including the bump if any.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// A single seed exceeds the per-seed length limit.
    #[error("seed {index} is {len} bytes long (max {max})")]
    SeedTooLong {
        /// Position of the offending seed.
        index: usize,
        /// Its length in bytes.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The candidate hash is a valid Ed25519 point, so a private key could
    /// exist for it. Such an address cannot serve as a keyless authority.
    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    /// Every bump value from 255 down to 0 produced an on-curve candidate.
    #[error("no off-curve address found for the supplied seeds")]
    Exhausted,
}

/// Validation errors for textual encodings of core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input contains a character outside `[0-9a-fA-F]` or has odd length.
    #[error("invalid hex string: \"{0}\"")]
    InvalidHex(String),

    /// Decoded byte length does not match the expected width.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Width required by the target type.
        expected: usize,
        /// Width actually decoded.
        actual: usize,
    },
}

/// Errors from Ed25519 signing and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature did not verify against the message and public key.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// The address is not a usable Ed25519 public key.
    #[error("key error: {0}")]
    KeyError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_seeds_display() {
        let err = DerivationError::TooManySeeds { count: 17, max: 16 };
        let msg = format!("{err}");
        assert!(msg.contains("17"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn seed_too_long_display() {
        let err = DerivationError::SeedTooLong {
            index: 2,
            len: 40,
            max: 32,
        };
        let msg = format!("{err}");
        assert!(msg.contains("seed 2"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn invalid_hex_display() {
        let err = ValidationError::InvalidHex("zz".to_string());
        assert!(format!("{err}").contains("zz"));
    }

    #[test]
    fn invalid_length_display() {
        let err = ValidationError::InvalidLength {
            expected: 32,
            actual: 31,
        };
        let msg = format!("{err}");
        assert!(msg.contains("32"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn crypto_error_display() {
        let err = CryptoError::VerificationFailed("bad signature".to_string());
        assert!(format!("{err}").contains("bad signature"));
    }
}
