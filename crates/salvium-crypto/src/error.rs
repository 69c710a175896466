//! Crypto error kinds.
//!
//! Pure functions return these without logging; the taxonomy mirrors the
//! wallet-wide policy (encoding errors vs. failed cryptographic checks).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("bytes are not a canonical Ed25519 point")]
    InvalidPoint,

    #[error("bytes are not a canonical scalar (>= group order)")]
    InvalidScalar,

    #[error("scalar inversion of zero")]
    ZeroInverse,

    #[error("key image is not in the prime-order subgroup")]
    KeyImageSubgroup,

    #[error("ring signature invalid")]
    RingSignatureInvalid,

    #[error("range proof invalid")]
    RangeProofInvalid,

    #[error("commitment does not match amount and mask")]
    CommitmentMismatch,

    #[error("ring index {index} out of bounds for ring of {len}")]
    BadRingIndex { index: usize, len: usize },

    #[error("ring and commitment lengths differ")]
    RingShapeMismatch,
}
