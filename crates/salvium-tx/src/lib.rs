//! Transaction engine: typed model, consensus binary codec, builder,
//! signer, and validator.
//!
//! The codec is bit-exact with the reference chain;
//! `parse(serialize(tx)) == tx` holds for every consensus-valid
//! transaction (and the integration tests exercise it end to end against
//! the builder and validator).

pub mod builder;
pub mod codec;
pub mod extra;
pub mod fee;
pub mod sign;
pub mod types;
pub mod verify;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("truncated at offset {offset}: need {need} more bytes")]
    Truncated { offset: usize, need: usize },

    #[error("varint at offset {offset} is malformed or exceeds 10 bytes")]
    BadVarint { offset: usize },

    #[error("unknown input type tag 0x{0:02x}")]
    UnknownInputType(u8),

    #[error("unknown output type tag 0x{0:02x}")]
    UnknownOutputType(u8),

    #[error("unsupported RCT type {0}")]
    UnknownRctType(u8),

    #[error("asset type is not valid UTF-8")]
    BadAssetType,

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("no destinations and nothing burnt")]
    NoDestinations,

    #[error("transaction needs at least one input")]
    NoInputs,

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("ring has {available} members, {requested} required")]
    RingTooSmall { requested: usize, available: usize },

    #[error("input {index}: real index {real} outside ring of {len}")]
    BadRealIndex { index: usize, real: usize, len: usize },

    #[error("duplicate key image across inputs")]
    DuplicateKeyImage,

    #[error("change address required for nonzero change")]
    MissingChangeAddress,

    #[error("input {0} lacks the T-component secret required by TCLSAG")]
    MissingTwinSecret(usize),

    #[error("destination address era does not match the RCT type")]
    EraMismatch,

    #[error("crypto: {0}")]
    Crypto(#[from] salvium_crypto::CryptoError),

    #[error("signing failed: {0}")]
    Signing(String),
}
