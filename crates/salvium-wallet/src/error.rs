//! Wallet error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid seed length: expected 32, got {0}")]
    InvalidSeedLength(usize),

    #[error("wallet is view-only, cannot {0}")]
    ViewOnly(&'static str),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("daemon error: {0}")]
    Daemon(#[from] crate::daemon::DaemonError),

    #[error("crypto error: {0}")]
    Crypto(#[from] salvium_crypto::CryptoError),

    #[error("transaction error: {0}")]
    Tx(#[from] salvium_tx::TxError),

    #[error("address error: {0}")]
    Address(#[from] salvium_types::AddressError),

    /// Stored block hash at `height` no longer matches the chain — the
    /// caller should roll back to below the fork and resume.
    #[error("chain reorganization detected at height {height}")]
    Reorg { height: u64 },

    #[error("sync cancelled")]
    Cancelled,
}
