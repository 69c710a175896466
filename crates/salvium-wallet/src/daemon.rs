//! The daemon interface the sync engine consumes.
//!
//! The core never talks to the network itself; a transport (JSON-RPC,
//! embedded node, test fixture) implements [`DaemonSource`] and is called
//! synchronously by whoever drives the sync session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("daemon rejected transaction: {0}")]
    TxRejected(String),

    #[error("requested range {start}..{} beyond chain height {height}", start + count)]
    OutOfRange { start: u64, count: u64, height: u64 },
}

#[derive(Debug, Clone)]
pub struct DaemonInfo {
    /// Block count; the top block is `height - 1`.
    pub height: u64,
    pub network: salvium_types::Network,
}

/// One transaction as fetched with its block.
#[derive(Debug, Clone)]
pub struct TxEntry {
    pub hash: [u8; 32],
    pub bytes: Vec<u8>,
}

/// One block with the serialized transactions mined in it.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    pub height: u64,
    pub hash: [u8; 32],
    /// The serialized block (header + miner/protocol tx + tx hash list).
    pub block_bytes: Vec<u8>,
    /// The non-coinbase transactions, in block order.
    pub txs: Vec<TxEntry>,
}

/// A resolved ring member from the per-asset global output index.
#[derive(Debug, Clone, Copy)]
pub struct OutEntry {
    pub key: [u8; 32],
    pub commitment: [u8; 32],
    pub unlocked: bool,
    pub height: u64,
}

/// Synchronous daemon operations. Implementations may block; the core
/// itself never does.
pub trait DaemonSource {
    fn get_info(&self) -> Result<DaemonInfo, DaemonError>;

    /// Blocks `start_height..start_height + count`, ascending.
    fn get_blocks(&self, start_height: u64, count: u64)
        -> Result<Vec<BlockEntry>, DaemonError>;

    /// The ring-member oracle: absolute indices into the per-asset global
    /// output space.
    fn get_outs(&self, indices: &[u64], asset_type: &str)
        -> Result<Vec<OutEntry>, DaemonError>;

    fn send_raw_transaction(&self, tx_bytes: &[u8]) -> Result<(), DaemonError>;

    /// Per-byte fee estimate; callers may prefer the local estimator.
    fn get_fee_estimate(&self) -> Result<u64, DaemonError>;
}
