//! The wallet store interface and an in-memory reference implementation.
//!
//! The core never opens files or databases itself; any key/value engine
//! implementing [`WalletStore`] plugs in. Writes commit at operation
//! boundaries (the sync engine stores one block per commit), so a crash
//! never leaves torn state behind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use salvium_types::consensus::is_unlocked;
use salvium_types::{AddressEra, NetworkParams};

use crate::WalletError;

/// One owned output, append-only until spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnoteRecord {
    /// None in view-only wallets (which cannot compute it).
    pub key_image: Option<[u8; 32]>,
    pub onetime_address: [u8; 32],
    pub amount: u64,
    pub mask: [u8; 32],
    pub asset_type: String,
    pub era: AddressEra,
    /// PAYMENT (0) or CHANGE (1); always PAYMENT for legacy enotes.
    pub enote_type: u8,
    pub subaddress: (u32, u32),
    pub block_height: u64,
    pub tx_hash: [u8; 32],
    pub output_index: u32,
    pub unlock_time: u64,
    pub is_coinbase: bool,
    /// Contextualized sender-receiver secret, kept for CARROT spending.
    pub shared_secret: Option<[u8; 32]>,
    pub spent: Option<SpentInfo>,
    pub frozen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfo {
    pub tx_hash: [u8; 32],
    pub height: u64,
}

impl EnoteRecord {
    /// Identity for idempotent insertion: the key image when known,
    /// otherwise the one-time address.
    pub fn identity(&self) -> [u8; 32] {
        self.key_image.unwrap_or(self.onetime_address)
    }

    pub fn is_spent(&self) -> bool {
        self.spent.is_some()
    }
}

/// A transaction the wallet cares about (it received or spent in it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_hash: [u8; 32],
    pub block_height: u64,
    pub tx_type: u8,
    pub fee: u64,
    /// Sum received by this wallet.
    pub amount_in: u64,
    /// Sum spent from this wallet.
    pub amount_out: u64,
}

#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    pub asset_type: Option<String>,
    pub is_spent: Option<bool>,
    pub is_frozen: Option<bool>,
}

impl OutputFilter {
    pub fn matches(&self, enote: &EnoteRecord) -> bool {
        self.asset_type.as_ref().is_none_or(|a| *a == enote.asset_type)
            && self.is_spent.is_none_or(|s| s == enote.is_spent())
            && self.is_frozen.is_none_or(|f| f == enote.frozen)
    }
}

/// (total, unlocked, locked) for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    pub total: u64,
    pub unlocked: u64,
    pub locked: u64,
}

/// The key/value contract the sync engine drives.
pub trait WalletStore {
    /// Idempotent by [`EnoteRecord::identity`].
    fn put_output(&mut self, enote: EnoteRecord) -> Result<(), WalletError>;
    fn get_output(&self, key_image: &[u8; 32]) -> Option<EnoteRecord>;
    /// Atomic spent-marking.
    fn mark_output_spent(
        &mut self,
        key_image: &[u8; 32],
        spending_tx: [u8; 32],
        spent_height: u64,
    ) -> Result<(), WalletError>;
    /// Iteration order unspecified.
    fn get_outputs(&self, filter: &OutputFilter) -> Vec<EnoteRecord>;

    fn put_transaction(&mut self, record: TxRecord) -> Result<(), WalletError>;
    fn get_transaction(&self, tx_hash: &[u8; 32]) -> Option<TxRecord>;
    fn get_transactions(&self) -> Vec<TxRecord>;

    fn put_block_hash(&mut self, height: u64, hash: [u8; 32]) -> Result<(), WalletError>;
    fn get_block_hash(&self, height: u64) -> Option<[u8; 32]>;

    fn sync_height(&self) -> u64;
    /// Monotone except through [`WalletStore::rollback`].
    fn set_sync_height(&mut self, height: u64) -> Result<(), WalletError>;

    /// Atomic reorg recovery: drop block hashes and enotes above `height`,
    /// unmark outputs spent above it, pull the sync height back.
    fn rollback(&mut self, height: u64) -> Result<(), WalletError>;

    /// Balance under the consensus unlock rules (10 confirmations, 60 for
    /// coinbase, explicit unlock heights respected).
    fn balance(
        &self,
        asset_type: &str,
        current_height: u64,
        params: &NetworkParams,
    ) -> Balance {
        let filter = OutputFilter {
            asset_type: Some(asset_type.into()),
            is_spent: Some(false),
            is_frozen: Some(false),
        };
        let mut balance = Balance::default();
        for enote in self.get_outputs(&filter) {
            balance.total += enote.amount;
            if is_unlocked(
                params,
                enote.block_height,
                enote.unlock_time,
                enote.is_coinbase,
                current_height,
            ) {
                balance.unlocked += enote.amount;
            } else {
                balance.locked += enote.amount;
            }
        }
        balance
    }
}

// ─── In-memory store ────────────────────────────────────────────────────────

/// Reference store used by the tests and as a template for real backends.
#[derive(Default)]
pub struct MemoryStore {
    outputs: HashMap<[u8; 32], EnoteRecord>,
    transactions: HashMap<[u8; 32], TxRecord>,
    block_hashes: HashMap<u64, [u8; 32]>,
    sync_height: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryStore {
    fn put_output(&mut self, enote: EnoteRecord) -> Result<(), WalletError> {
        self.outputs.insert(enote.identity(), enote);
        Ok(())
    }

    fn get_output(&self, key_image: &[u8; 32]) -> Option<EnoteRecord> {
        self.outputs.get(key_image).cloned()
    }

    fn mark_output_spent(
        &mut self,
        key_image: &[u8; 32],
        spending_tx: [u8; 32],
        spent_height: u64,
    ) -> Result<(), WalletError> {
        match self.outputs.get_mut(key_image) {
            Some(enote) => {
                enote.spent = Some(SpentInfo { tx_hash: spending_tx, height: spent_height });
                Ok(())
            }
            None => Err(WalletError::Storage(format!(
                "mark_output_spent: unknown key image {}",
                hex::encode(key_image)
            ))),
        }
    }

    fn get_outputs(&self, filter: &OutputFilter) -> Vec<EnoteRecord> {
        self.outputs.values().filter(|e| filter.matches(e)).cloned().collect()
    }

    fn put_transaction(&mut self, record: TxRecord) -> Result<(), WalletError> {
        self.transactions.insert(record.tx_hash, record);
        Ok(())
    }

    fn get_transaction(&self, tx_hash: &[u8; 32]) -> Option<TxRecord> {
        self.transactions.get(tx_hash).cloned()
    }

    fn get_transactions(&self) -> Vec<TxRecord> {
        self.transactions.values().cloned().collect()
    }

    fn put_block_hash(&mut self, height: u64, hash: [u8; 32]) -> Result<(), WalletError> {
        self.block_hashes.insert(height, hash);
        Ok(())
    }

    fn get_block_hash(&self, height: u64) -> Option<[u8; 32]> {
        self.block_hashes.get(&height).copied()
    }

    fn sync_height(&self) -> u64 {
        self.sync_height
    }

    fn set_sync_height(&mut self, height: u64) -> Result<(), WalletError> {
        self.sync_height = height;
        Ok(())
    }

    fn rollback(&mut self, height: u64) -> Result<(), WalletError> {
        self.block_hashes.retain(|&h, _| h <= height);
        self.outputs.retain(|_, e| e.block_height <= height);
        self.transactions.retain(|_, t| t.block_height <= height);
        for enote in self.outputs.values_mut() {
            if enote.spent.is_some_and(|s| s.height > height) {
                enote.spent = None;
            }
        }
        self.sync_height = self.sync_height.min(height);
        Ok(())
    }
}
