//! Cooperative blockchain sync.
//!
//! [`SyncSession`] owns the scan context and the store; the caller drives
//! [`SyncSession::next_batch`] with a daemon source and decides how to
//! schedule the batches. Each block commits to the store as a unit, so a
//! cancelled or crashed sync resumes exactly where it left off. A stored
//! block hash that no longer matches the chain surfaces as
//! [`WalletError::Reorg`]; the caller rolls back and resumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use salvium_tx::codec::{parse_block, parse_transaction, tx_hash};
use salvium_tx::types::Transaction;

use crate::daemon::{BlockEntry, DaemonSource};
use crate::scanner::{scan_transaction, ScanContext};
use crate::store::{TxRecord, WalletStore};
use crate::WalletError;

/// What one `next_batch` call achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProgress {
    /// More blocks remain; call again.
    Progress { processed_to_height: u64 },
    /// The store is at the chain tip.
    Done { height: u64 },
}

pub struct SyncSession<S: WalletStore> {
    store: S,
    ctx: ScanContext,
    batch_size: u64,
    cancel: Arc<AtomicBool>,
}

impl<S: WalletStore> SyncSession<S> {
    pub fn new(store: S, ctx: ScanContext) -> Self {
        Self {
            store,
            ctx,
            batch_size: 100,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Signal handle: set to true from any thread to stop between blocks.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Roll the store back below a fork and clear the cancel flag.
    pub fn handle_reorg(&mut self, height: u64) -> Result<(), WalletError> {
        info!("rolling back to height {height}");
        self.store.rollback(height)
    }

    /// Fetch, scan, and commit up to `batch_size` blocks.
    pub fn next_batch(&mut self, daemon: &dyn DaemonSource) -> Result<SyncProgress, WalletError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(WalletError::Cancelled);
        }

        let info = daemon.get_info()?;
        let top = info.height.saturating_sub(1);
        let start = self.store.sync_height();
        if start >= top {
            return Ok(SyncProgress::Done { height: start });
        }

        let count = self.batch_size.min(top - start);
        let blocks = daemon.get_blocks(start + 1, count)?;

        let mut processed = start;
        for entry in &blocks {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(WalletError::Cancelled);
            }
            self.process_block(entry)?;
            processed = entry.height;
        }

        debug!("synced to {processed} of {top}");
        if processed >= top {
            Ok(SyncProgress::Done { height: processed })
        } else {
            Ok(SyncProgress::Progress { processed_to_height: processed })
        }
    }

    fn process_block(&mut self, entry: &BlockEntry) -> Result<(), WalletError> {
        let block = parse_block(&entry.block_bytes)?;

        // Continuity against what we already stored; a mismatch means the
        // chain below us changed.
        if entry.height > 0 {
            if let Some(stored_prev) = self.store.get_block_hash(entry.height - 1) {
                if stored_prev != block.header.prev_id {
                    return Err(WalletError::Reorg { height: entry.height - 1 });
                }
            }
        }

        // Discovery first, in (tx index, output index) order; spent-marking
        // is applied after all of the block's discovery.
        let mut found = Vec::new();
        let mut spends: Vec<([u8; 32], [u8; 32], u64)> = Vec::new();

        for tx in [&block.miner_tx, &block.protocol_tx] {
            let hash = tx_hash(tx);
            found.extend(scan_transaction(&self.ctx, tx, hash, entry.height));
        }

        for tx_entry in &entry.txs {
            let tx = parse_transaction(&tx_entry.bytes)?;
            self.collect_spends(&tx, tx_entry.hash, entry.height, &mut spends);
            let enotes = scan_transaction(&self.ctx, &tx, tx_entry.hash, entry.height);
            if !enotes.is_empty() || spends.iter().any(|(_, h, _)| *h == tx_entry.hash) {
                let amount_in = enotes.iter().map(|e| e.amount).sum();
                let amount_out = spends
                    .iter()
                    .filter(|(_, h, _)| *h == tx_entry.hash)
                    .filter_map(|(image, _, _)| self.store.get_output(image))
                    .map(|e| e.amount)
                    .sum();
                self.store.put_transaction(TxRecord {
                    tx_hash: tx_entry.hash,
                    block_height: entry.height,
                    tx_type: tx.prefix.tx_type,
                    fee: tx.rct.as_ref().map(|r| r.fee).unwrap_or(0),
                    amount_in,
                    amount_out,
                })?;
            }
            found.extend(enotes);
        }

        for enote in found {
            self.store.put_output(enote)?;
        }
        for (image, spending_tx, height) in spends {
            self.store.mark_output_spent(&image, spending_tx, height)?;
        }

        self.store.put_block_hash(entry.height, entry.hash)?;
        self.store.set_sync_height(entry.height)?;
        Ok(())
    }

    /// Inputs whose key image matches one of our unspent enotes are our
    /// own spends.
    fn collect_spends(
        &self,
        tx: &Transaction,
        tx_hash: [u8; 32],
        height: u64,
        spends: &mut Vec<([u8; 32], [u8; 32], u64)>,
    ) {
        for image in tx.prefix.key_images() {
            if let Some(enote) = self.store.get_output(image) {
                if !enote.is_spent() {
                    spends.push((*image, tx_hash, height));
                }
            }
        }
    }
}
