//! Cache and dataset: the 256 MiB Argon2d buffer with its 8 superscalar
//! programs, and the 2 GiB expanded item table for full mode.
//!
//! Both structures are immutable after construction and safe to share
//! across any number of VMs.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::argon2d::{self, Block, BLOCK_SIZE};
use crate::blake2_gen::Blake2Generator;
use crate::superscalar::{self, SuperscalarProgram};
use crate::RandomXError;

pub const CACHE_ACCESSES: usize = 8;
pub const CACHE_LINE_SIZE: usize = 64;
pub const DATASET_BASE_SIZE: u64 = 2_147_483_648;
pub const DATASET_EXTRA_SIZE: u64 = 33_554_368;

/// Number of 64-byte items in the full dataset (including the extra tail).
pub const DATASET_ITEM_COUNT: u64 = (DATASET_BASE_SIZE + DATASET_EXTRA_SIZE) / 64;

// Item initialization constants (specs 7.3).
const SUPERSCALAR_MUL0: u64 = 6364136223846793005;
const SUPERSCALAR_ADD: [u64; 7] = [
    9298411001130361340,
    12065312585734608966,
    9306329213124626780,
    5281919268842080866,
    10536153434571861004,
    3398623926847679864,
    9549104520008361294,
];

/// The light-mode working set: Argon2d memory plus the item programs.
pub struct RandomXCache {
    memory: Vec<Block>,
    programs: Vec<SuperscalarProgram>,
}

impl RandomXCache {
    /// Seed the cache: Argon2d fill, then 8 superscalar programs from one
    /// sequential Blake2 stream.
    pub fn new(key: &[u8]) -> Self {
        log::debug!("initializing RandomX cache ({} byte key)", key.len());
        let memory = argon2d::fill_memory(key);
        let mut gen = Blake2Generator::new(key, 0);
        let programs = (0..CACHE_ACCESSES).map(|_| superscalar::generate(&mut gen)).collect();
        Self { memory, programs }
    }

    fn cache_line(&self, register_value: u64) -> [u64; 8] {
        let total_lines = (self.memory.len() * BLOCK_SIZE / CACHE_LINE_SIZE) as u64;
        let line = register_value % total_lines;
        let block = (line as usize * CACHE_LINE_SIZE) / BLOCK_SIZE;
        let word = (line as usize * CACHE_LINE_SIZE % BLOCK_SIZE) / 8;
        let mut out = [0u64; 8];
        out.copy_from_slice(&self.memory[block].0[word..word + 8]);
        out
    }

    /// Compute one 64-byte dataset item (the SuperscalarHash chain).
    pub fn dataset_item(&self, item_number: u64) -> [u8; 64] {
        let mut r = [0u64; 8];
        r[0] = item_number.wrapping_add(1).wrapping_mul(SUPERSCALAR_MUL0);
        for i in 1..8 {
            r[i] = r[0] ^ SUPERSCALAR_ADD[i - 1];
        }

        let mut register_value = item_number;
        for program in &self.programs {
            let line = self.cache_line(register_value);
            superscalar::execute(program, &mut r);
            for (reg, word) in r.iter_mut().zip(line.iter()) {
                *reg ^= word;
            }
            register_value = r[program.address_register];
        }

        let mut out = [0u8; 64];
        for (chunk, reg) in out.chunks_exact_mut(8).zip(r.iter()) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        out
    }

    pub fn programs(&self) -> &[SuperscalarProgram] {
        &self.programs
    }
}

/// The full-mode 2 GiB item table.
pub struct RandomXDataset {
    items: Vec<u8>,
}

impl RandomXDataset {
    /// Expand the cache into the full dataset across `threads` workers.
    /// The cancel flag is polled between work chunks; on cancellation the
    /// partial buffer is dropped.
    pub fn new(
        cache: &RandomXCache,
        threads: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self, RandomXError> {
        let threads = threads.max(1);
        let total = DATASET_ITEM_COUNT;
        log::info!("building RandomX dataset: {total} items on {threads} threads");

        let mut items = vec![0u8; (total as usize) * CACHE_LINE_SIZE];

        let chunk_items = total.div_ceil(threads as u64);
        let cancelled = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads);
            for (worker, slice) in
                items.chunks_mut(chunk_items as usize * CACHE_LINE_SIZE).enumerate()
            {
                let first_item = worker as u64 * chunk_items;
                handles.push(scope.spawn(move || {
                    // Poll cancellation every 4096 items.
                    for (i, out) in slice.chunks_exact_mut(CACHE_LINE_SIZE).enumerate() {
                        if i % 4096 == 0 {
                            if let Some(flag) = cancel {
                                if flag.load(Ordering::Relaxed) {
                                    return true;
                                }
                            }
                        }
                        out.copy_from_slice(&cache.dataset_item(first_item + i as u64));
                    }
                    false
                }));
            }
            handles.into_iter().any(|h| h.join().expect("dataset worker panicked"))
        });

        if cancelled {
            return Err(RandomXError::Cancelled);
        }
        Ok(Self { items })
    }

    pub fn item(&self, item_number: u64) -> &[u8] {
        let offset = item_number as usize * CACHE_LINE_SIZE;
        &self.items[offset..offset + CACHE_LINE_SIZE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full 256 MiB cache construction is exercised here once; keep it
    // shared across assertions.
    fn test_cache() -> &'static RandomXCache {
        use std::sync::OnceLock;
        static CACHE: OnceLock<RandomXCache> = OnceLock::new();
        CACHE.get_or_init(|| RandomXCache::new(b"test key 000"))
    }

    #[test]
    fn dataset_item_zero_reference_vector() {
        let item = test_cache().dataset_item(0);
        let first_word = u64::from_le_bytes(item[..8].try_into().unwrap());
        assert_eq!(first_word, 0x680588a85ae222db);
    }

    #[test]
    fn dataset_items_are_deterministic_and_distinct() {
        let cache = test_cache();
        assert_eq!(cache.dataset_item(12345), cache.dataset_item(12345));
        assert_ne!(cache.dataset_item(0), cache.dataset_item(1));
        assert_ne!(cache.dataset_item(1), cache.dataset_item(DATASET_ITEM_COUNT - 1));
    }

    #[test]
    fn cache_has_eight_programs() {
        assert_eq!(test_cache().programs().len(), CACHE_ACCESSES);
    }

    #[test]
    fn item_count_constant() {
        assert_eq!(DATASET_ITEM_COUNT, 34_078_719);
    }

    #[test]
    fn cancellation_aborts_dataset_build() {
        let cancel = AtomicBool::new(true);
        let result = RandomXDataset::new(test_cache(), 2, Some(&cancel));
        assert!(matches!(result, Err(RandomXError::Cancelled)));
    }
}
