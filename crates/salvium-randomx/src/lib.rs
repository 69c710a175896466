//! Native RandomX proof-of-work engine.
//!
//! Layering: [`argon2d`] seeds the 256 MiB cache, [`superscalar`] expands it
//! into dataset items ([`dataset`]), and [`vm`] runs the 8-program hash
//! chain over a 2 MiB scratchpad. Light mode computes dataset items on
//! demand; full mode precomputes the 2 GiB table once. Given the same seed
//! and input, both modes produce bit-identical hashes.
//!
//! The cache and dataset are immutable after construction and may be shared
//! by any number of VMs; each VM is single-owner (one per thread).
//!
//! ```no_run
//! use salvium_randomx::{RandomXCache, RandomXVm};
//!
//! let cache = RandomXCache::new(b"seed");
//! let mut vm = RandomXVm::light(&cache);
//! let hash = vm.calculate_hash(b"block hashing blob");
//! # let _ = hash;
//! ```

use thiserror::Error;

pub mod aes;
pub mod argon2d;
pub mod blake2_gen;
pub mod dataset;
pub mod program;
pub mod reciprocal;
pub mod superscalar;
pub mod vm;

pub use dataset::{RandomXCache, RandomXDataset, DATASET_ITEM_COUNT};
pub use vm::{DatasetAccess, RandomXVm, SCRATCHPAD_SIZE};

#[derive(Debug, Error)]
pub enum RandomXError {
    #[error("allocation of {0} bytes failed")]
    Allocation(usize),

    #[error("dataset initialization cancelled")]
    Cancelled,
}

/// One-shot light-mode hash; prefer holding a [`RandomXCache`] when hashing
/// more than once per seed.
pub fn randomx_hash_light(key: &[u8], input: &[u8]) -> [u8; 32] {
    let cache = RandomXCache::new(key);
    RandomXVm::light(&cache).calculate_hash(input)
}
