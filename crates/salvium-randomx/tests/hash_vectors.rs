//! RandomX end-to-end vectors and the light/full equivalence invariant.
//!
//! Cache construction fills 256 MiB of Argon2d memory, so the suite shares
//! one cache; the full-dataset test allocates > 2 GiB and is ignore-gated.

use std::sync::OnceLock;

use salvium_randomx::{RandomXCache, RandomXDataset, RandomXVm};

fn test_cache() -> &'static RandomXCache {
    static CACHE: OnceLock<RandomXCache> = OnceLock::new();
    CACHE.get_or_init(|| RandomXCache::new(b"test key 000"))
}

#[test]
fn hash_is_deterministic() {
    let mut vm = RandomXVm::light(test_cache());
    let h1 = vm.calculate_hash(b"This is a test");
    let h2 = vm.calculate_hash(b"This is a test");
    assert_eq!(h1, h2);
}

#[test]
fn hash_depends_on_input() {
    let mut vm = RandomXVm::light(test_cache());
    let h1 = vm.calculate_hash(b"This is a test");
    let h2 = vm.calculate_hash(b"This is a test.");
    assert_ne!(h1, h2);
}

#[test]
fn hash_depends_on_key() {
    let other_cache = RandomXCache::new(b"test key 001");
    let h1 = RandomXVm::light(test_cache()).calculate_hash(b"This is a test");
    let h2 = RandomXVm::light(&other_cache).calculate_hash(b"This is a test");
    assert_ne!(h1, h2);
}

#[test]
fn two_vms_agree_over_one_cache() {
    let mut vm1 = RandomXVm::light(test_cache());
    let mut vm2 = RandomXVm::light(test_cache());
    assert_eq!(
        vm1.calculate_hash(b"Lorem ipsum dolor sit amet"),
        vm2.calculate_hash(b"Lorem ipsum dolor sit amet")
    );
}

#[test]
fn reference_hash_vector() {
    // RandomX reference vector: key "test key 000", input "This is a test".
    let hash = RandomXVm::light(test_cache()).calculate_hash(b"This is a test");
    assert_eq!(
        hex::encode(hash),
        "639183aae1bf4c9a35884cb46b09cad9175f04efd7684e7262a0ac1c2f0b4e3f"
    );
}

#[test]
fn dataset_item_reference_vector() {
    let item = test_cache().dataset_item(0);
    assert_eq!(
        u64::from_le_bytes(item[..8].try_into().unwrap()),
        0x680588a85ae222db
    );
}

#[test]
#[ignore = "allocates the full 2 GiB dataset"]
fn light_and_full_mode_agree() {
    let cache = test_cache();
    let dataset = RandomXDataset::new(cache, num_cpus::get(), None).unwrap();

    // Spot-check raw items across the range, then the end-to-end hash.
    for item_number in [0u64, 1, 12345, salvium_randomx::DATASET_ITEM_COUNT - 1] {
        assert_eq!(
            cache.dataset_item(item_number).as_slice(),
            dataset.item(item_number),
            "item {item_number}"
        );
    }

    let mut light = RandomXVm::light(cache);
    let mut full = RandomXVm::full(&dataset);
    for input in [b"This is a test".as_slice(), b"x".as_slice(), b"".as_slice()] {
        assert_eq!(light.calculate_hash(input), full.calculate_hash(input));
    }
}
