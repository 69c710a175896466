//! Consensus constants used by the fee estimator and balance logic.
//!
//! Reference: salvium/src/cryptonote_config.h.

use crate::network::NetworkParams;

/// Per-byte fee from the per-byte-fee hard fork onward.
pub const FEE_PER_BYTE: u64 = 30;

/// Per-kilobyte fee before the per-byte fork.
pub const FEE_PER_KB: u64 = 200_000;

/// Dust threshold below which outputs are not worth spending.
pub const DEFAULT_DUST_THRESHOLD: u64 = 2_000_000_000;

/// Fee priority multipliers, indexed low / default / high / priority.
pub const FEE_MULTIPLIERS: [u64; 4] = [1, 5, 25, 1000];

/// Minimum fee for a transaction of `tx_weight` bytes at fork `version`.
pub fn minimum_fee(tx_weight: u64, version: u8) -> u64 {
    if version >= 1 {
        tx_weight * FEE_PER_BYTE
    } else {
        tx_weight.div_ceil(1024) * FEE_PER_KB
    }
}

/// Whether an output mined or received at `output_height` is unlocked at
/// `current_height`. Coinbase outputs wait 60 blocks, everything else 10;
/// an explicit `unlock_time` (block height) dominates when later.
pub fn is_unlocked(
    params: &NetworkParams,
    output_height: u64,
    unlock_time: u64,
    is_coinbase: bool,
    current_height: u64,
) -> bool {
    let age = if is_coinbase { params.coinbase_unlock } else { params.spendable_age };
    if current_height < output_height + age {
        return false;
    }
    // unlock_time below ~500M is a block height; larger values are unix
    // timestamps, which the wallet core does not track.
    const UNLOCK_TIME_IS_TIMESTAMP: u64 = 500_000_000;
    if unlock_time != 0 && unlock_time < UNLOCK_TIME_IS_TIMESTAMP {
        return current_height >= unlock_time;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MAINNET;

    #[test]
    fn per_byte_fee() {
        assert_eq!(minimum_fee(3000, 2), 3000 * FEE_PER_BYTE);
    }

    #[test]
    fn legacy_kb_fee_rounds_up() {
        assert_eq!(minimum_fee(1025, 0), 2 * FEE_PER_KB);
    }

    #[test]
    fn coinbase_needs_sixty_confirmations() {
        assert!(!is_unlocked(&MAINNET, 100, 0, true, 159));
        assert!(is_unlocked(&MAINNET, 100, 0, true, 160));
    }

    #[test]
    fn normal_output_needs_ten_confirmations() {
        assert!(!is_unlocked(&MAINNET, 100, 0, false, 109));
        assert!(is_unlocked(&MAINNET, 100, 0, false, 110));
    }

    #[test]
    fn explicit_unlock_height_dominates() {
        // Staked output locked until height 21700.
        assert!(!is_unlocked(&MAINNET, 100, 21_700, false, 200));
        assert!(is_unlocked(&MAINNET, 100, 21_700, false, 21_700));
    }
}
