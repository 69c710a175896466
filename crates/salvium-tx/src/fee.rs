//! Fee estimation from structural transaction parameters.
//!
//! Size is estimated field by field from input/output counts and ring size,
//! weighted with the BP+ clawback for more than two outputs, then priced
//! with the consensus per-byte fee and a priority multiplier.

use crate::types::{output_tag, rct_type};
use salvium_types::consensus::{minimum_fee, FEE_MULTIPLIERS};

pub const DEFAULT_RING_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePriority {
    Low,
    Default,
    High,
    Priority,
}

impl FeePriority {
    pub fn multiplier(&self) -> u64 {
        FEE_MULTIPLIERS[*self as usize]
    }
}

/// Estimated serialized size in bytes.
pub fn estimate_tx_size(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
) -> usize {
    // version + unlock_time + the two counts.
    let mut size = 4usize;

    // Trailer: tx_type + amount_burnt + asset types + slippage + returns.
    size += 24;
    if out_tag == output_tag::CARROT_V1 {
        // v3+ TRANSFER return_address_list: 32 bytes per output + mask.
        size += num_outputs * 33 + 4;
    }

    // Inputs: tag + amount + asset + offsets count + offsets + key image.
    size += num_inputs * (1 + 1 + 5 + 1 + ring_size * 4 + 32);

    // Outputs.
    let per_output = match out_tag {
        output_tag::CARROT_V1 => 1 + 1 + 32 + 5 + 3 + 16,
        output_tag::TAGGED_KEY => 1 + 1 + 32 + 5 + 1 + 1,
        _ => 1 + 1 + 32 + 5 + 1,
    };
    size += num_outputs * per_output;

    // Extra: either one shared pubkey or one per output.
    size += 2 + 33 * num_outputs.max(1);

    // RCT base: type + fee + ecdh + outPk + p_r + salvium_data.
    size += 1 + 5 + num_outputs * 40 + 32 + 200;

    // Ring signatures and pseudo-outs.
    let sig_size = if use_tclsag { ring_size * 64 + 64 } else { ring_size * 32 + 64 };
    size += num_inputs * (sig_size + 32);

    // One aggregate BP+ proof.
    size += bp_plus_size(num_outputs);

    size
}

/// Weight = size + clawback for >2 outputs (batched proofs grow
/// sub-linearly, the clawback re-prices the saving).
pub fn estimate_tx_weight(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
) -> usize {
    let size = estimate_tx_size(num_inputs, num_outputs, ring_size, use_tclsag, out_tag);
    size + bp_plus_clawback(num_outputs)
}

/// The exact fee the consensus rules require for this shape, scaled by
/// priority.
pub fn estimate_fee(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
    priority: FeePriority,
) -> u64 {
    let weight = estimate_tx_weight(num_inputs, num_outputs, ring_size, use_tclsag, out_tag);
    minimum_fee(weight as u64, 2) * priority.multiplier()
}

/// Whether an RCT type signs with TCLSAG.
pub fn uses_tclsag(rct_ty: u8) -> bool {
    rct_ty == rct_type::SALVIUM_ONE
}

fn bp_plus_size(num_outputs: usize) -> usize {
    if num_outputs == 0 {
        return 0;
    }
    let nlr = 2 * (6 + log2_ceil(num_outputs));
    6 * 32 + 2 + nlr * 32
}

fn bp_plus_clawback(num_outputs: usize) -> usize {
    if num_outputs <= 2 {
        return 0;
    }
    let bp_base: usize = 32 * (6 + 7 * 2) / 2;
    let log_padded = log2_ceil(num_outputs);
    let padded = 1usize << log_padded;
    let nlr = 2 * (6 + log_padded);
    let bp_size = 32 * (6 + nlr);
    (bp_base * padded).saturating_sub(bp_size) * 4 / 5
}

fn log2_ceil(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    (usize::BITS - (n - 1).leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_multipliers() {
        assert_eq!(FeePriority::Low.multiplier(), 1);
        assert_eq!(FeePriority::Default.multiplier(), 5);
        assert_eq!(FeePriority::High.multiplier(), 25);
        assert_eq!(FeePriority::Priority.multiplier(), 1000);
    }

    #[test]
    fn size_orders_sensibly() {
        let base = estimate_tx_size(1, 2, 16, true, output_tag::CARROT_V1);
        assert!(estimate_tx_size(2, 2, 16, true, output_tag::CARROT_V1) > base);
        assert!(estimate_tx_size(1, 4, 16, true, output_tag::CARROT_V1) > base);
        assert!(estimate_tx_size(1, 2, 16, true, output_tag::CARROT_V1)
            > estimate_tx_size(1, 2, 16, false, output_tag::CARROT_V1));
    }

    #[test]
    fn two_in_two_out_in_expected_range() {
        let size = estimate_tx_size(2, 2, 16, true, output_tag::CARROT_V1);
        assert!(size > 2000 && size < 6000, "size {size}");
    }

    #[test]
    fn fee_scales_with_priority() {
        let low = estimate_fee(2, 2, 16, true, output_tag::CARROT_V1, FeePriority::Low);
        let default = estimate_fee(2, 2, 16, true, output_tag::CARROT_V1, FeePriority::Default);
        assert_eq!(default, low * 5);
        assert!(low > 0);
    }

    #[test]
    fn clawback_only_above_two_outputs() {
        assert_eq!(bp_plus_clawback(2), 0);
        assert!(bp_plus_clawback(8) > 0);
        let size = estimate_tx_size(1, 8, 16, true, output_tag::CARROT_V1);
        let weight = estimate_tx_weight(1, 8, 16, true, output_tag::CARROT_V1);
        assert!(weight > size);
    }

    #[test]
    fn log2_ceil_values() {
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(2), 1);
        assert_eq!(log2_ceil(3), 2);
        assert_eq!(log2_ceil(4), 2);
        assert_eq!(log2_ceil(16), 4);
        assert_eq!(log2_ceil(17), 5);
    }
}
