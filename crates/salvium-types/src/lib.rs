//! Core types and network parameters for the Salvium wallet core.
//!
//! This crate has no cryptography beyond the Keccak checksum used by the
//! address codec. Everything here is a fixed network parameter or a plain
//! data type shared by the higher layers.

pub mod address;
pub mod base58;
pub mod consensus;
pub mod network;

pub use address::{Address, AddressError};
pub use network::{AddressEra, AddressKind, Network, NetworkParams};

/// Atomic units per coin (10^8).
pub const COIN: u64 = 100_000_000;

/// Format an atomic amount as a human-readable decimal string.
pub fn format_amount(atomic: u64) -> String {
    let whole = atomic / COIN;
    let frac = atomic % COIN;
    if frac == 0 {
        return format!("{whole}.0");
    }
    let frac = format!("{frac:08}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse a decimal amount string into atomic units.
pub fn parse_amount(s: &str) -> Option<u64> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let whole: u64 = whole.parse().ok()?;
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        if frac.len() > 8 || frac.bytes().any(|b| !b.is_ascii_digit()) {
            return None;
        }
        format!("{frac:0<8}").parse().ok()?
    };
    whole.checked_mul(COIN)?.checked_add(frac)
}
