//! Subaddress derivation and lookup tables for both eras.
//!
//! Legacy CryptoNote offsets the spend key additively with
//! `m = H_s("SubAddr\0" || k_v || major || minor)`. CARROT does the same over
//! G with a scalar drawn from the generate-address secret:
//! `K_j = K_s + H_n[s_ga]("Carrot subaddress scalar" || major || minor) * G`.
//! Index (0, 0) is the account's own address in both eras.

use std::collections::HashMap;

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::scalar::Scalar;

use crate::carrot_keys::{self, domain};
use crate::{decompress, hash_to_scalar_parts, scalar, CryptoError};

/// Map from subaddress spend pubkey to its (major, minor) index.
pub type SubaddressTable = HashMap<[u8; 32], (u32, u32)>;

// ─── Legacy CryptoNote ──────────────────────────────────────────────────────

/// `m = H_s("SubAddr\0" || k_v || major_le || minor_le)`.
pub fn cn_subaddress_secret(view_secret: &[u8; 32], major: u32, minor: u32) -> Scalar {
    hash_to_scalar_parts(&[
        b"SubAddr\0",
        view_secret,
        &major.to_le_bytes(),
        &minor.to_le_bytes(),
    ])
}

/// Subaddress spend pubkey `K_s + m*G` (the account key itself at (0,0)).
pub fn cn_subaddress_spend_pubkey(
    spend_pubkey: &[u8; 32],
    view_secret: &[u8; 32],
    major: u32,
    minor: u32,
) -> Result<[u8; 32], CryptoError> {
    if major == 0 && minor == 0 {
        return Ok(*spend_pubkey);
    }
    let m = cn_subaddress_secret(view_secret, major, minor);
    let point = decompress(spend_pubkey)? + ED25519_BASEPOINT_TABLE * &m;
    Ok(point.compress().to_bytes())
}

/// Subaddress view pubkey `k_v * K_j`.
pub fn cn_subaddress_view_pubkey(
    subaddress_spend_pubkey: &[u8; 32],
    view_secret: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    Ok((scalar(view_secret) * decompress(subaddress_spend_pubkey)?)
        .compress()
        .to_bytes())
}

/// Precompute the lookup table for majors `0..=major_count` and minors
/// `0..=minor_count`.
pub fn cn_subaddress_table(
    spend_pubkey: &[u8; 32],
    view_secret: &[u8; 32],
    major_count: u32,
    minor_count: u32,
) -> Result<SubaddressTable, CryptoError> {
    let mut table =
        HashMap::with_capacity((major_count as usize + 1) * (minor_count as usize + 1));
    for major in 0..=major_count {
        for minor in 0..=minor_count {
            let key = cn_subaddress_spend_pubkey(spend_pubkey, view_secret, major, minor)?;
            table.entry(key).or_insert((major, minor));
        }
    }
    Ok(table)
}

// ─── CARROT ─────────────────────────────────────────────────────────────────

/// `H_n[s_ga]("Carrot subaddress scalar" || major_le || minor_le)`.
pub fn carrot_subaddress_scalar(
    generate_address_secret: &[u8; 32],
    major: u32,
    minor: u32,
) -> Scalar {
    carrot_keys::derive_scalar(
        generate_address_secret,
        domain::SUBADDRESS_SCALAR,
        &[&major.to_le_bytes(), &minor.to_le_bytes()],
    )
}

/// CARROT subaddress spend pubkey `K_s + m*G` ((0,0) is the account key).
pub fn carrot_subaddress_spend_pubkey(
    account_spend_pubkey: &[u8; 32],
    generate_address_secret: &[u8; 32],
    major: u32,
    minor: u32,
) -> Result<[u8; 32], CryptoError> {
    if major == 0 && minor == 0 {
        return Ok(*account_spend_pubkey);
    }
    let m = carrot_subaddress_scalar(generate_address_secret, major, minor);
    let point = decompress(account_spend_pubkey)? + ED25519_BASEPOINT_TABLE * &m;
    Ok(point.compress().to_bytes())
}

/// CARROT subaddress view pubkey `k_vi * K_j`.
pub fn carrot_subaddress_view_pubkey(
    subaddress_spend_pubkey: &[u8; 32],
    view_incoming_key: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    Ok((scalar(view_incoming_key) * decompress(subaddress_spend_pubkey)?)
        .compress()
        .to_bytes())
}

/// Precompute the CARROT lookup table.
pub fn carrot_subaddress_table(
    account_spend_pubkey: &[u8; 32],
    generate_address_secret: &[u8; 32],
    major_count: u32,
    minor_count: u32,
) -> Result<SubaddressTable, CryptoError> {
    let mut table =
        HashMap::with_capacity((major_count as usize + 1) * (minor_count as usize + 1));
    for major in 0..=major_count {
        for minor in 0..=minor_count {
            let key = carrot_subaddress_spend_pubkey(
                account_spend_pubkey,
                generate_address_secret,
                major,
                minor,
            )?;
            table.entry(key).or_insert((major, minor));
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrot_keys::CarrotKeys;
    use crate::scalar_mult_base;

    #[test]
    fn cn_zero_index_is_account_key() {
        let spend = scalar_mult_base(&crate::hash_to_scalar(b"spend").to_bytes());
        let view = crate::hash_to_scalar(b"view").to_bytes();
        assert_eq!(cn_subaddress_spend_pubkey(&spend, &view, 0, 0).unwrap(), spend);
        assert_ne!(cn_subaddress_spend_pubkey(&spend, &view, 0, 1).unwrap(), spend);
    }

    #[test]
    fn cn_table_maps_back_to_indices() {
        let spend = scalar_mult_base(&crate::hash_to_scalar(b"s2").to_bytes());
        let view = crate::hash_to_scalar(b"v2").to_bytes();
        let table = cn_subaddress_table(&spend, &view, 2, 3).unwrap();
        assert_eq!(table.len(), 12);
        let key = cn_subaddress_spend_pubkey(&spend, &view, 1, 2).unwrap();
        assert_eq!(table.get(&key), Some(&(1, 2)));
    }

    #[test]
    fn carrot_subaddress_is_additive_over_g() {
        // K_j == K_s + m*G, bit-exactly.
        let keys = CarrotKeys::from_master(&[9; 32]);
        let m = carrot_subaddress_scalar(&keys.generate_address_secret, 3, 7);
        let expected = crate::point_add(
            &keys.account_spend_pubkey,
            &scalar_mult_base(&m.to_bytes()),
        )
        .unwrap();
        let derived = carrot_subaddress_spend_pubkey(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            3,
            7,
        )
        .unwrap();
        assert_eq!(derived, expected);
    }

    #[test]
    fn carrot_table_contains_account_key_at_origin() {
        let keys = CarrotKeys::from_master(&[11; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            1,
            1,
        )
        .unwrap();
        assert_eq!(table.get(&keys.account_spend_pubkey), Some(&(0, 0)));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn view_pubkeys_follow_spend_keys() {
        let keys = CarrotKeys::from_master(&[13; 32]);
        let sub = carrot_subaddress_spend_pubkey(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            0,
            5,
        )
        .unwrap();
        let view = carrot_subaddress_view_pubkey(&sub, &keys.view_incoming_key).unwrap();
        assert_ne!(view, keys.account_view_pubkey);
    }
}
