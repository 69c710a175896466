//! Legacy CryptoNote output derivation and scanning.
//!
//! The classic stealth-address construction: the sender publishes `R = r*G`,
//! the receiver computes the shared derivation `D = 8*k_v*R`, and the
//! one-time key for output `i` is `Ko = H_s(D || varint(i))*G + K_j_s`.
//! Post-view-tag-fork outputs carry a 1-byte fast-reject tag.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::scalar::Scalar;

use crate::pedersen::{commit, gen_commitment_mask, zero_commit_mask};
use crate::subaddress::{cn_subaddress_secret, SubaddressTable};
use crate::{
    decompress, generate_key_image, hash_to_scalar, keccak256, scalar, CryptoError,
};

fn push_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// `D = 8 * (secret * P)` — the CryptoNote ECDH with cofactor clearing.
pub fn generate_key_derivation(
    pubkey: &[u8; 32],
    secret: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let shared = scalar(secret) * decompress(pubkey)?;
    Ok(shared.mul_by_cofactor().compress().to_bytes())
}

/// `H_s(D || varint(index))`.
pub fn derivation_to_scalar(derivation: &[u8; 32], output_index: u32) -> Scalar {
    let mut buf = Vec::with_capacity(32 + 5);
    buf.extend_from_slice(derivation);
    push_varint(&mut buf, output_index as u64);
    hash_to_scalar(&buf)
}

/// One-time output key: `H_s(D || i)*G + K_spend`.
pub fn derive_public_key(
    derivation: &[u8; 32],
    output_index: u32,
    spend_pubkey: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let h = derivation_to_scalar(derivation, output_index);
    let point = ED25519_BASEPOINT_TABLE * &h + decompress(spend_pubkey)?;
    Ok(point.compress().to_bytes())
}

/// One-time output secret: `H_s(D || i) + k_spend`.
pub fn derive_secret_key(
    derivation: &[u8; 32],
    output_index: u32,
    spend_secret: &[u8; 32],
) -> [u8; 32] {
    (derivation_to_scalar(derivation, output_index) + scalar(spend_secret)).to_bytes()
}

/// 1-byte view tag: `keccak256("view_tag" || D || varint(i))[0]`.
pub fn derive_view_tag(derivation: &[u8; 32], output_index: u32) -> u8 {
    let mut buf = Vec::with_capacity(8 + 32 + 5);
    buf.extend_from_slice(b"view_tag");
    buf.extend_from_slice(derivation);
    push_varint(&mut buf, output_index as u64);
    keccak256(&buf)[0]
}

/// XOR keystream for the compact 8-byte encrypted amount:
/// `keccak256("amount" || shared_secret)[..8]`.
fn amount_factor(shared_secret: &[u8; 32]) -> [u8; 8] {
    let mut buf = Vec::with_capacity(6 + 32);
    buf.extend_from_slice(b"amount");
    buf.extend_from_slice(shared_secret);
    let hash = keccak256(&buf);
    hash[..8].try_into().unwrap()
}

pub fn ecdh_encode_amount(amount: u64, shared_secret: &[u8; 32]) -> [u8; 8] {
    let factor = amount_factor(shared_secret);
    let le = amount.to_le_bytes();
    std::array::from_fn(|i| le[i] ^ factor[i])
}

pub fn ecdh_decode_amount(encrypted: &[u8; 8], shared_secret: &[u8; 32]) -> u64 {
    let factor = amount_factor(shared_secret);
    u64::from_le_bytes(std::array::from_fn(|i| encrypted[i] ^ factor[i]))
}

// ─── Scanning ───────────────────────────────────────────────────────────────

/// One recognized legacy output.
pub struct CnScanResult {
    pub amount: u64,
    pub mask: [u8; 32],
    pub subaddress_major: u32,
    pub subaddress_minor: u32,
    /// Present only when the wallet holds the spend secret.
    pub key_image: Option<[u8; 32]>,
    /// H_s(D || i) as bytes, kept for spend-key derivation later.
    pub shared_secret: [u8; 32],
}

/// Everything the CN scanner needs for one output.
pub struct CnScanInput<'a> {
    pub output_pubkey: &'a [u8; 32],
    /// `D = 8*k_v*R`, computed once per transaction.
    pub derivation: &'a [u8; 32],
    pub output_index: u32,
    /// 1-byte tag when the output is a tagged key.
    pub view_tag: Option<u8>,
    /// Clear amount for coinbase, None for RCT outputs.
    pub clear_amount: Option<u64>,
    pub encrypted_amount: &'a [u8; 8],
    /// The output's commitment (RCT era); checked when present.
    pub commitment: Option<&'a [u8; 32]>,
}

/// Recognize a single legacy output. `None` means "not ours" — never an
/// error, matching the propagation policy for scanners.
pub fn scan_output(
    input: &CnScanInput,
    view_secret: &[u8; 32],
    spend_secret: Option<&[u8; 32]>,
    subaddresses: &SubaddressTable,
) -> Option<CnScanResult> {
    // Fast reject on the view tag before any point arithmetic.
    if let Some(tag) = input.view_tag {
        if derive_view_tag(input.derivation, input.output_index) != tag {
            return None;
        }
    }

    // Reverse the one-time key: K_j_s = Ko - H_s(D || i)*G.
    let h = derivation_to_scalar(input.derivation, input.output_index);
    let ko = decompress(input.output_pubkey).ok()?;
    let candidate = (ko - ED25519_BASEPOINT_TABLE * &h).compress().to_bytes();

    let &(major, minor) = subaddresses.get(&candidate)?;

    let shared_secret = h.to_bytes();
    let (amount, mask) = match input.clear_amount {
        Some(clear) => (clear, zero_commit_mask()),
        None => {
            let amount = ecdh_decode_amount(input.encrypted_amount, &shared_secret);
            let mask = gen_commitment_mask(&shared_secret);
            if let Some(commitment) = input.commitment {
                if commit(amount, &mask) != *commitment {
                    return None;
                }
            }
            (amount, mask)
        }
    };

    let key_image = spend_secret.map(|spend| {
        let one_time = output_secret_key(&h, spend, view_secret, major, minor);
        generate_key_image(input.output_pubkey, &one_time.to_bytes())
    });

    Some(CnScanResult {
        amount,
        mask,
        subaddress_major: major,
        subaddress_minor: minor,
        key_image,
        shared_secret,
    })
}

/// `k_o = k_s [+ m_subaddr] + H_s(D || i)`.
fn output_secret_key(
    derived: &Scalar,
    spend_secret: &[u8; 32],
    view_secret: &[u8; 32],
    major: u32,
    minor: u32,
) -> Scalar {
    let mut base = scalar(spend_secret);
    if major != 0 || minor != 0 {
        base += cn_subaddress_secret(view_secret, major, minor);
    }
    base + derived
}

/// Recompute the one-time spend secret for a stored output.
pub fn derive_output_spend_key(
    view_secret: &[u8; 32],
    spend_secret: &[u8; 32],
    tx_pubkey: &[u8; 32],
    output_index: u32,
    subaddress_major: u32,
    subaddress_minor: u32,
) -> Result<[u8; 32], CryptoError> {
    let derivation = generate_key_derivation(tx_pubkey, view_secret)?;
    let h = derivation_to_scalar(&derivation, output_index);
    Ok(output_secret_key(&h, spend_secret, view_secret, subaddress_major, subaddress_minor)
        .to_bytes())
}
