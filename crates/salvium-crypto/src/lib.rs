//! Cryptographic engine for the Salvium wallet core.
//!
//! Layering, bottom up: hash primitives and scalar/point arithmetic here in
//! the crate root, the CryptoNote hash-to-point map in [`elligator`], the
//! X25519 view path in [`x25519`], Pedersen commitments in [`pedersen`],
//! then the CN and CARROT key hierarchies, scanners, ring signatures
//! ([`clsag`], [`tclsag`]) and Bulletproofs+ ([`bulletproofs_plus`]).
//!
//! All public functions take and return 32-byte canonical encodings;
//! decompressed curve forms never cross the API boundary.

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use tiny_keccak::{Hasher, Keccak};

pub mod bulletproofs_plus;
pub mod carrot_enote;
pub mod carrot_keys;
pub mod carrot_scan;
pub mod clsag;
pub mod cn;
pub mod elligator;
mod error;
pub mod pedersen;
pub mod subaddress;
pub mod tclsag;
pub mod x25519;

pub use error::CryptoError;

// ─── Hash primitives ────────────────────────────────────────────────────────

/// Keccak-256, the CryptoNote `cn_fast_hash` variant (0x01 padding, not SHA3).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut out);
    out
}

/// Unkeyed BLAKE2b with variable output length (1..=64 bytes).
pub fn blake2b(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Keyed BLAKE2b per RFC 7693; CARROT's domain-separated hash family.
pub fn blake2b_keyed(data: &[u8], out_len: usize, key: &[u8]) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .key(key)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

// ─── Scalar arithmetic mod L ────────────────────────────────────────────────

/// Reduce 32 bytes mod L.
pub fn sc_reduce32(bytes: &[u8; 32]) -> [u8; 32] {
    Scalar::from_bytes_mod_order(*bytes).to_bytes()
}

/// Reduce 64 bytes mod L.
pub fn sc_reduce64(bytes: &[u8; 64]) -> [u8; 32] {
    Scalar::from_bytes_mod_order_wide(bytes).to_bytes()
}

pub fn sc_add(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    (scalar(a) + scalar(b)).to_bytes()
}

pub fn sc_sub(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    (scalar(a) - scalar(b)).to_bytes()
}

pub fn sc_mul(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    (scalar(a) * scalar(b)).to_bytes()
}

/// `a*b + c mod L`.
pub fn sc_mul_add(a: &[u8; 32], b: &[u8; 32], c: &[u8; 32]) -> [u8; 32] {
    (scalar(a) * scalar(b) + scalar(c)).to_bytes()
}

/// `c - a*b mod L` — note the Salvium argument order (c last).
pub fn sc_mul_sub(a: &[u8; 32], b: &[u8; 32], c: &[u8; 32]) -> [u8; 32] {
    (scalar(c) - scalar(a) * scalar(b)).to_bytes()
}

/// Multiplicative inverse mod L; fails on zero.
pub fn sc_invert(a: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let s = scalar(a);
    if s == Scalar::ZERO {
        return Err(CryptoError::ZeroInverse);
    }
    Ok(s.invert().to_bytes())
}

/// Whether the bytes are already a canonical scalar (< L).
pub fn sc_check(bytes: &[u8; 32]) -> bool {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes)).is_some()
}

pub fn sc_is_zero(bytes: &[u8; 32]) -> bool {
    scalar(bytes) == Scalar::ZERO
}

// ─── Point arithmetic ───────────────────────────────────────────────────────

/// `s * G` compressed.
pub fn scalar_mult_base(s: &[u8; 32]) -> [u8; 32] {
    (ED25519_BASEPOINT_TABLE * &scalar(s)).compress().to_bytes()
}

/// `s * P` compressed; fails on a non-canonical point.
pub fn scalar_mult(s: &[u8; 32], p: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let point = decompress(p)?;
    Ok(EdwardsPoint::vartime_multiscalar_mul([scalar(s)], [point])
        .compress()
        .to_bytes())
}

pub fn point_add(p: &[u8; 32], q: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    Ok((decompress(p)? + decompress(q)?).compress().to_bytes())
}

pub fn point_sub(p: &[u8; 32], q: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    Ok((decompress(p)? - decompress(q)?).compress().to_bytes())
}

pub fn point_negate(p: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    Ok((-decompress(p)?).compress().to_bytes())
}

/// `a*P + b*G` compressed, variable time.
pub fn double_scalar_mult_base(
    a: &[u8; 32],
    p: &[u8; 32],
    b: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let point = decompress(p)?;
    Ok(
        EdwardsPoint::vartime_multiscalar_mul([scalar(a), scalar(b)], [point, ED25519_BASEPOINT_POINT])
            .compress()
            .to_bytes(),
    )
}

/// Whether the bytes decode to a curve point.
pub fn point_check(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

// ─── Hashing into the group ─────────────────────────────────────────────────

/// `H_s`: Keccak-256 then reduce mod L.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256(data))
}

/// `H_s` over concatenated parts.
pub fn hash_to_scalar_parts(parts: &[&[u8]]) -> Scalar {
    let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for p in parts {
        buf.extend_from_slice(p);
    }
    hash_to_scalar(&buf)
}

/// `H_p`: Keccak-256, CryptoNote Elligator map, then clear the cofactor.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let hash = keccak256(data);
    elligator::map_to_point(&hash).mul_by_cofactor()
}

/// `H_p` returning the compressed encoding.
pub fn hash_to_point_bytes(data: &[u8]) -> [u8; 32] {
    hash_to_point(data).compress().to_bytes()
}

// ─── Key images ─────────────────────────────────────────────────────────────

/// `I = k * H_p(K)` for a one-time keypair `(k, K)`.
pub fn generate_key_image(public: &[u8; 32], secret: &[u8; 32]) -> [u8; 32] {
    (scalar(secret) * hash_to_point(public)).compress().to_bytes()
}

/// A key image is admissible only in the prime-order subgroup.
pub fn check_key_image(image: &[u8; 32]) -> Result<(), CryptoError> {
    let point = decompress(image).map_err(|_| CryptoError::KeyImageSubgroup)?;
    if !point.is_torsion_free() {
        return Err(CryptoError::KeyImageSubgroup);
    }
    Ok(())
}

// ─── Internal helpers shared across modules ─────────────────────────────────

pub(crate) fn scalar(bytes: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

pub(crate) fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint)
}

/// Random scalar from 64 bytes of OS entropy.
pub(crate) fn random_scalar() -> Scalar {
    let mut bytes = [0u8; 64];
    getrandom::getrandom(&mut bytes).expect("OS randomness unavailable");
    Scalar::from_bytes_mod_order_wide(&bytes)
}

/// 8^-1 mod L, used wherever stored points carry the 1/8 convention.
pub(crate) fn inv_eight() -> Scalar {
    Scalar::from(8u64).invert()
}

pub(crate) fn to32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let len = bytes.len().min(32);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_empty_reference_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak256_cn_padding_differs_from_sha3() {
        // SHA3-256("") = a7ffc6f8..., which must NOT come out of the 0x01 variant.
        assert_ne!(
            hex::encode(keccak256(b"")),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn base_point_compresses_to_reference_bytes() {
        let one = Scalar::ONE.to_bytes();
        assert_eq!(
            hex::encode(scalar_mult_base(&one)),
            "5866666666666666666666666666666666666666666666666666666666666666"
        );
    }

    #[test]
    fn scalar_field_laws() {
        let a = hash_to_scalar(b"a").to_bytes();
        let b = hash_to_scalar(b"b").to_bytes();
        assert_eq!(sc_add(&a, &b), sc_add(&b, &a));
        assert_eq!(sc_mul(&a, &b), sc_mul(&b, &a));
        assert!(sc_is_zero(&sc_sub(&a, &a)));

        let inv = sc_invert(&a).unwrap();
        assert_eq!(sc_mul(&a, &inv), Scalar::ONE.to_bytes());
    }

    #[test]
    fn invert_zero_fails() {
        assert_eq!(sc_invert(&[0u8; 32]), Err(CryptoError::ZeroInverse));
    }

    #[test]
    fn mul_add_and_mul_sub_conventions() {
        let a = hash_to_scalar(b"x").to_bytes();
        let b = hash_to_scalar(b"y").to_bytes();
        let c = hash_to_scalar(b"z").to_bytes();
        assert_eq!(sc_mul_add(&a, &b, &c), sc_add(&sc_mul(&a, &b), &c));
        // Salvium order: c - a*b.
        assert_eq!(sc_mul_sub(&a, &b, &c), sc_sub(&c, &sc_mul(&a, &b)));
    }

    #[test]
    fn scalar_mult_composes_with_base() {
        let s = hash_to_scalar(b"s").to_bytes();
        let t = hash_to_scalar(b"t").to_bytes();
        let p = scalar_mult_base(&s);
        let left = scalar_mult(&t, &p).unwrap();
        let right = scalar_mult_base(&sc_mul(&s, &t));
        assert_eq!(left, right);
    }

    #[test]
    fn point_add_sub_negate() {
        let p = scalar_mult_base(&hash_to_scalar(b"p").to_bytes());
        let q = scalar_mult_base(&hash_to_scalar(b"q").to_bytes());
        let sum = point_add(&p, &q).unwrap();
        assert_eq!(point_sub(&sum, &q).unwrap(), p);
        let neg = point_negate(&q).unwrap();
        assert_eq!(point_add(&sum, &neg).unwrap(), p);
    }

    #[test]
    fn invalid_point_is_rejected() {
        let junk = [0xAA; 32];
        assert!(!point_check(&junk));
        assert!(scalar_mult(&Scalar::ONE.to_bytes(), &junk).is_err());
    }

    #[test]
    fn key_image_is_deterministic_and_torsion_free() {
        let secret = hash_to_scalar(b"one-time secret").to_bytes();
        let public = scalar_mult_base(&secret);
        let image1 = generate_key_image(&public, &secret);
        let image2 = generate_key_image(&public, &secret);
        assert_eq!(image1, image2);
        check_key_image(&image1).unwrap();
    }

    #[test]
    fn hash_to_point_output_is_on_curve() {
        for seed in 0u8..8 {
            let bytes = hash_to_point_bytes(&[seed; 32]);
            assert!(point_check(&bytes));
        }
    }

    #[test]
    fn blake2b_lengths_and_keying() {
        assert_eq!(blake2b(b"abc", 32).len(), 32);
        assert_eq!(blake2b(b"abc", 3).len(), 3);
        assert_ne!(blake2b(b"abc", 32), blake2b_keyed(b"abc", 32, b"key"));
    }
}
