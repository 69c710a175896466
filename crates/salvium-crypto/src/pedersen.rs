//! Pedersen commitments and the fixed generators H and T.
//!
//! `commit(a, m) = m*G + a*H`. Coinbase outputs use `zero_commit`, whose
//! blinding factor is 1 by Salvium convention (not 0).

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;

use crate::{keccak256, scalar};

/// H = 8 * elligator(keccak256(G)): the amount generator.
pub const H_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf,
    0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9,
    0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

/// T: the transaction-extra generator scaling the CARROT prove-spend key,
/// fixed network-wide from the published hash-to-point domain string.
pub const T_BYTES: [u8; 32] = [
    0x96, 0x6f, 0xc6, 0x6b, 0x82, 0xcd, 0x56, 0xcf,
    0x85, 0xea, 0xec, 0x80, 0x1c, 0x42, 0x84, 0x5f,
    0x5f, 0x40, 0x88, 0x78, 0xd1, 0x56, 0x1e, 0x00,
    0xd3, 0xd7, 0xde, 0xd2, 0x79, 0x4d, 0x09, 0x4f,
];

pub fn h_point() -> EdwardsPoint {
    CompressedEdwardsY(H_BYTES).decompress().expect("H is a valid point")
}

pub fn t_point() -> EdwardsPoint {
    CompressedEdwardsY(T_BYTES).decompress().expect("T is a valid point")
}

/// `m*G + a*H` for a u64 amount.
pub fn commit(amount: u64, mask: &[u8; 32]) -> [u8; 32] {
    commit_scalars(&Scalar::from(amount), &scalar(mask))
}

pub(crate) fn commit_scalars(amount: &Scalar, mask: &Scalar) -> [u8; 32] {
    EdwardsPoint::vartime_multiscalar_mul([*mask, *amount], [ED25519_BASEPOINT_POINT, h_point()])
        .compress()
        .to_bytes()
}

/// Coinbase commitment: `1*G + a*H`.
pub fn zero_commit(amount: u64) -> [u8; 32] {
    commit_scalars(&Scalar::from(amount), &Scalar::ONE)
}

/// The blinding factor zero_commit uses, as bytes.
pub fn zero_commit_mask() -> [u8; 32] {
    Scalar::ONE.to_bytes()
}

/// Legacy ECDH mask: `sc_reduce32(keccak256("commitment_mask" || shared))`.
pub fn gen_commitment_mask(shared_secret: &[u8; 32]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(15 + 32);
    buf.extend_from_slice(b"commitment_mask");
    buf.extend_from_slice(shared_secret);
    Scalar::from_bytes_mod_order(keccak256(&buf)).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash_to_scalar, point_add, sc_add};

    #[test]
    fn h_and_t_decode() {
        h_point();
        t_point();
        assert_ne!(H_BYTES, T_BYTES);
    }

    #[test]
    fn commitment_homomorphism() {
        let m1 = hash_to_scalar(b"m1").to_bytes();
        let m2 = hash_to_scalar(b"m2").to_bytes();
        let c1 = commit(1000, &m1);
        let c2 = commit(2345, &m2);
        let sum = point_add(&c1, &c2).unwrap();
        assert_eq!(sum, commit(3345, &sc_add(&m1, &m2)));
    }

    #[test]
    fn zero_commit_uses_blinding_one() {
        assert_eq!(zero_commit(42), commit(42, &zero_commit_mask()));
        assert_eq!(zero_commit_mask()[0], 1);
    }

    #[test]
    fn commitment_binds_amount() {
        let mask = hash_to_scalar(b"mask").to_bytes();
        assert_ne!(commit(1, &mask), commit(2, &mask));
    }

    #[test]
    fn gen_commitment_mask_is_deterministic() {
        let ss = [0x33; 32];
        assert_eq!(gen_commitment_mask(&ss), gen_commitment_mask(&ss));
        assert_ne!(gen_commitment_mask(&ss), gen_commitment_mask(&[0x34; 32]));
    }
}
