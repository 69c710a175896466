//! CLSAG ring signatures.
//!
//! Concise Linkable Spontaneous Anonymous Group signatures as used by the
//! RCT types up to SalviumZero. Reference: rctSigs.cpp CLSAG_Gen/CLSAG_Ver.
//!
//! Serialization note: the key image is never part of the wire signature —
//! verification "expands" it back in from the transaction prefix.

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};

use crate::{
    decompress, hash_to_point, hash_to_scalar_parts, inv_eight, random_scalar, scalar, CryptoError,
};

// ─── Shared domain plumbing (also used by TCLSAG) ───────────────────────────

pub(crate) fn pad_domain(s: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    buf[..s.len()].copy_from_slice(s);
    buf
}

pub(crate) fn agg_domain_0() -> [u8; 32] {
    pad_domain(b"CLSAG_agg_0")
}

pub(crate) fn agg_domain_1() -> [u8; 32] {
    pad_domain(b"CLSAG_agg_1")
}

pub(crate) fn round_domain() -> [u8; 32] {
    pad_domain(b"CLSAG_round")
}

/// The two aggregate coefficients mu_P and mu_C.
pub(crate) fn aggregate_coefficients(
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    key_image: &[u8; 32],
    commitment_image: &[u8; 32],
    pseudo_output: &[u8; 32],
) -> (Scalar, Scalar) {
    let d0 = agg_domain_0();
    let d1 = agg_domain_1();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(2 * ring.len() + 4);
    parts.push(&d0);
    for p in ring {
        parts.push(p);
    }
    for c in commitments {
        parts.push(c);
    }
    parts.push(key_image);
    parts.push(commitment_image);
    parts.push(pseudo_output);
    let mu_p = hash_to_scalar_parts(&parts);
    parts[0] = &d1;
    let mu_c = hash_to_scalar_parts(&parts);
    (mu_p, mu_c)
}

/// One round challenge over (L, R).
pub(crate) fn round_challenge(
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_output: &[u8; 32],
    message: &[u8; 32],
    l: &[u8; 32],
    r: &[u8; 32],
) -> Scalar {
    let domain = round_domain();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(2 * ring.len() + 5);
    parts.push(&domain);
    for p in ring {
        parts.push(p);
    }
    for c in commitments {
        parts.push(c);
    }
    parts.push(pseudo_output);
    parts.push(message);
    parts.push(l);
    parts.push(r);
    hash_to_scalar_parts(&parts)
}

pub(crate) fn mul8(p: &EdwardsPoint) -> EdwardsPoint {
    p.mul_by_cofactor()
}

// ─── Signature ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClsagSignature {
    pub s: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    /// I — injected from the prefix at verify time, never serialized.
    pub key_image: [u8; 32],
    /// D/8 as stored on the wire.
    pub commitment_image: [u8; 32],
}

/// Sign `message` over `ring` with the real key at `secret_index`.
///
/// `commitment_mask` is `z - z'`: the real output's mask minus the
/// pseudo-output mask, so that `C[pi] - C' = (z - z')*G`.
pub fn sign(
    message: &[u8; 32],
    ring: &[[u8; 32]],
    secret_key: &[u8; 32],
    commitments: &[[u8; 32]],
    commitment_mask: &[u8; 32],
    pseudo_output: &[u8; 32],
    secret_index: usize,
) -> Result<ClsagSignature, CryptoError> {
    let n = ring.len();
    if n == 0 || n != commitments.len() {
        return Err(CryptoError::RingShapeMismatch);
    }
    if secret_index >= n {
        return Err(CryptoError::BadRingIndex { index: secret_index, len: n });
    }

    let sk = scalar(secret_key);
    let z = scalar(commitment_mask);
    let pseudo = decompress(pseudo_output)?;

    let ring_points: Vec<EdwardsPoint> =
        ring.iter().map(decompress).collect::<Result<_, _>>()?;
    let c_offsets: Vec<EdwardsPoint> = commitments
        .iter()
        .map(|c| Ok(decompress(c)? - pseudo))
        .collect::<Result<_, CryptoError>>()?;

    let hp = hash_to_point(&ring[secret_index]);
    let key_image_pt = sk * hp;
    let key_image = key_image_pt.compress().to_bytes();
    let d_full = z * hp;
    let d8 = (inv_eight() * d_full).compress().to_bytes();

    let (mu_p, mu_c) =
        aggregate_coefficients(ring, commitments, &key_image, &d8, pseudo_output);

    // Fresh randomness on the (absurdly unlikely) c1 == 0 outcome; a zero
    // first challenge is malformed on the wire.
    loop {
        let alpha = random_scalar();
        let a_g = (ED25519_BASEPOINT_TABLE * &alpha).compress().to_bytes();
        let a_h = (alpha * hp).compress().to_bytes();
        let mut c = round_challenge(ring, commitments, pseudo_output, message, &a_g, &a_h);

        let mut s = vec![[0u8; 32]; n];
        let mut c1 = None;
        let mut i = (secret_index + 1) % n;
        if i == 0 {
            c1 = Some(c);
        }

        while i != secret_index {
            let s_i = random_scalar();
            s[i] = s_i.to_bytes();

            let (l, r) = decoy_points(
                &s_i,
                &c,
                &mu_p,
                &mu_c,
                &ring_points[i],
                &c_offsets[i],
                &hash_to_point(&ring[i]),
                &key_image_pt,
                &d_full,
            );
            c = round_challenge(ring, commitments, pseudo_output, message, &l, &r);

            i = (i + 1) % n;
            if i == 0 {
                c1 = Some(c);
            }
        }

        // Close the ring.
        let s_pi = alpha - c * (mu_p * sk + mu_c * z);
        s[secret_index] = s_pi.to_bytes();

        let c1 = match c1 {
            Some(c1) => c1,
            // Single-member ring: one more walk past the signer slot.
            None => {
                let (l, r) = decoy_points(
                    &s_pi,
                    &c,
                    &mu_p,
                    &mu_c,
                    &ring_points[secret_index],
                    &c_offsets[secret_index],
                    &hp,
                    &key_image_pt,
                    &d_full,
                );
                round_challenge(ring, commitments, pseudo_output, message, &l, &r)
            }
        };

        if c1 == Scalar::ZERO {
            continue;
        }

        return Ok(ClsagSignature {
            s,
            c1: c1.to_bytes(),
            key_image,
            commitment_image: d8,
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn decoy_points(
    s_i: &Scalar,
    c: &Scalar,
    mu_p: &Scalar,
    mu_c: &Scalar,
    ring_pt: &EdwardsPoint,
    c_offset: &EdwardsPoint,
    hp_i: &EdwardsPoint,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> ([u8; 32], [u8; 32]) {
    let c_mu_p = c * mu_p;
    let c_mu_c = c * mu_c;
    // L = s*G + c*mu_P*P + c*mu_C*(C - C')
    let l = EdwardsPoint::vartime_multiscalar_mul(
        [*s_i, c_mu_p, c_mu_c],
        [ED25519_BASEPOINT_POINT, *ring_pt, *c_offset],
    );
    // R = s*Hp(P) + c*mu_P*I + c*mu_C*D
    let r = EdwardsPoint::vartime_multiscalar_mul(
        [*s_i, c_mu_p, c_mu_c],
        [*hp_i, *key_image, *d_full],
    );
    (l.compress().to_bytes(), r.compress().to_bytes())
}

/// Verify the ring of challenges closes on c1. Also rejects key images off
/// the prime-order subgroup.
pub fn verify(
    message: &[u8; 32],
    sig: &ClsagSignature,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_output: &[u8; 32],
) -> bool {
    let n = ring.len();
    if n == 0 || n != commitments.len() || sig.s.len() != n {
        return false;
    }

    let Ok(pseudo) = decompress(pseudo_output) else { return false };
    let Ok(key_image_pt) = decompress(&sig.key_image) else { return false };
    if !key_image_pt.is_torsion_free() || key_image_pt.is_identity() {
        return false;
    }
    let Ok(d8) = decompress(&sig.commitment_image) else { return false };
    let d_full = mul8(&d8);

    let Ok(ring_points) = ring.iter().map(decompress).collect::<Result<Vec<_>, _>>() else {
        return false;
    };
    let Ok(c_offsets) = commitments
        .iter()
        .map(|c| Ok::<_, CryptoError>(decompress(c)? - pseudo))
        .collect::<Result<Vec<_>, _>>()
    else {
        return false;
    };

    let (mu_p, mu_c) = aggregate_coefficients(
        ring,
        commitments,
        &sig.key_image,
        &sig.commitment_image,
        pseudo_output,
    );

    let mut c = scalar(&sig.c1);
    for i in 0..n {
        let (l, r) = decoy_points(
            &scalar(&sig.s[i]),
            &c,
            &mu_p,
            &mu_c,
            &ring_points[i],
            &c_offsets[i],
            &hash_to_point(&ring[i]),
            &key_image_pt,
            &d_full,
        );
        c = round_challenge(ring, commitments, pseudo_output, message, &l, &r);
    }

    c.to_bytes() == sig.c1
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keccak256;

    struct TestRing {
        ring: Vec<[u8; 32]>,
        commitments: Vec<[u8; 32]>,
        pseudo_output: [u8; 32],
        secret: Scalar,
        z: [u8; 32],
        index: usize,
    }

    fn make_ring(n: usize, index: usize) -> TestRing {
        let mut ring = Vec::with_capacity(n);
        let mut commitments = Vec::with_capacity(n);
        let mut secret = Scalar::ZERO;
        let mut real_mask = Scalar::ZERO;
        for i in 0..n {
            let sk = random_scalar();
            let mask = random_scalar();
            if i == index {
                secret = sk;
                real_mask = mask;
            }
            ring.push((ED25519_BASEPOINT_TABLE * &sk).compress().to_bytes());
            commitments.push((mask * ED25519_BASEPOINT_POINT).compress().to_bytes());
        }
        let pseudo_mask = random_scalar();
        let pseudo_output = (pseudo_mask * ED25519_BASEPOINT_POINT).compress().to_bytes();
        TestRing {
            ring,
            commitments,
            pseudo_output,
            secret,
            z: (real_mask - pseudo_mask).to_bytes(),
            index,
        }
    }

    #[test]
    fn sign_verify_ring_of_eleven() {
        let t = make_ring(11, 3);
        let message = keccak256(b"test");
        let sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        assert!(verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn flipping_message_byte_invalidates() {
        let t = make_ring(11, 3);
        let message = keccak256(b"test");
        let sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        let mut tampered = message;
        tampered[0] ^= 1;
        assert!(!verify(&tampered, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn flipping_ring_member_invalidates() {
        let t = make_ring(11, 3);
        let message = keccak256(b"test");
        let sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        let mut ring = t.ring.clone();
        // Replace a decoy with another valid point.
        ring[7] = (ED25519_BASEPOINT_TABLE * &random_scalar()).compress().to_bytes();
        assert!(!verify(&message, &sig, &ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn wrong_key_image_invalidates() {
        let t = make_ring(4, 0);
        let message = keccak256(b"ki");
        let mut sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        sig.key_image = (ED25519_BASEPOINT_TABLE * &random_scalar()).compress().to_bytes();
        assert!(!verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn single_member_ring() {
        let t = make_ring(1, 0);
        let message = keccak256(b"solo");
        let sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            0,
        )
        .unwrap();
        assert!(verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn bad_index_is_an_error() {
        let t = make_ring(4, 0);
        let message = keccak256(b"idx");
        assert!(matches!(
            sign(&message, &t.ring, &t.secret.to_bytes(), &t.commitments, &t.z, &t.pseudo_output, 4),
            Err(CryptoError::BadRingIndex { .. })
        ));
    }

    #[test]
    fn key_image_matches_standalone_derivation() {
        let t = make_ring(3, 1);
        let message = keccak256(b"image");
        let sig = sign(
            &message,
            &t.ring,
            &t.secret.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            1,
        )
        .unwrap();
        assert_eq!(
            sig.key_image,
            crate::generate_key_image(&t.ring[1], &t.secret.to_bytes())
        );
    }
}
