//! TCLSAG: the two-scalar CLSAG variant for RCT type SalviumOne.
//!
//! Signs jointly over a G-component `x` and a T-component `y` of the
//! one-time key `P = x*G + y*T`, producing twin response series sx/sy.
//! The hash plumbing (aggregate coefficients, round challenges) is shared
//! with [`crate::clsag`]. Reference: rctSigs.cpp TCLSAG_Gen/TCLSAG_Ver.

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};

use crate::clsag::{aggregate_coefficients, mul8, round_challenge};
use crate::pedersen::t_point;
use crate::{decompress, hash_to_point, inv_eight, random_scalar, scalar, CryptoError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TclsagSignature {
    pub sx: Vec<[u8; 32]>,
    pub sy: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    /// I = x * Hp(P) — expanded from the prefix at verify time.
    pub key_image: [u8; 32],
    /// D/8 as stored on the wire.
    pub commitment_image: [u8; 32],
}

/// Sign with the twin secrets `(x, y)` of the real member.
#[allow(clippy::too_many_arguments)]
pub fn sign(
    message: &[u8; 32],
    ring: &[[u8; 32]],
    secret_x: &[u8; 32],
    secret_y: &[u8; 32],
    commitments: &[[u8; 32]],
    commitment_mask: &[u8; 32],
    pseudo_output: &[u8; 32],
    secret_index: usize,
) -> Result<TclsagSignature, CryptoError> {
    let n = ring.len();
    if n == 0 || n != commitments.len() {
        return Err(CryptoError::RingShapeMismatch);
    }
    if secret_index >= n {
        return Err(CryptoError::BadRingIndex { index: secret_index, len: n });
    }

    let x = scalar(secret_x);
    let y = scalar(secret_y);
    let z = scalar(commitment_mask);
    let t_gen = t_point();
    let pseudo = decompress(pseudo_output)?;

    let ring_points: Vec<EdwardsPoint> =
        ring.iter().map(decompress).collect::<Result<_, _>>()?;
    let c_offsets: Vec<EdwardsPoint> = commitments
        .iter()
        .map(|c| Ok(decompress(c)? - pseudo))
        .collect::<Result<_, CryptoError>>()?;

    let hp = hash_to_point(&ring[secret_index]);
    let key_image_pt = x * hp;
    let key_image = key_image_pt.compress().to_bytes();
    let d_full = z * hp;
    let d8 = (inv_eight() * d_full).compress().to_bytes();

    let (mu_p, mu_c) =
        aggregate_coefficients(ring, commitments, &key_image, &d8, pseudo_output);

    loop {
        let a = random_scalar();
        let b = random_scalar();

        // L_init = a*G + b*T, R_init = a*Hp(P_pi).
        let l_init = EdwardsPoint::vartime_multiscalar_mul(
            [a, b],
            [ED25519_BASEPOINT_POINT, t_gen],
        )
        .compress()
        .to_bytes();
        let r_init = (a * hp).compress().to_bytes();
        let mut c = round_challenge(ring, commitments, pseudo_output, message, &l_init, &r_init);

        let mut sx = vec![[0u8; 32]; n];
        let mut sy = vec![[0u8; 32]; n];
        let mut c1 = None;
        let mut i = (secret_index + 1) % n;
        if i == 0 {
            c1 = Some(c);
        }

        while i != secret_index {
            let sx_i = random_scalar();
            let sy_i = random_scalar();
            sx[i] = sx_i.to_bytes();
            sy[i] = sy_i.to_bytes();

            let (l, r) = decoy_points(
                &sx_i,
                &sy_i,
                &c,
                &mu_p,
                &mu_c,
                &t_gen,
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

        // Close both series.
        let sx_pi = a - c * (mu_p * x + mu_c * z);
        let sy_pi = b - c * mu_p * y;
        sx[secret_index] = sx_pi.to_bytes();
        sy[secret_index] = sy_pi.to_bytes();

        let c1 = match c1 {
            Some(c1) => c1,
            None => {
                let (l, r) = decoy_points(
                    &sx_pi,
                    &sy_pi,
                    &c,
                    &mu_p,
                    &mu_c,
                    &t_gen,
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

        return Ok(TclsagSignature {
            sx,
            sy,
            c1: c1.to_bytes(),
            key_image,
            commitment_image: d8,
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn decoy_points(
    sx_i: &Scalar,
    sy_i: &Scalar,
    c: &Scalar,
    mu_p: &Scalar,
    mu_c: &Scalar,
    t_gen: &EdwardsPoint,
    ring_pt: &EdwardsPoint,
    c_offset: &EdwardsPoint,
    hp_i: &EdwardsPoint,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> ([u8; 32], [u8; 32]) {
    let c_mu_p = c * mu_p;
    let c_mu_c = c * mu_c;
    // L = sx*G + sy*T + c*mu_P*P + c*mu_C*(C - C')
    let l = EdwardsPoint::vartime_multiscalar_mul(
        [*sx_i, *sy_i, c_mu_p, c_mu_c],
        [ED25519_BASEPOINT_POINT, *t_gen, *ring_pt, *c_offset],
    );
    // R = sx*Hp(P) + c*mu_P*I + c*mu_C*D — the T component has no image.
    let r = EdwardsPoint::vartime_multiscalar_mul(
        [*sx_i, c_mu_p, c_mu_c],
        [*hp_i, *key_image, *d_full],
    );
    (l.compress().to_bytes(), r.compress().to_bytes())
}

pub fn verify(
    message: &[u8; 32],
    sig: &TclsagSignature,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_output: &[u8; 32],
) -> bool {
    let n = ring.len();
    if n == 0 || n != commitments.len() || sig.sx.len() != n || sig.sy.len() != n {
        return false;
    }

    let Ok(pseudo) = decompress(pseudo_output) else { return false };
    let Ok(key_image_pt) = decompress(&sig.key_image) else { return false };
    if !key_image_pt.is_torsion_free() || key_image_pt.is_identity() {
        return false;
    }
    let Ok(d8) = decompress(&sig.commitment_image) else { return false };
    let d_full = mul8(&d8);
    let t_gen = t_point();

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
            &scalar(&sig.sx[i]),
            &scalar(&sig.sy[i]),
            &c,
            &mu_p,
            &mu_c,
            &t_gen,
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

    fn twin_pubkey(x: &Scalar, y: &Scalar) -> [u8; 32] {
        EdwardsPoint::vartime_multiscalar_mul(
            [*x, *y],
            [ED25519_BASEPOINT_POINT, t_point()],
        )
        .compress()
        .to_bytes()
    }

    struct TestRing {
        ring: Vec<[u8; 32]>,
        commitments: Vec<[u8; 32]>,
        pseudo_output: [u8; 32],
        x: Scalar,
        y: Scalar,
        z: [u8; 32],
        index: usize,
    }

    fn make_ring(n: usize, index: usize) -> TestRing {
        let x = random_scalar();
        let y = random_scalar();
        let mut ring = Vec::with_capacity(n);
        let mut commitments = Vec::with_capacity(n);
        let mut real_mask = Scalar::ZERO;
        for i in 0..n {
            if i == index {
                ring.push(twin_pubkey(&x, &y));
            } else {
                ring.push(twin_pubkey(&random_scalar(), &random_scalar()));
            }
            let mask = random_scalar();
            if i == index {
                real_mask = mask;
            }
            commitments.push((mask * ED25519_BASEPOINT_POINT).compress().to_bytes());
        }
        let pseudo_mask = random_scalar();
        TestRing {
            ring,
            commitments,
            pseudo_output: (pseudo_mask * ED25519_BASEPOINT_POINT).compress().to_bytes(),
            x,
            y,
            z: (real_mask - pseudo_mask).to_bytes(),
            index,
        }
    }

    #[test]
    fn sign_verify_ring_sixteen() {
        let t = make_ring(16, 9);
        let message = keccak256(b"tclsag");
        let sig = sign(
            &message,
            &t.ring,
            &t.x.to_bytes(),
            &t.y.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        assert!(verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn wrong_message_fails() {
        let t = make_ring(4, 2);
        let message = keccak256(b"m1");
        let sig = sign(
            &message,
            &t.ring,
            &t.x.to_bytes(),
            &t.y.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        assert!(!verify(&keccak256(b"m2"), &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn key_image_is_stable_across_messages() {
        let t = make_ring(3, 0);
        let sig1 = sign(
            &keccak256(b"a"),
            &t.ring,
            &t.x.to_bytes(),
            &t.y.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            0,
        )
        .unwrap();
        let sig2 = sign(
            &keccak256(b"b"),
            &t.ring,
            &t.x.to_bytes(),
            &t.y.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            0,
        )
        .unwrap();
        assert_eq!(sig1.key_image, sig2.key_image);
        assert_eq!(sig1.commitment_image, sig2.commitment_image);
        assert_ne!(sig1.c1, sig2.c1);
    }

    #[test]
    fn swapping_y_component_breaks_signature() {
        // A forged y should fail even though only x produces the key image.
        let t = make_ring(4, 1);
        let message = keccak256(b"twin");
        let sig = sign(
            &message,
            &t.ring,
            &t.x.to_bytes(),
            &random_scalar().to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        assert!(!verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }

    #[test]
    fn mismatched_series_lengths_fail() {
        let t = make_ring(4, 1);
        let message = keccak256(b"len");
        let mut sig = sign(
            &message,
            &t.ring,
            &t.x.to_bytes(),
            &t.y.to_bytes(),
            &t.commitments,
            &t.z,
            &t.pseudo_output,
            t.index,
        )
        .unwrap();
        sig.sy.pop();
        assert!(!verify(&message, &sig, &t.ring, &t.commitments, &t.pseudo_output));
    }
}
