//! Bulletproofs+ aggregated range proofs.
//!
//! Prover and batch verifier for 64-bit ranges over up to 16 commitments per
//! proof. Wire points (A, A1, B, L, R and the implicit V) carry the usual
//! 1/8 scaling; the verifier multiplies the cofactor back in, so a single
//! fused multiscalar multiplication decides a whole batch.
//!
//! Reference: bulletproofs_plus.cc and https://eprint.iacr.org/2020/735.

use std::sync::OnceLock;

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};

use crate::clsag::mul8;
use crate::pedersen::{h_point, H_BYTES};
use crate::{decompress, hash_to_point, inv_eight, keccak256, random_scalar, CryptoError};

/// Range bit width.
const N: usize = 64;
const LOG_N: usize = 6;
/// Maximum commitments aggregated into one proof.
pub const MAX_OUTPUTS: usize = 16;
const MAX_MN: usize = MAX_OUTPUTS * N;

// ─── Generators ─────────────────────────────────────────────────────────────

struct Generators {
    gi: Vec<EdwardsPoint>,
    hi: Vec<EdwardsPoint>,
}

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

/// `Gi[i] = Hp(keccak(H || "bulletproof_plus" || varint(2i+1)))`, `Hi[i]`
/// likewise with even indices — the get_exponent construction.
fn generators() -> &'static Generators {
    static GENERATORS: OnceLock<Generators> = OnceLock::new();
    GENERATORS.get_or_init(|| {
        let prefix = b"bulletproof_plus";
        let mut gi = Vec::with_capacity(MAX_MN);
        let mut hi = Vec::with_capacity(MAX_MN);
        for i in 0..MAX_MN as u64 {
            let mut data = Vec::with_capacity(32 + prefix.len() + 10);
            data.extend_from_slice(&H_BYTES);
            data.extend_from_slice(prefix);
            push_varint(&mut data, 2 * i);
            hi.push(hash_to_point(&keccak256(&data)));

            data.truncate(32 + prefix.len());
            push_varint(&mut data, 2 * i + 1);
            gi.push(hash_to_point(&keccak256(&data)));
        }
        Generators { gi, hi }
    })
}

/// Initial Fiat-Shamir state: a point derived from the transcript domain.
fn transcript_init() -> [u8; 32] {
    static INIT: OnceLock<[u8; 32]> = OnceLock::new();
    *INIT.get_or_init(|| {
        let seed = keccak256(b"bulletproof_plus_transcript");
        hash_to_point(&seed).compress().to_bytes()
    })
}

fn transcript_update(transcript: &[u8; 32], elements: &[&[u8; 32]]) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 * (1 + elements.len()));
    data.extend_from_slice(transcript);
    for e in elements {
        data.extend_from_slice(*e);
    }
    Scalar::from_bytes_mod_order(keccak256(&data)).to_bytes()
}

fn hash_points_to_scalar(points: &[EdwardsPoint]) -> Scalar {
    let mut data = Vec::with_capacity(points.len() * 32);
    for p in points {
        data.extend_from_slice(&p.compress().to_bytes());
    }
    Scalar::from_bytes_mod_order(keccak256(&data))
}

// ─── Proof structure ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BulletproofPlus {
    /// V: the commitments divided by 8. Not serialized in transactions —
    /// re-derived from outPk at verify time.
    pub v: Vec<EdwardsPoint>,
    pub a: EdwardsPoint,
    pub a1: EdwardsPoint,
    pub b: EdwardsPoint,
    pub r1: Scalar,
    pub s1: Scalar,
    pub d1: Scalar,
    pub l: Vec<EdwardsPoint>,
    pub r: Vec<EdwardsPoint>,
}

impl BulletproofPlus {
    /// Rebuild a proof from wire bytes, rejecting non-canonical points.
    #[allow(clippy::too_many_arguments)]
    pub fn from_bytes(
        a: &[u8; 32],
        a1: &[u8; 32],
        b: &[u8; 32],
        r1: &[u8; 32],
        s1: &[u8; 32],
        d1: &[u8; 32],
        l: &[[u8; 32]],
        r: &[[u8; 32]],
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            v: Vec::new(),
            a: decompress(a)?,
            a1: decompress(a1)?,
            b: decompress(b)?,
            r1: canonical_scalar(r1)?,
            s1: canonical_scalar(s1)?,
            d1: canonical_scalar(d1)?,
            l: l.iter().map(decompress).collect::<Result<_, _>>()?,
            r: r.iter().map(decompress).collect::<Result<_, _>>()?,
        })
    }
}

fn canonical_scalar(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes)).ok_or(CryptoError::InvalidScalar)
}

/// `V = C/8` for a compressed commitment, as the verifier expects it.
pub fn commitment_to_v(commitment: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    Ok(inv_eight() * decompress(commitment)?)
}

// ─── Prover ─────────────────────────────────────────────────────────────────

/// Prove that each `amounts[j]` lies in [0, 2^64) under mask `masks[j]`.
pub fn prove(amounts: &[u64], masks: &[[u8; 32]]) -> Result<BulletproofPlus, CryptoError> {
    if amounts.is_empty() || amounts.len() != masks.len() {
        return Err(CryptoError::RingShapeMismatch);
    }
    if amounts.len() > MAX_OUTPUTS {
        return Err(CryptoError::RangeProofInvalid);
    }

    let masks: Vec<Scalar> = masks.iter().map(crate::scalar).collect();

    let mut m = 1usize;
    let mut log_m = 0usize;
    while m < amounts.len() {
        m *= 2;
        log_m += 1;
    }
    let mn = m * N;
    let log_mn = log_m + LOG_N;

    let inv8 = inv_eight();
    let g = ED25519_BASEPOINT_POINT;
    let h = h_point();
    let gens = generators();
    let gi = &gens.gi[..mn];
    let hi = &gens.hi[..mn];

    let mut transcript = transcript_init();

    // V_j = (mask_j/8)*G + (amount_j/8)*H.
    let mut v = Vec::with_capacity(amounts.len());
    for (amount, mask) in amounts.iter().zip(&masks) {
        v.push(EdwardsPoint::vartime_multiscalar_mul(
            [mask * inv8, Scalar::from(*amount) * inv8],
            [g, h],
        ));
    }
    transcript = transcript_update(&transcript, &[&hash_points_to_scalar(&v).to_bytes()]);

    // Bit decomposition: aL in {0,1}, aR = aL - 1.
    let minus_one = -Scalar::ONE;
    let mut a_l = vec![Scalar::ZERO; mn];
    let mut a_r = vec![minus_one; mn];
    for (j, amount) in amounts.iter().enumerate() {
        for i in 0..N {
            if (amount >> i) & 1 == 1 {
                a_l[j * N + i] = Scalar::ONE;
                a_r[j * N + i] = Scalar::ZERO;
            }
        }
    }

    // A = sum(aL/8 * Gi + aR/8 * Hi) + (alpha/8)*G.
    let alpha = random_scalar();
    let mut a_scalars = Vec::with_capacity(2 * mn + 1);
    let mut a_points = Vec::with_capacity(2 * mn + 1);
    for i in 0..mn {
        a_scalars.push(a_l[i] * inv8);
        a_points.push(gi[i]);
        a_scalars.push(a_r[i] * inv8);
        a_points.push(hi[i]);
    }
    a_scalars.push(alpha * inv8);
    a_points.push(g);
    let big_a = EdwardsPoint::vartime_multiscalar_mul(&a_scalars, &a_points);

    // Challenges y, z.
    transcript = transcript_update(&transcript, &[&big_a.compress().to_bytes()]);
    let y = Scalar::from_bytes_mod_order(transcript);
    assert!(y != Scalar::ZERO, "degenerate transcript challenge");
    let z = Scalar::from_bytes_mod_order(keccak256(&y.to_bytes()));
    assert!(z != Scalar::ZERO, "degenerate transcript challenge");
    transcript = z.to_bytes();

    let z2 = z * z;

    // d vector: z^(2(j+1)) * 2^i windows.
    let mut d = vec![Scalar::ZERO; mn];
    let mut z_pow = z2;
    for j in 0..m {
        let mut two_pow = Scalar::ONE;
        for i in 0..N {
            d[j * N + i] = z_pow * two_pow;
            two_pow = two_pow + two_pow;
        }
        z_pow *= z2;
    }

    // Powers of y and y^-1.
    let mut y_powers = Vec::with_capacity(mn + 2);
    y_powers.push(Scalar::ONE);
    let mut yp = y;
    for _ in 1..=mn + 1 {
        y_powers.push(yp);
        yp *= y;
    }
    let y_inv = y.invert();
    let mut y_inv_powers = Vec::with_capacity(mn);
    y_inv_powers.push(Scalar::ONE);
    let mut yi = y_inv;
    for _ in 1..mn {
        y_inv_powers.push(yi);
        yi *= y_inv;
    }

    // aL1 = aL - z, aR1 = aR + z + d*y^(MN-i).
    let mut a_l1 = vec![Scalar::ZERO; mn];
    let mut a_r1 = vec![Scalar::ZERO; mn];
    for i in 0..mn {
        a_l1[i] = a_l[i] - z;
        a_r1[i] = a_r[i] + z + d[i] * y_powers[mn - i];
    }

    // Fold the gammas into alpha.
    let mut alpha1 = alpha;
    let mut zj = Scalar::ONE;
    for mask in &masks {
        zj *= z2;
        alpha1 += zj * y_powers[mn + 1] * mask;
    }

    // Inner-product rounds.
    let mut nprime = mn;
    let mut gprime: Vec<EdwardsPoint> = gi.to_vec();
    let mut hprime: Vec<EdwardsPoint> = hi.to_vec();
    let mut aprime = a_l1;
    let mut bprime = a_r1;
    let mut l_points = Vec::with_capacity(log_mn);
    let mut r_points = Vec::with_capacity(log_mn);

    while nprime > 1 {
        nprime /= 2;

        let mut c_l = Scalar::ZERO;
        let mut c_r = Scalar::ZERO;
        let mut y_pow = y;
        for i in 0..nprime {
            c_l += aprime[i] * bprime[nprime + i] * y_pow;
            c_r += aprime[nprime + i] * y_powers[nprime] * bprime[i] * y_pow;
            y_pow *= y;
        }

        let d_l = random_scalar();
        let d_r = random_scalar();

        let mut l_scalars = Vec::with_capacity(2 * nprime + 2);
        let mut l_pts = Vec::with_capacity(2 * nprime + 2);
        for i in 0..nprime {
            l_scalars.push(aprime[i] * y_inv_powers[nprime] * inv8);
            l_pts.push(gprime[nprime + i]);
            l_scalars.push(bprime[nprime + i] * inv8);
            l_pts.push(hprime[i]);
        }
        l_scalars.push(c_l * inv8);
        l_pts.push(h);
        l_scalars.push(d_l * inv8);
        l_pts.push(g);
        let l_point = EdwardsPoint::vartime_multiscalar_mul(&l_scalars, &l_pts);
        l_points.push(l_point);

        let mut r_scalars = Vec::with_capacity(2 * nprime + 2);
        let mut r_pts = Vec::with_capacity(2 * nprime + 2);
        for i in 0..nprime {
            r_scalars.push(aprime[nprime + i] * y_powers[nprime] * inv8);
            r_pts.push(gprime[i]);
            r_scalars.push(bprime[i] * inv8);
            r_pts.push(hprime[nprime + i]);
        }
        r_scalars.push(c_r * inv8);
        r_pts.push(h);
        r_scalars.push(d_r * inv8);
        r_pts.push(g);
        let r_point = EdwardsPoint::vartime_multiscalar_mul(&r_scalars, &r_pts);
        r_points.push(r_point);

        transcript = transcript_update(
            &transcript,
            &[&l_point.compress().to_bytes(), &r_point.compress().to_bytes()],
        );
        let x = Scalar::from_bytes_mod_order(transcript);
        assert!(x != Scalar::ZERO, "degenerate transcript challenge");
        let x_inv = x.invert();

        // Fold generators and scalars.
        let fold_g = y_inv_powers[nprime] * x;
        let fold_a = x_inv * y_powers[nprime];
        let mut next_g = Vec::with_capacity(nprime);
        let mut next_h = Vec::with_capacity(nprime);
        let mut next_a = Vec::with_capacity(nprime);
        let mut next_b = Vec::with_capacity(nprime);
        for i in 0..nprime {
            next_g.push(EdwardsPoint::vartime_multiscalar_mul(
                [x_inv, fold_g],
                [gprime[i], gprime[nprime + i]],
            ));
            next_h.push(EdwardsPoint::vartime_multiscalar_mul(
                [x, x_inv],
                [hprime[i], hprime[nprime + i]],
            ));
            next_a.push(aprime[i] * x + aprime[nprime + i] * fold_a);
            next_b.push(bprime[i] * x_inv + bprime[nprime + i] * x);
        }
        gprime = next_g;
        hprime = next_h;
        aprime = next_a;
        bprime = next_b;

        alpha1 += d_l * x * x + d_r * x_inv * x_inv;
    }

    // Final round.
    let r = random_scalar();
    let s = random_scalar();
    let d_ = random_scalar();
    let eta = random_scalar();

    let h_coeff = r * y * bprime[0] + s * y * aprime[0];
    let a1 = EdwardsPoint::vartime_multiscalar_mul(
        [r * inv8, s * inv8, d_ * inv8, h_coeff * inv8],
        [gprime[0], hprime[0], g, h],
    );
    let b = EdwardsPoint::vartime_multiscalar_mul([eta * inv8, r * y * s * inv8], [g, h]);

    transcript = transcript_update(
        &transcript,
        &[&a1.compress().to_bytes(), &b.compress().to_bytes()],
    );
    let e = Scalar::from_bytes_mod_order(transcript);
    assert!(e != Scalar::ZERO, "degenerate transcript challenge");

    Ok(BulletproofPlus {
        v,
        a: big_a,
        a1,
        b,
        r1: r + aprime[0] * e,
        s1: s + bprime[0] * e,
        d1: eta + d_ * e + alpha1 * e * e,
        l: l_points,
        r: r_points,
    })
}

// ─── Verifier ───────────────────────────────────────────────────────────────

/// Verify one proof against its V points (commitments/8).
pub fn verify(v: &[EdwardsPoint], proof: &BulletproofPlus) -> bool {
    verify_batch(&[(v, proof)])
}

/// Batch-verify: one fused MSM over every proof, random per-proof weights.
pub fn verify_batch(proofs: &[(&[EdwardsPoint], &BulletproofPlus)]) -> bool {
    if proofs.is_empty() {
        return true;
    }

    struct ProofState<'a> {
        v: &'a [EdwardsPoint],
        proof: &'a BulletproofPlus,
        m: usize,
        m_pow2: usize,
        mn: usize,
        rounds: usize,
        y: Scalar,
        z: Scalar,
        e: Scalar,
        challenges: Vec<Scalar>,
        challenge_inverses: Vec<Scalar>,
        y_inv: Scalar,
    }

    let init = transcript_init();
    let mut states = Vec::with_capacity(proofs.len());
    let mut to_invert = Vec::new();

    // Phase 1: replay each proof's transcript.
    for &(v, proof) in proofs {
        let m = v.len();
        if m == 0 || m > MAX_OUTPUTS {
            return false;
        }
        let mut m_pow2 = 1usize;
        let mut log_m = 0usize;
        while m_pow2 < m {
            m_pow2 *= 2;
            log_m += 1;
        }
        let mn = m_pow2 * N;
        let rounds = proof.l.len();
        if rounds != LOG_N + log_m || proof.r.len() != rounds {
            return false;
        }

        let mut transcript = init;
        transcript =
            transcript_update(&transcript, &[&hash_points_to_scalar(v).to_bytes()]);
        transcript = transcript_update(&transcript, &[&proof.a.compress().to_bytes()]);
        let y = Scalar::from_bytes_mod_order(transcript);
        if y == Scalar::ZERO {
            return false;
        }
        let z = Scalar::from_bytes_mod_order(keccak256(&y.to_bytes()));
        if z == Scalar::ZERO {
            return false;
        }
        transcript = z.to_bytes();

        let mut challenges = Vec::with_capacity(rounds);
        for j in 0..rounds {
            transcript = transcript_update(
                &transcript,
                &[
                    &proof.l[j].compress().to_bytes(),
                    &proof.r[j].compress().to_bytes(),
                ],
            );
            let x = Scalar::from_bytes_mod_order(transcript);
            if x == Scalar::ZERO {
                return false;
            }
            challenges.push(x);
            to_invert.push(x);
        }

        transcript = transcript_update(
            &transcript,
            &[
                &proof.a1.compress().to_bytes(),
                &proof.b.compress().to_bytes(),
            ],
        );
        let e = Scalar::from_bytes_mod_order(transcript);
        if e == Scalar::ZERO {
            return false;
        }
        to_invert.push(y);

        states.push(ProofState {
            v,
            proof,
            m,
            m_pow2,
            mn,
            rounds,
            y,
            z,
            e,
            challenges,
            challenge_inverses: Vec::new(),
            y_inv: Scalar::ZERO,
        });
    }

    // Phase 2: batch inversion (Montgomery's trick).
    let inverses = batch_invert(&to_invert);
    let mut idx = 0;
    for state in &mut states {
        state.challenge_inverses = inverses[idx..idx + state.rounds].to_vec();
        idx += state.rounds;
        state.y_inv = inverses[idx];
        idx += 1;
    }

    // Phase 3: accumulate the single weighted MSM.
    let gens = generators();
    let mut scalars: Vec<Scalar> = Vec::new();
    let mut points: Vec<EdwardsPoint> = Vec::new();
    let mut g_scalar = Scalar::ZERO;
    let mut h_scalar = Scalar::ZERO;

    for state in &states {
        let weight = if proofs.len() == 1 { Scalar::ONE } else { random_scalar() };

        let e2 = state.e * state.e;
        let y_mn = scalar_pow(&state.y, state.mn);
        let y_mn_plus_1 = y_mn * state.y;

        let z2 = state.z * state.z;
        let mut z_powers = Vec::with_capacity(state.m_pow2);
        z_powers.push(z2);
        for j in 1..state.m_pow2 {
            z_powers.push(z_powers[j - 1] * z2);
        }

        let sum_d = Scalar::from(u64::MAX)
            * z_powers.iter().fold(Scalar::ZERO, |acc, zp| acc + zp);

        let mut sum_y = Scalar::ZERO;
        let mut yp = state.y;
        for _ in 0..state.mn {
            sum_y += yp;
            yp *= state.y;
        }

        // V terms.
        for (j, v_point) in state.v.iter().enumerate() {
            scalars.push(-(weight * e2 * z_powers[j] * y_mn_plus_1));
            points.push(mul8(v_point));
        }

        // A, A1, B.
        scalars.push(-(weight * e2));
        points.push(mul8(&state.proof.a));
        scalars.push(-(weight * state.e));
        points.push(mul8(&state.proof.a1));
        scalars.push(-weight);
        points.push(mul8(&state.proof.b));

        g_scalar += weight * state.proof.d1;

        let h_term1 = state.proof.r1 * state.y * state.proof.s1;
        let h_term2 = y_mn_plus_1 * state.z * sum_d;
        let h_term3 = (z2 - state.z) * sum_y;
        h_scalar += weight * (h_term1 + e2 * (h_term2 + h_term3));

        // Per-generator scalars via the folded challenge cache.
        let cache = challenge_cache(&state.challenges, &state.challenge_inverses, state.mn);
        let mut e_r1_w = state.e * state.proof.r1 * weight;
        let e_s1_w = state.e * state.proof.s1 * weight;
        let e2_z_w = e2 * state.z * weight;
        let minus_e2_z_w = -e2_z_w;
        let mut minus_e2_w_y = -(e2 * weight * y_mn);

        for i in 0..state.mn {
            let d_val = z_powers[i / N] * Scalar::from(1u64 << (i % N));
            let gi_scalar = e_r1_w * cache[i] + e2_z_w;
            let hi_scalar =
                e_s1_w * cache[(!i) & (state.mn - 1)] + minus_e2_z_w + minus_e2_w_y * d_val;

            scalars.push(gi_scalar);
            points.push(gens.gi[i]);
            scalars.push(hi_scalar);
            points.push(gens.hi[i]);

            e_r1_w *= state.y_inv;
            minus_e2_w_y *= state.y_inv;
        }

        // L/R terms.
        for j in 0..state.rounds {
            let x2 = state.challenges[j] * state.challenges[j];
            let x_inv2 = state.challenge_inverses[j] * state.challenge_inverses[j];
            scalars.push(-(weight * e2 * x2));
            points.push(mul8(&state.proof.l[j]));
            scalars.push(-(weight * e2 * x_inv2));
            points.push(mul8(&state.proof.r[j]));
        }
    }

    if g_scalar != Scalar::ZERO {
        scalars.push(g_scalar);
        points.push(ED25519_BASEPOINT_POINT);
    }
    if h_scalar != Scalar::ZERO {
        scalars.push(h_scalar);
        points.push(h_point());
    }

    EdwardsPoint::vartime_multiscalar_mul(&scalars, &points).is_identity()
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn scalar_pow(base: &Scalar, mut exp: usize) -> Scalar {
    let mut result = Scalar::ONE;
    let mut acc = *base;
    while exp > 0 {
        if exp & 1 == 1 {
            result *= acc;
        }
        acc *= acc;
        exp >>= 1;
    }
    result
}

fn batch_invert(scalars: &[Scalar]) -> Vec<Scalar> {
    if scalars.is_empty() {
        return Vec::new();
    }
    let n = scalars.len();
    let mut products = Vec::with_capacity(n);
    let mut acc = scalars[0];
    products.push(acc);
    for s in &scalars[1..] {
        acc *= s;
        products.push(acc);
    }

    let mut inv = acc.invert();
    let mut result = vec![Scalar::ZERO; n];
    for i in (1..n).rev() {
        result[i] = products[i - 1] * inv;
        inv *= scalars[i];
    }
    result[0] = inv;
    result
}

/// Expand the round challenges into per-index products of x / x^-1.
fn challenge_cache(challenges: &[Scalar], inverses: &[Scalar], mn: usize) -> Vec<Scalar> {
    let rounds = challenges.len();
    let mut cache = vec![Scalar::ZERO; mn];
    cache[0] = inverses[0];
    cache[1] = challenges[0];
    for j in 1..rounds {
        let slots = 1usize << (j + 1);
        for s in (0..slots).rev() {
            cache[s] = if s % 2 == 1 {
                cache[s / 2] * challenges[j]
            } else {
                cache[s / 2] * inverses[j]
            };
        }
    }
    cache
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn random_mask() -> [u8; 32] {
        random_scalar().to_bytes()
    }

    #[test]
    fn single_amount_proves_and_verifies() {
        let proof = prove(&[1_000_000], &[random_mask()]).unwrap();
        assert!(verify(&proof.v, &proof));
    }

    #[test]
    fn boundary_amounts() {
        for amount in [0u64, 1, u64::MAX] {
            let proof = prove(&[amount], &[random_mask()]).unwrap();
            assert!(verify(&proof.v, &proof), "amount {amount}");
        }
    }

    #[test]
    fn aggregated_non_power_of_two() {
        let amounts = [5u64, 10, 15];
        let masks = [random_mask(), random_mask(), random_mask()];
        let proof = prove(&amounts, &masks).unwrap();
        assert!(verify(&proof.v, &proof));
    }

    #[test]
    fn batch_of_two_proofs() {
        let p1 = prove(&[100, 200, 300, 400], &[random_mask(), random_mask(), random_mask(), random_mask()]).unwrap();
        let p2 = prove(&[7, 8, 9, 10], &[random_mask(), random_mask(), random_mask(), random_mask()]).unwrap();
        assert!(verify_batch(&[(&p1.v, &p1), (&p2.v, &p2)]));
    }

    #[test]
    fn tampered_proof_fails_alone_and_in_batch() {
        let good = prove(&[42], &[random_mask()]).unwrap();
        let mut bad = prove(&[43], &[random_mask()]).unwrap();
        bad.r1 += Scalar::ONE;
        assert!(!verify(&bad.v, &bad));
        assert!(!verify_batch(&[(&good.v, &good), (&bad.v, &bad)]));
        assert!(verify(&good.v, &good));
    }

    #[test]
    fn commitment_substitution_fails() {
        let proof = prove(&[1000], &[random_mask()]).unwrap();
        let other = prove(&[2000], &[random_mask()]).unwrap();
        assert!(!verify(&other.v, &proof));
    }

    #[test]
    fn v_matches_scaled_pedersen_commitment() {
        let mask = random_mask();
        let proof = prove(&[12345], &[mask]).unwrap();
        let commitment = crate::pedersen::commit(12345, &mask);
        assert_eq!(mul8(&proof.v[0]).compress().to_bytes(), commitment);
        // And the round trip through commitment_to_v.
        assert_eq!(commitment_to_v(&commitment).unwrap(), proof.v[0]);
    }

    #[test]
    fn wire_bytes_roundtrip() {
        let proof = prove(&[55, 66], &[random_mask(), random_mask()]).unwrap();
        let l: Vec<[u8; 32]> = proof.l.iter().map(|p| p.compress().to_bytes()).collect();
        let r: Vec<[u8; 32]> = proof.r.iter().map(|p| p.compress().to_bytes()).collect();
        let rebuilt = BulletproofPlus::from_bytes(
            &proof.a.compress().to_bytes(),
            &proof.a1.compress().to_bytes(),
            &proof.b.compress().to_bytes(),
            &proof.r1.to_bytes(),
            &proof.s1.to_bytes(),
            &proof.d1.to_bytes(),
            &l,
            &r,
        )
        .unwrap();
        assert!(verify(&proof.v, &rebuilt));
    }

    #[test]
    fn from_bytes_rejects_invalid_points() {
        let proof = prove(&[1], &[random_mask()]).unwrap();
        let l: Vec<[u8; 32]> = proof.l.iter().map(|p| p.compress().to_bytes()).collect();
        let r: Vec<[u8; 32]> = proof.r.iter().map(|p| p.compress().to_bytes()).collect();
        let result = BulletproofPlus::from_bytes(
            &[0xAA; 32], // not a point
            &proof.a1.compress().to_bytes(),
            &proof.b.compress().to_bytes(),
            &proof.r1.to_bytes(),
            &proof.s1.to_bytes(),
            &proof.d1.to_bytes(),
            &l,
            &r,
        );
        assert!(matches!(result, Err(CryptoError::InvalidPoint)));
    }

    #[test]
    fn too_many_outputs_rejected() {
        let amounts = vec![1u64; MAX_OUTPUTS + 1];
        let masks = vec![random_mask(); MAX_OUTPUTS + 1];
        assert!(prove(&amounts, &masks).is_err());
    }

    #[test]
    fn mismatched_round_count_fails() {
        let proof = prove(&[5], &[random_mask()]).unwrap();
        let mut short = proof.clone();
        short.l.pop();
        assert!(!verify(&proof.v, &short));
    }
}
