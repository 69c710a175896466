//! Transaction validator.
//!
//! Re-checks a parsed transaction against externally resolved ring members:
//! static shape, the commitment balance equation, range proofs, one ring
//! signature per input, and the Salvium conversion/stake extensions.
//! Failures accumulate into a [`ValidationReport`] unless fail-fast is
//! requested.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;

use crate::codec;
use crate::sign::verify_pr_proof;
use crate::types::*;
use salvium_crypto::bulletproofs_plus::{self, BulletproofPlus};
use salvium_crypto::pedersen::h_point;
use salvium_crypto::{clsag, tclsag, CryptoError};
use salvium_types::NetworkParams;

/// One resolved ring member, fetched by the caller from the daemon's
/// per-asset global output index (see the relative-offset decoding in
/// [`crate::builder::relative_to_absolute`]).
#[derive(Debug, Clone, Copy)]
pub struct RingMember {
    /// One-time output key.
    pub key: [u8; 32],
    /// Amount commitment.
    pub commitment: [u8; 32],
}

/// Why validation failed; `input`/`proof` indices refer to the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    NoInputs,
    NoOutputs,
    NotRct,
    DuplicateKeyImage { input: usize },
    SignatureCountMismatch { expected: usize, got: usize },
    RangeProofCapacity { capacity: usize, outputs: usize },
    RingResolution { input: usize, expected: usize, got: usize },
    InvalidEncoding { what: &'static str },
    BalanceMismatch,
    RangeProofInvalid { proof: usize },
    RingSignatureInvalid { input: usize },
    PrProofInvalid,
    SaProofInvalid,
    AssetsNotConvertible,
    StakeLockPeriod { expected: u64, got: u64 },
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoInputs => write!(f, "transaction has no inputs"),
            Self::NoOutputs => write!(f, "transaction has no outputs"),
            Self::NotRct => write!(f, "transaction carries no RCT signatures"),
            Self::DuplicateKeyImage { input } => {
                write!(f, "input {input} repeats a key image")
            }
            Self::SignatureCountMismatch { expected, got } => {
                write!(f, "{got} ring signatures for {expected} inputs")
            }
            Self::RangeProofCapacity { capacity, outputs } => {
                write!(f, "range proofs cover {capacity} outputs, transaction has {outputs}")
            }
            Self::RingResolution { input, expected, got } => {
                write!(f, "input {input}: resolved {got} ring members, need {expected}")
            }
            Self::InvalidEncoding { what } => write!(f, "non-canonical encoding in {what}"),
            Self::BalanceMismatch => {
                write!(f, "pseudo-outputs do not balance outputs + fee + p_r")
            }
            Self::RangeProofInvalid { proof } => write!(f, "range proof {proof} invalid"),
            Self::RingSignatureInvalid { input } => {
                write!(f, "ring signature for input {input} invalid")
            }
            Self::PrProofInvalid => write!(f, "pr_proof does not verify against p_r"),
            Self::SaProofInvalid => write!(f, "sa_proof does not verify"),
            Self::AssetsNotConvertible => {
                write!(f, "conversion between identical asset types")
            }
            Self::StakeLockPeriod { expected, got } => {
                write!(f, "stake unlock {got} != required {expected}")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub failures: Vec<CheckFailure>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validator knobs. `reference_height` enables the stake lock check.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions<'a> {
    pub fail_fast: bool,
    pub network: Option<&'a NetworkParams>,
    pub reference_height: Option<u64>,
}

/// Validate a transaction against resolved rings (one per key input, in
/// input order).
pub fn verify_transaction(
    tx: &Transaction,
    rings: &[Vec<RingMember>],
    options: VerifyOptions,
) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    macro_rules! fail {
        ($failure:expr) => {{
            report.failures.push($failure);
            if options.fail_fast {
                return Err(report);
            }
        }};
    }

    // ── Static checks ──────────────────────────────────────────────────
    if tx.prefix.inputs.is_empty() {
        fail!(CheckFailure::NoInputs);
    }
    if tx.prefix.outputs.is_empty() {
        fail!(CheckFailure::NoOutputs);
    }

    let images: Vec<&[u8; 32]> = tx.prefix.key_images().collect();
    for (i, image) in images.iter().enumerate() {
        if images[..i].contains(image) {
            fail!(CheckFailure::DuplicateKeyImage { input: i });
        }
    }

    let Some(rct) = tx.rct.as_ref().filter(|r| r.rct_type != rct_type::NULL) else {
        report.failures.push(CheckFailure::NotRct);
        return Err(report);
    };

    let key_input_count = images.len();
    let sig_count = if rct.uses_tclsag() { rct.tclsags.len() } else { rct.clsags.len() };
    if sig_count != key_input_count {
        fail!(CheckFailure::SignatureCountMismatch {
            expected: key_input_count,
            got: sig_count,
        });
    }

    let capacity: usize = rct
        .bulletproofs_plus
        .iter()
        .map(|bp| 1usize << bp.l.len().saturating_sub(6).min(4))
        .sum();
    if capacity < tx.prefix.outputs.len() {
        fail!(CheckFailure::RangeProofCapacity {
            capacity,
            outputs: tx.prefix.outputs.len(),
        });
    }

    // ── Balance: pseudo-outs against outputs, fee, burn, and p_r ───────
    match balance_holds(rct, tx.prefix.amount_burnt) {
        Ok(true) => {}
        Ok(false) => fail!(CheckFailure::BalanceMismatch),
        Err(_) => fail!(CheckFailure::InvalidEncoding { what: "commitments" }),
    }

    // ── Range proofs, batched ──────────────────────────────────────────
    match check_range_proofs(rct) {
        Ok(None) => {}
        Ok(Some(proof)) => fail!(CheckFailure::RangeProofInvalid { proof }),
        Err(_) => fail!(CheckFailure::InvalidEncoding { what: "range proof" }),
    }

    // ── Ring signatures ────────────────────────────────────────────────
    if rings.len() != key_input_count {
        fail!(CheckFailure::RingResolution {
            input: rings.len().min(key_input_count),
            expected: key_input_count,
            got: rings.len(),
        });
    } else if sig_count == key_input_count && rct.pseudo_outs.len() == key_input_count {
        let message = codec::pre_mlsag_hash(&tx.prefix, rct);
        let mut key_input = 0usize;
        for input in &tx.prefix.inputs {
            let TxInput::Key { key_offsets, key_image, .. } = input else { continue };
            let ring = &rings[key_input];
            if ring.len() != key_offsets.len() {
                fail!(CheckFailure::RingResolution {
                    input: key_input,
                    expected: key_offsets.len(),
                    got: ring.len(),
                });
                key_input += 1;
                continue;
            }

            let keys: Vec<[u8; 32]> = ring.iter().map(|m| m.key).collect();
            let commitments: Vec<[u8; 32]> = ring.iter().map(|m| m.commitment).collect();
            let pseudo = &rct.pseudo_outs[key_input];

            // "Expansion": the key image comes from the prefix, never the
            // serialized signature.
            let valid = if rct.uses_tclsag() {
                let ser = &rct.tclsags[key_input];
                let sig = tclsag::TclsagSignature {
                    sx: ser.sx.clone(),
                    sy: ser.sy.clone(),
                    c1: ser.c1,
                    key_image: *key_image,
                    commitment_image: ser.d,
                };
                tclsag::verify(&message, &sig, &keys, &commitments, pseudo)
            } else {
                let ser = &rct.clsags[key_input];
                let sig = clsag::ClsagSignature {
                    s: ser.s.clone(),
                    c1: ser.c1,
                    key_image: *key_image,
                    commitment_image: ser.d,
                };
                clsag::verify(&message, &sig, &keys, &commitments, pseudo)
            };

            if !valid {
                fail!(CheckFailure::RingSignatureInvalid { input: key_input });
            }
            key_input += 1;
        }
    }

    // ── Salvium extensions ─────────────────────────────────────────────
    if let Some(data) = &rct.salvium_data {
        let (pr_proof, sa_proof) = match data {
            SalviumData::Proofs { pr_proof, sa_proof } => (pr_proof, sa_proof),
            SalviumData::Salvium { pr_proof, sa_proof, .. } => (pr_proof, sa_proof),
        };
        if !verify_pr_proof(pr_proof, &rct.p_r) {
            fail!(CheckFailure::PrProofInvalid);
        }
        if tx.prefix.tx_type == tx_type::CONVERT {
            if tx.prefix.source_asset_type == tx.prefix.destination_asset_type {
                fail!(CheckFailure::AssetsNotConvertible);
            }
            if !verify_pr_proof(sa_proof, &rct.p_r) {
                fail!(CheckFailure::SaProofInvalid);
            }
        }
    }

    if tx.prefix.tx_type == tx_type::STAKE {
        if let (Some(network), Some(height)) = (options.network, options.reference_height) {
            let expected = height + network.stake_lock_period;
            if tx.prefix.unlock_time != expected {
                fail!(CheckFailure::StakeLockPeriod {
                    expected,
                    got: tx.prefix.unlock_time,
                });
            }
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(report)
    }
}

/// `sum(pseudo_outs) == sum(outPk) + (fee + amount_burnt)*H + p_r` — the
/// burnt amount leaves the commitment sum without a destination output.
fn balance_holds(rct: &RctSignatures, amount_burnt: u64) -> Result<bool, CryptoError> {
    let mut left = EdwardsPoint::identity();
    for pseudo in &rct.pseudo_outs {
        left += decompress(pseudo)?;
    }

    let mut right = EdwardsPoint::identity();
    for out in &rct.out_pk {
        right += decompress(out)?;
    }
    let fee_and_burn = Scalar::from(rct.fee) + Scalar::from(amount_burnt);
    right += fee_and_burn * h_point();
    right += decompress(&rct.p_r)?;

    Ok(left == right)
}

fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint)
}

/// Batch-verify every range proof; returns the index of the first failing
/// proof, if any.
fn check_range_proofs(rct: &RctSignatures) -> Result<Option<usize>, CryptoError> {
    let mut parsed = Vec::with_capacity(rct.bulletproofs_plus.len());
    let mut v_sets: Vec<Vec<EdwardsPoint>> = Vec::with_capacity(rct.bulletproofs_plus.len());

    let mut consumed = 0usize;
    for (index, bp) in rct.bulletproofs_plus.iter().enumerate() {
        let proof = BulletproofPlus::from_bytes(
            &bp.a, &bp.a1, &bp.b, &bp.r1, &bp.s1, &bp.d1, &bp.l, &bp.r,
        )?;
        let max = 1usize << proof.l.len().saturating_sub(6).min(4);
        let take = max.min(rct.out_pk.len() - consumed);
        if take == 0 {
            // More proofs than outputs to cover.
            return Ok(Some(index));
        }
        let v: Vec<EdwardsPoint> = rct.out_pk[consumed..consumed + take]
            .iter()
            .map(bulletproofs_plus::commitment_to_v)
            .collect::<Result<_, _>>()?;
        consumed += take;
        parsed.push(proof);
        v_sets.push(v);
    }

    // Whole batch first; bisect to the culprit only on failure.
    let batch: Vec<(&[EdwardsPoint], &BulletproofPlus)> = v_sets
        .iter()
        .map(|v| v.as_slice())
        .zip(parsed.iter())
        .collect();
    if bulletproofs_plus::verify_batch(&batch) {
        return Ok(None);
    }
    for (i, (v, proof)) in batch.iter().enumerate() {
        if !bulletproofs_plus::verify(v, proof) {
            return Ok(Some(i));
        }
    }
    Ok(Some(0))
}
