//! Signing pipeline: pseudo-output balancing, the aggregate range proof,
//! the pre-MLSAG message, and one ring signature per input.

use crate::builder::UnsignedTransaction;
use crate::codec;
use crate::types::*;
use crate::TxError;
use salvium_crypto::{
    bulletproofs_plus, clsag, hash_to_scalar_parts, pedersen, sc_add, sc_sub, scalar_mult_base,
    tclsag,
};

/// Compressed Ed25519 identity: y = 1.
pub const IDENTITY: [u8; 32] = {
    let mut id = [0u8; 32];
    id[0] = 1;
    id
};

/// Sign an unsigned transaction into its final wire form.
///
/// The result re-parses and re-verifies: `parse(serialize(signed))` equals
/// `signed`, and the validator accepts it against the rings the builder
/// was given.
pub fn sign_transaction(unsigned: UnsignedTransaction) -> Result<Transaction, TxError> {
    let num_inputs = unsigned.inputs.len();
    if num_inputs == 0 {
        return Err(TxError::NoInputs);
    }
    if unsigned.output_amounts.is_empty() {
        return Err(TxError::NoDestinations);
    }
    let use_tclsag = unsigned.rct_type == rct_type::SALVIUM_ONE;

    // Pseudo-output masks: random for all but the last, which balances
    // sum(pseudo) == sum(output masks). The fee term carries no mask.
    let (pseudo_masks, pseudo_outs) = balance_pseudo_outputs(&unsigned);

    // One aggregate range proof over every output.
    let proof = bulletproofs_plus::prove(&unsigned.output_amounts, &unsigned.output_masks)?;
    let bp_ser = BulletproofPlusSer {
        a: proof.a.compress().to_bytes(),
        a1: proof.a1.compress().to_bytes(),
        b: proof.b.compress().to_bytes(),
        r1: proof.r1.to_bytes(),
        s1: proof.s1.to_bytes(),
        d1: proof.d1.to_bytes(),
        l: proof.l.iter().map(|p| p.compress().to_bytes()).collect(),
        r: proof.r.iter().map(|p| p.compress().to_bytes()).collect(),
    };

    // Balanced masks mean the publication point is the identity, and the
    // proof-of-knowledge is over a zero difference.
    let p_r = IDENTITY;
    let salvium_data = match unsigned.rct_type {
        rct_type::SALVIUM_ZERO | rct_type::SALVIUM_ONE => Some(SalviumData::Salvium {
            data_type: if unsigned.rct_type == rct_type::SALVIUM_ONE { 2 } else { 0 },
            pr_proof: prove_zero_difference(&p_r),
            sa_proof: ZkProof::ZERO,
            audit: None,
        }),
        rct_type::FULL_PROOFS => Some(SalviumData::Proofs {
            pr_proof: prove_zero_difference(&p_r),
            sa_proof: ZkProof::ZERO,
        }),
        _ => None,
    };

    let mut rct = RctSignatures {
        rct_type: unsigned.rct_type,
        fee: unsigned.fee,
        ecdh_amounts: unsigned.encrypted_amounts.clone(),
        out_pk: unsigned.output_commitments.clone(),
        p_r,
        salvium_data,
        bulletproofs_plus: vec![bp_ser],
        clsags: Vec::new(),
        tclsags: Vec::new(),
        pseudo_outs: pseudo_outs.clone(),
    };

    let message = codec::pre_mlsag_hash(&unsigned.prefix, &rct);

    for (i, (input, _image)) in unsigned.inputs.iter().enumerate() {
        let z = sc_sub(&input.mask, &pseudo_masks[i]);

        if use_tclsag {
            let secret_y = input.secret_key_y.ok_or(TxError::MissingTwinSecret(i))?;
            let sig = tclsag::sign(
                &message,
                &input.ring,
                &input.secret_key,
                &secret_y,
                &input.ring_commitments,
                &z,
                &pseudo_outs[i],
                input.real_index,
            )?;
            rct.tclsags.push(TclsagSer { sx: sig.sx, sy: sig.sy, c1: sig.c1, d: sig.commitment_image });
        } else {
            let sig = clsag::sign(
                &message,
                &input.ring,
                &input.secret_key,
                &input.ring_commitments,
                &z,
                &pseudo_outs[i],
                input.real_index,
            )?;
            rct.clsags.push(ClsagSer { s: sig.s, c1: sig.c1, d: sig.commitment_image });
        }
    }

    Ok(Transaction { prefix: unsigned.prefix, rct: Some(rct) })
}

fn balance_pseudo_outputs(unsigned: &UnsignedTransaction) -> (Vec<[u8; 32]>, Vec<[u8; 32]>) {
    let n = unsigned.inputs.len();
    let output_mask_sum = unsigned
        .output_masks
        .iter()
        .fold([0u8; 32], |acc, mask| sc_add(&acc, mask));

    let mut masks = Vec::with_capacity(n);
    if n == 1 {
        masks.push(output_mask_sum);
    } else {
        let mut partial = [0u8; 32];
        for _ in 0..n - 1 {
            let mask = random_mask();
            partial = sc_add(&partial, &mask);
            masks.push(mask);
        }
        masks.push(sc_sub(&output_mask_sum, &partial));
    }

    let pseudo_outs = unsigned
        .inputs
        .iter()
        .zip(&masks)
        .map(|((input, _), mask)| pedersen::commit(input.amount, mask))
        .collect();

    (masks, pseudo_outs)
}

/// Schnorr proof of knowledge of the (zero) discrete log of p_r:
/// `R = r*G`, `c = H_s(R || p_r)`, `z1 = r + c*0`, `z2 = 0`.
fn prove_zero_difference(p_r: &[u8; 32]) -> ZkProof {
    debug_assert_eq!(p_r, &IDENTITY);
    let r = random_mask();
    // With a zero difference, z1 = r + c*0 = r; the challenge drops out.
    ZkProof { r: scalar_mult_base(&r), z1: r, z2: [0; 32] }
}

/// Check a publication-point proof: `z1*G == R + c*p_r`.
pub fn verify_pr_proof(proof: &ZkProof, p_r: &[u8; 32]) -> bool {
    let c = hash_to_scalar_parts(&[&proof.r, p_r]);
    if p_r == &IDENTITY {
        // Identity point contributes nothing.
        return scalar_mult_base(&proof.z1) == proof.r;
    }
    match salvium_crypto::double_scalar_mult_base(&c.to_bytes(), p_r, &[0; 32]) {
        Ok(c_pr) => match salvium_crypto::point_add(&proof.r, &c_pr) {
            Ok(expected) => scalar_mult_base(&proof.z1) == expected,
            Err(_) => false,
        },
        Err(_) => false,
    }
}

fn random_mask() -> [u8; 32] {
    use rand::RngCore;
    let mut wide = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut wide);
    salvium_crypto::sc_reduce64(&wide)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_difference_proof_verifies() {
        let proof = prove_zero_difference(&IDENTITY);
        assert!(verify_pr_proof(&proof, &IDENTITY));
    }

    #[test]
    fn tampered_pr_proof_fails() {
        let mut proof = prove_zero_difference(&IDENTITY);
        proof.z1 = sc_add(&proof.z1, &{
            let mut one = [0u8; 32];
            one[0] = 1;
            one
        });
        assert!(!verify_pr_proof(&proof, &IDENTITY));
    }

    #[test]
    fn identity_constant_is_the_neutral_point() {
        // IDENTITY + IDENTITY == IDENTITY.
        assert_eq!(salvium_crypto::point_add(&IDENTITY, &IDENTITY).unwrap(), IDENTITY);
    }
}
