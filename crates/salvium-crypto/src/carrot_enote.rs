//! CARROT enote construction (the sender side).
//!
//! Builds the one-time address, amount commitment, 3-byte view tag, and the
//! encrypted amount / anchor / payment-id fields for one output. The scanner
//! in [`crate::carrot_scan`] inverts every step here; the two modules must
//! stay in lockstep.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::traits::VartimeMultiscalarMul;

use crate::carrot_keys::{build_transcript, derive_bytes, derive_scalar, domain};
use crate::pedersen::{commit, t_point};
use crate::{blake2b, decompress, to32, x25519, CryptoError};

/// Enote type byte: payments and change commit to different masks.
pub mod enote_type {
    pub const PAYMENT: u8 = 0;
    pub const CHANGE: u8 = 1;
}

pub const ANCHOR_SIZE: usize = 16;
pub const VIEW_TAG_SIZE: usize = 3;

/// Input context: 'C' + height for coinbase, 'R' + first key image for
/// ring-signed transactions. Always 33 bytes.
pub fn input_context_coinbase(block_height: u64) -> [u8; 33] {
    let mut ctx = [0u8; 33];
    ctx[0] = b'C';
    ctx[1..9].copy_from_slice(&block_height.to_le_bytes());
    ctx
}

pub fn input_context_rct(first_key_image: &[u8; 32]) -> [u8; 33] {
    let mut ctx = [0u8; 33];
    ctx[0] = b'R';
    ctx[1..].copy_from_slice(first_key_image);
    ctx
}

/// Where an enote is going.
pub struct CarrotDestination {
    /// Address spend pubkey (the subaddress key when sending to one).
    pub spend_pubkey: [u8; 32],
    /// Address view pubkey.
    pub view_pubkey: [u8; 32],
    pub is_subaddress: bool,
}

/// What to put in the enote.
pub struct CarrotEnoteParams<'a> {
    pub destination: &'a CarrotDestination,
    pub amount: u64,
    pub enote_type: u8,
    pub payment_id: [u8; 8],
    pub input_context: &'a [u8; 33],
}

/// A fully built enote plus the secrets the builder still needs.
pub struct BuiltEnote {
    pub onetime_address: [u8; 32],
    pub amount_commitment: [u8; 32],
    pub commitment_mask: [u8; 32],
    pub encrypted_amount: [u8; 8],
    pub view_tag: [u8; VIEW_TAG_SIZE],
    pub encrypted_anchor: [u8; ANCHOR_SIZE],
    pub encrypted_payment_id: [u8; 8],
    /// D_e: the X25519 ephemeral pubkey that goes into tx extra.
    pub ephemeral_pubkey: [u8; 32],
}

/// Build one enote from a fresh random anchor.
pub fn build_enote(params: &CarrotEnoteParams) -> Result<(BuiltEnote, [u8; 32]), CryptoError> {
    let mut anchor = [0u8; ANCHOR_SIZE];
    getrandom::getrandom(&mut anchor).expect("OS randomness unavailable");
    build_enote_with_anchor(params, &anchor)
}

/// Deterministic core, split out so tests can fix the anchor.
pub fn build_enote_with_anchor(
    params: &CarrotEnoteParams,
    anchor: &[u8; ANCHOR_SIZE],
) -> Result<(BuiltEnote, [u8; 32]), CryptoError> {
    let dest = params.destination;

    // Ephemeral scalar d_e = H_n(anchor || input_context || K_s || pid), unkeyed.
    let transcript = build_transcript(
        domain::SENDING_KEY,
        &[anchor, params.input_context, &dest.spend_pubkey, &params.payment_id],
    );
    let d_e = {
        let hash = blake2b(&transcript, 64);
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&hash);
        curve25519_dalek::scalar::Scalar::from_bytes_mod_order_wide(&wide)
    };
    let d_e_bytes = d_e.to_bytes();

    // D_e: against the X25519 base for main addresses, against the
    // subaddress spend key for subaddresses (so the receiver cannot be
    // linked across its subaddresses).
    let ephemeral_pubkey = if dest.is_subaddress {
        let spend_u = x25519::edwards_to_montgomery_u(&dest.spend_pubkey)?;
        x25519::scalar_mult(&d_e_bytes, &spend_u)
    } else {
        x25519::scalar_mult_base(&d_e_bytes)
    };

    // Unclamped ECDH against the address view key.
    let view_u = x25519::edwards_to_montgomery_u(&dest.view_pubkey)?;
    let s_sr = x25519::scalar_mult(&d_e_bytes, &view_u);

    // Contextualized secret.
    let s_ctx = crate::carrot_keys::derive_bytes_32(
        &s_sr,
        domain::SENDER_RECEIVER_SECRET,
        &[&ephemeral_pubkey, params.input_context],
    );

    // Commitment mask and amount commitment.
    let amount_le = params.amount.to_le_bytes();
    let commitment_mask = derive_scalar(
        &s_ctx,
        domain::COMMITMENT_MASK,
        &[&amount_le, &dest.spend_pubkey, &[params.enote_type]],
    )
    .to_bytes();
    let amount_commitment = commit(params.amount, &commitment_mask);

    // One-time address: Ko = K_s + k_g*G + k_t*T.
    let k_g = derive_scalar(&s_ctx, domain::EXTENSION_G, &[&amount_commitment]);
    let k_t = derive_scalar(&s_ctx, domain::EXTENSION_T, &[&amount_commitment]);
    let extension = EdwardsPoint::vartime_multiscalar_mul(
        [k_g, k_t],
        [ED25519_BASEPOINT_POINT, t_point()],
    );
    let onetime_address = (decompress(&dest.spend_pubkey)? + extension)
        .compress()
        .to_bytes();

    // View tag, keyed by the *uncontextualized* secret for cheap rejection.
    let vt = derive_bytes(
        &s_sr,
        domain::VIEW_TAG,
        &[params.input_context, &onetime_address],
        VIEW_TAG_SIZE,
    );
    let view_tag = [vt[0], vt[1], vt[2]];

    // Encrypted fields, all keyed by the contextualized secret over Ko.
    let anchor_mask = derive_bytes(
        &s_ctx,
        domain::ENCRYPTION_MASK_ANCHOR,
        &[&onetime_address],
        ANCHOR_SIZE,
    );
    let encrypted_anchor = std::array::from_fn(|i| anchor[i] ^ anchor_mask[i]);

    let amount_mask =
        derive_bytes(&s_ctx, domain::ENCRYPTION_MASK_AMOUNT, &[&onetime_address], 8);
    let encrypted_amount = std::array::from_fn(|i| amount_le[i] ^ amount_mask[i]);

    let pid_mask =
        derive_bytes(&s_ctx, domain::ENCRYPTION_MASK_PAYMENT_ID, &[&onetime_address], 8);
    let encrypted_payment_id = std::array::from_fn(|i| params.payment_id[i] ^ pid_mask[i]);

    Ok((
        BuiltEnote {
            onetime_address,
            amount_commitment,
            commitment_mask,
            encrypted_amount,
            view_tag,
            encrypted_anchor,
            encrypted_payment_id,
            ephemeral_pubkey,
        },
        to32(&d_e_bytes),
    ))
}
