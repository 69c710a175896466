//! CARROT enote scanning (the receiver side).
//!
//! Recognition pipeline per output: X25519 ECDH, 3-byte view-tag check
//! (the fast reject), contextualized secret, spend-key recovery against the
//! subaddress table, amount decryption, and the PAYMENT/CHANGE commitment
//! probe. A `None` result means "not ours" and is never an error.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::traits::VartimeMultiscalarMul;

use crate::carrot_enote::{enote_type, VIEW_TAG_SIZE};
use crate::carrot_keys::{derive_bytes, derive_bytes_32, derive_scalar, domain};
use crate::pedersen::{commit, t_point};
use crate::subaddress::SubaddressTable;
use crate::{decompress, scalar, x25519, CryptoError};

/// One enote as it appears on chain, ready for scanning.
pub struct CarrotEnote<'a> {
    pub onetime_address: &'a [u8; 32],
    pub view_tag: &'a [u8; VIEW_TAG_SIZE],
    /// D_e from tx extra (X25519 u-coordinate).
    pub ephemeral_pubkey: &'a [u8; 32],
    pub encrypted_amount: &'a [u8; 8],
    /// The amount commitment; None for coinbase enotes.
    pub commitment: Option<&'a [u8; 32]>,
    /// Clear amount for coinbase enotes.
    pub clear_amount: Option<u64>,
}

/// A recognized enote.
pub struct CarrotScanResult {
    pub amount: u64,
    pub mask: [u8; 32],
    /// PAYMENT (0) or CHANGE (1), decided by the commitment probe.
    pub enote_type: u8,
    /// The contextualized sender-receiver secret; stored for spending.
    pub shared_secret: [u8; 32],
    pub address_spend_pubkey: [u8; 32],
    pub subaddress_major: u32,
    pub subaddress_minor: u32,
}

/// Scan one external enote with the view-incoming key.
pub fn scan_enote(
    enote: &CarrotEnote,
    view_incoming_key: &[u8; 32],
    account_spend_pubkey: &[u8; 32],
    input_context: &[u8; 33],
    subaddresses: &SubaddressTable,
) -> Option<CarrotScanResult> {
    // Step 1: unclamped X25519 ECDH.
    let s_sr = x25519::scalar_mult(view_incoming_key, enote.ephemeral_pubkey);
    scan_with_secret(&s_sr, enote, account_spend_pubkey, input_context, subaddresses)
}

/// Scan a self-send enote: s_vb plays the uncontextualized secret directly,
/// no ECDH.
pub fn scan_internal_enote(
    enote: &CarrotEnote,
    view_balance_secret: &[u8; 32],
    account_spend_pubkey: &[u8; 32],
    input_context: &[u8; 33],
    subaddresses: &SubaddressTable,
) -> Option<CarrotScanResult> {
    scan_with_secret(
        view_balance_secret,
        enote,
        account_spend_pubkey,
        input_context,
        subaddresses,
    )
}

fn scan_with_secret(
    s_sr: &[u8; 32],
    enote: &CarrotEnote,
    account_spend_pubkey: &[u8; 32],
    input_context: &[u8; 33],
    subaddresses: &SubaddressTable,
) -> Option<CarrotScanResult> {
    // Step 2: view-tag fast reject. Everything below only runs for a
    // 1-in-2^24 false positive or an actual hit.
    let expected = derive_bytes(
        s_sr,
        domain::VIEW_TAG,
        &[input_context, enote.onetime_address],
        VIEW_TAG_SIZE,
    );
    if expected[..] != enote.view_tag[..] {
        return None;
    }

    // Step 3: contextualized secret.
    let s_ctx = derive_bytes_32(
        s_sr,
        domain::SENDER_RECEIVER_SECRET,
        &[enote.ephemeral_pubkey, input_context],
    );

    // Step 4: peel the one-time extensions off Ko.
    let commitment_bytes = enote.commitment.copied().unwrap_or([0u8; 32]);
    let recovered =
        recover_address_spend_pubkey(enote.onetime_address, &s_ctx, &commitment_bytes).ok()?;

    // Step 5: subaddress attribution.
    let (major, minor) = if recovered == *account_spend_pubkey {
        (0, 0)
    } else {
        *subaddresses.get(&recovered)?
    };

    // Step 6: amount.
    let amount = match enote.clear_amount {
        Some(clear) => clear,
        None => decrypt_amount(enote.encrypted_amount, &s_ctx, enote.onetime_address),
    };

    // Step 7: mask recovery — try PAYMENT, then CHANGE.
    let (mask, etype) = match enote.commitment {
        Some(commitment) => {
            let payment = derive_commitment_mask(&s_ctx, amount, &recovered, enote_type::PAYMENT);
            if commit(amount, &payment) == *commitment {
                (payment, enote_type::PAYMENT)
            } else {
                let change =
                    derive_commitment_mask(&s_ctx, amount, &recovered, enote_type::CHANGE);
                if commit(amount, &change) != *commitment {
                    return None;
                }
                (change, enote_type::CHANGE)
            }
        }
        // Coinbase: nothing to probe against.
        None => (
            derive_commitment_mask(&s_ctx, amount, &recovered, enote_type::PAYMENT),
            enote_type::PAYMENT,
        ),
    };

    Some(CarrotScanResult {
        amount,
        mask,
        enote_type: etype,
        shared_secret: s_ctx,
        address_spend_pubkey: recovered,
        subaddress_major: major,
        subaddress_minor: minor,
    })
}

/// `K_j_s = Ko - k_g*G - k_t*T` with both extensions drawn from s_ctx.
pub fn recover_address_spend_pubkey(
    onetime_address: &[u8; 32],
    s_ctx: &[u8; 32],
    commitment: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let k_g = derive_scalar(s_ctx, domain::EXTENSION_G, &[commitment]);
    let k_t = derive_scalar(s_ctx, domain::EXTENSION_T, &[commitment]);
    let extension = EdwardsPoint::vartime_multiscalar_mul(
        [k_g, k_t],
        [ED25519_BASEPOINT_POINT, t_point()],
    );
    Ok((decompress(onetime_address)? - extension).compress().to_bytes())
}

pub fn decrypt_amount(encrypted: &[u8; 8], s_ctx: &[u8; 32], onetime_address: &[u8; 32]) -> u64 {
    let mask = derive_bytes(s_ctx, domain::ENCRYPTION_MASK_AMOUNT, &[onetime_address], 8);
    u64::from_le_bytes(std::array::from_fn(|i| encrypted[i] ^ mask[i]))
}

pub fn decrypt_anchor(
    encrypted: &[u8; 16],
    s_ctx: &[u8; 32],
    onetime_address: &[u8; 32],
) -> [u8; 16] {
    let mask = derive_bytes(s_ctx, domain::ENCRYPTION_MASK_ANCHOR, &[onetime_address], 16);
    std::array::from_fn(|i| encrypted[i] ^ mask[i])
}

pub fn derive_commitment_mask(
    s_ctx: &[u8; 32],
    amount: u64,
    address_spend_pubkey: &[u8; 32],
    enote_type: u8,
) -> [u8; 32] {
    derive_scalar(
        s_ctx,
        domain::COMMITMENT_MASK,
        &[&amount.to_le_bytes(), address_spend_pubkey, &[enote_type]],
    )
    .to_bytes()
}

/// One-time secrets for spending a recognized enote with TCLSAG:
/// `x` scales G, `y` scales T. For subaddress enotes the additive
/// subaddress scalar folds into `x`.
pub fn derive_spend_keys(
    prove_spend_key: &[u8; 32],
    generate_image_key: &[u8; 32],
    subaddress_scalar: Option<&[u8; 32]>,
    s_ctx: &[u8; 32],
    commitment: &[u8; 32],
) -> ([u8; 32], [u8; 32]) {
    let k_g = derive_scalar(s_ctx, domain::EXTENSION_G, &[commitment]);
    let k_t = derive_scalar(s_ctx, domain::EXTENSION_T, &[commitment]);

    let mut x = scalar(generate_image_key) + k_g;
    if let Some(m) = subaddress_scalar {
        x += scalar(m);
    }
    let y = scalar(prove_spend_key) + k_t;
    (x.to_bytes(), y.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrot_enote::{
        build_enote_with_anchor, input_context_coinbase, input_context_rct, CarrotDestination,
        CarrotEnoteParams,
    };
    use crate::carrot_keys::CarrotKeys;
    use crate::subaddress::{
        carrot_subaddress_scalar, carrot_subaddress_spend_pubkey, carrot_subaddress_table,
        carrot_subaddress_view_pubkey,
    };

    fn enote_view<'a>(
        built: &'a crate::carrot_enote::BuiltEnote,
        clear_amount: Option<u64>,
    ) -> CarrotEnote<'a> {
        CarrotEnote {
            onetime_address: &built.onetime_address,
            view_tag: &built.view_tag,
            ephemeral_pubkey: &built.ephemeral_pubkey,
            encrypted_amount: &built.encrypted_amount,
            commitment: if clear_amount.is_some() { None } else { Some(&built.amount_commitment) },
            clear_amount,
        }
    }

    #[test]
    fn round_trip_to_main_address() {
        let keys = CarrotKeys::from_master(&[21; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            0,
            0,
        )
        .unwrap();
        let ctx = input_context_rct(&[0x11; 32]);
        let dest = CarrotDestination {
            spend_pubkey: keys.account_spend_pubkey,
            view_pubkey: keys.account_view_pubkey,
            is_subaddress: false,
        };
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 12_345_678,
            enote_type: enote_type::PAYMENT,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (built, _) = build_enote_with_anchor(&params, &[5; 16]).unwrap();

        let enote = enote_view(&built, None);
        let found = scan_enote(
            &enote,
            &keys.view_incoming_key,
            &keys.account_spend_pubkey,
            &ctx,
            &table,
        )
        .expect("own enote must be recognized");

        assert_eq!(found.amount, 12_345_678);
        assert_eq!(found.enote_type, enote_type::PAYMENT);
        assert_eq!(found.mask, built.commitment_mask);
        assert_eq!(found.address_spend_pubkey, keys.account_spend_pubkey);
        assert_eq!((found.subaddress_major, found.subaddress_minor), (0, 0));
    }

    #[test]
    fn round_trip_to_subaddress() {
        let keys = CarrotKeys::from_master(&[22; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            2,
            4,
        )
        .unwrap();
        let sub_spend = carrot_subaddress_spend_pubkey(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            2,
            3,
        )
        .unwrap();
        let sub_view =
            carrot_subaddress_view_pubkey(&sub_spend, &keys.view_incoming_key).unwrap();

        let ctx = input_context_rct(&[0x22; 32]);
        let dest = CarrotDestination {
            spend_pubkey: sub_spend,
            view_pubkey: sub_view,
            is_subaddress: true,
        };
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 999,
            enote_type: enote_type::PAYMENT,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (built, _) = build_enote_with_anchor(&params, &[6; 16]).unwrap();

        let enote = enote_view(&built, None);
        let found = scan_enote(
            &enote,
            &keys.view_incoming_key,
            &keys.account_spend_pubkey,
            &ctx,
            &table,
        )
        .expect("subaddress enote must be recognized");
        assert_eq!((found.subaddress_major, found.subaddress_minor), (2, 3));
        assert_eq!(found.amount, 999);
    }

    #[test]
    fn change_enote_type_is_detected() {
        let keys = CarrotKeys::from_master(&[23; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            0,
            0,
        )
        .unwrap();
        let ctx = input_context_rct(&[0x33; 32]);
        let dest = CarrotDestination {
            spend_pubkey: keys.account_spend_pubkey,
            view_pubkey: keys.account_view_pubkey,
            is_subaddress: false,
        };
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 42,
            enote_type: enote_type::CHANGE,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (built, _) = build_enote_with_anchor(&params, &[9; 16]).unwrap();
        let enote = enote_view(&built, None);
        let found = scan_enote(
            &enote,
            &keys.view_incoming_key,
            &keys.account_spend_pubkey,
            &ctx,
            &table,
        )
        .unwrap();
        assert_eq!(found.enote_type, enote_type::CHANGE);
    }

    #[test]
    fn foreign_wallet_sees_nothing() {
        let sender_target = CarrotKeys::from_master(&[24; 32]);
        let other = CarrotKeys::from_master(&[25; 32]);
        let table = carrot_subaddress_table(
            &other.account_spend_pubkey,
            &other.generate_address_secret,
            1,
            1,
        )
        .unwrap();
        let ctx = input_context_coinbase(5);
        let dest = CarrotDestination {
            spend_pubkey: sender_target.account_spend_pubkey,
            view_pubkey: sender_target.account_view_pubkey,
            is_subaddress: false,
        };
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 1,
            enote_type: enote_type::PAYMENT,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (built, _) = build_enote_with_anchor(&params, &[1; 16]).unwrap();
        let enote = enote_view(&built, None);
        assert!(scan_enote(
            &enote,
            &other.view_incoming_key,
            &other.account_spend_pubkey,
            &ctx,
            &table,
        )
        .is_none());
    }

    #[test]
    fn tampered_view_tag_rejects() {
        let keys = CarrotKeys::from_master(&[26; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            0,
            0,
        )
        .unwrap();
        let ctx = input_context_rct(&[0x44; 32]);
        let dest = CarrotDestination {
            spend_pubkey: keys.account_spend_pubkey,
            view_pubkey: keys.account_view_pubkey,
            is_subaddress: false,
        };
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 10,
            enote_type: enote_type::PAYMENT,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (mut built, _) = build_enote_with_anchor(&params, &[2; 16]).unwrap();
        built.view_tag[0] ^= 0xFF;
        let enote = enote_view(&built, None);
        assert!(scan_enote(
            &enote,
            &keys.view_incoming_key,
            &keys.account_spend_pubkey,
            &ctx,
            &table,
        )
        .is_none());
    }

    #[test]
    fn anchor_round_trips() {
        let keys = CarrotKeys::from_master(&[27; 32]);
        let ctx = input_context_rct(&[0x55; 32]);
        let dest = CarrotDestination {
            spend_pubkey: keys.account_spend_pubkey,
            view_pubkey: keys.account_view_pubkey,
            is_subaddress: false,
        };
        let anchor = [0xC3; 16];
        let params = CarrotEnoteParams {
            destination: &dest,
            amount: 10,
            enote_type: enote_type::PAYMENT,
            payment_id: [0; 8],
            input_context: &ctx,
        };
        let (built, _) = build_enote_with_anchor(&params, &anchor).unwrap();

        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            0,
            0,
        )
        .unwrap();
        let enote = enote_view(&built, None);
        let found = scan_enote(
            &enote,
            &keys.view_incoming_key,
            &keys.account_spend_pubkey,
            &ctx,
            &table,
        )
        .unwrap();
        assert_eq!(
            decrypt_anchor(&built.encrypted_anchor, &found.shared_secret, &built.onetime_address),
            anchor
        );
    }

    #[test]
    fn spend_keys_open_the_onetime_address() {
        // Ko must equal x*G + y*T for the derived spend pair, including the
        // subaddress case.
        use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
        use curve25519_dalek::edwards::EdwardsPoint;
        use curve25519_dalek::traits::VartimeMultiscalarMul;

        let keys = CarrotKeys::from_master(&[28; 32]);
        let table = carrot_subaddress_table(
            &keys.account_spend_pubkey,
            &keys.generate_address_secret,
            1,
            2,
        )
        .unwrap();
        let ctx = input_context_rct(&[0x66; 32]);

        for sub in [None, Some((1u32, 2u32))] {
            let (spend, view, m) = match sub {
                None => (keys.account_spend_pubkey, keys.account_view_pubkey, None),
                Some((major, minor)) => {
                    let s = carrot_subaddress_spend_pubkey(
                        &keys.account_spend_pubkey,
                        &keys.generate_address_secret,
                        major,
                        minor,
                    )
                    .unwrap();
                    let v = carrot_subaddress_view_pubkey(&s, &keys.view_incoming_key).unwrap();
                    let m = carrot_subaddress_scalar(&keys.generate_address_secret, major, minor)
                        .to_bytes();
                    (s, v, Some(m))
                }
            };

            let dest = CarrotDestination {
                spend_pubkey: spend,
                view_pubkey: view,
                is_subaddress: sub.is_some(),
            };
            let params = CarrotEnoteParams {
                destination: &dest,
                amount: 31337,
                enote_type: enote_type::PAYMENT,
                payment_id: [0; 8],
                input_context: &ctx,
            };
            let (built, _) = build_enote_with_anchor(&params, &[3; 16]).unwrap();
            let enote = enote_view(&built, None);
            let found = scan_enote(
                &enote,
                &keys.view_incoming_key,
                &keys.account_spend_pubkey,
                &ctx,
                &table,
            )
            .unwrap();

            let (x, y) = derive_spend_keys(
                &keys.prove_spend_key.unwrap(),
                &keys.generate_image_key,
                m.as_ref(),
                &found.shared_secret,
                &built.amount_commitment,
            );
            let opened = EdwardsPoint::vartime_multiscalar_mul(
                [crate::scalar(&x), crate::scalar(&y)],
                [ED25519_BASEPOINT_POINT, t_point()],
            );
            assert_eq!(opened.compress().to_bytes(), built.onetime_address);
        }
    }
}
