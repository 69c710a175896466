//! CARROT key hierarchy: five secrets below the master secret.
//!
//! ```text
//! s_m ── k_ps  (prove-spend scalar)
//!    └── s_vb ── k_gi  (generate-image scalar)
//!            ├── k_vi  (view-incoming scalar)
//!            └── s_ga  (generate-address secret)
//! K_s = k_gi*G + k_ps*T      account spend pubkey
//! K_v = k_vi*K_s             account view pubkey
//! K_v0 = k_vi*G              primary-address view pubkey
//! ```
//!
//! All hashes are keyed BLAKE2b over a fixed transcript
//! `[domain_len] || domain || data...` (the SpFixedTranscript layout).

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;

use crate::pedersen::t_point;
use crate::{blake2b_keyed, decompress, to32, CryptoError};

// ─── Domain separators (carrot_core/config.h) ───────────────────────────────

pub(crate) mod domain {
    pub const PROVE_SPEND_KEY: &[u8] = b"Carrot prove-spend key";
    pub const VIEW_BALANCE_SECRET: &[u8] = b"Carrot view-balance secret";
    pub const GENERATE_IMAGE_KEY: &[u8] = b"Carrot generate-image key";
    pub const INCOMING_VIEW_KEY: &[u8] = b"Carrot incoming view key";
    pub const GENERATE_ADDRESS_SECRET: &[u8] = b"Carrot generate-address secret";
    pub const SUBADDRESS_SCALAR: &[u8] = b"Carrot subaddress scalar";
    pub const SENDING_KEY: &[u8] = b"Carrot sending key normal";
    pub const SENDER_RECEIVER_SECRET: &[u8] = b"Carrot sender-receiver secret";
    pub const VIEW_TAG: &[u8] = b"Carrot view tag";
    pub const COMMITMENT_MASK: &[u8] = b"Carrot commitment mask";
    pub const EXTENSION_G: &[u8] = b"Carrot key extension G";
    pub const EXTENSION_T: &[u8] = b"Carrot key extension T";
    pub const ENCRYPTION_MASK_ANCHOR: &[u8] = b"Carrot encryption mask anchor";
    pub const ENCRYPTION_MASK_AMOUNT: &[u8] = b"Carrot encryption mask a";
    pub const ENCRYPTION_MASK_PAYMENT_ID: &[u8] = b"Carrot encryption mask pid";
}

// ─── Transcript helpers shared by the whole CARROT family ───────────────────

/// `[domain_len] || domain || data...`
pub(crate) fn build_transcript(domain: &[u8], data: &[&[u8]]) -> Vec<u8> {
    let total = 1 + domain.len() + data.iter().map(|d| d.len()).sum::<usize>();
    let mut buf = Vec::with_capacity(total);
    buf.push(domain.len() as u8);
    buf.extend_from_slice(domain);
    for d in data {
        buf.extend_from_slice(d);
    }
    buf
}

/// `H_n`: 64-byte keyed BLAKE2b reduced to a scalar.
pub(crate) fn derive_scalar(key: &[u8], domain: &[u8], data: &[&[u8]]) -> Scalar {
    let hash = blake2b_keyed(&build_transcript(domain, data), 64, key);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hash);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// `H_32`: 32-byte keyed BLAKE2b.
pub(crate) fn derive_bytes_32(key: &[u8], domain: &[u8], data: &[&[u8]]) -> [u8; 32] {
    to32(&blake2b_keyed(&build_transcript(domain, data), 32, key))
}

/// Short keyed BLAKE2b (view tags, encryption masks).
pub(crate) fn derive_bytes(key: &[u8], domain: &[u8], data: &[&[u8]], out_len: usize) -> Vec<u8> {
    blake2b_keyed(&build_transcript(domain, data), out_len, key)
}

// ─── Key sets ───────────────────────────────────────────────────────────────

/// Full CARROT key set as derived from the master secret.
#[derive(Clone)]
pub struct CarrotKeys {
    pub master_secret: Option<[u8; 32]>,
    /// k_ps — only in full wallets.
    pub prove_spend_key: Option<[u8; 32]>,
    /// s_vb.
    pub view_balance_secret: [u8; 32],
    /// k_gi.
    pub generate_image_key: [u8; 32],
    /// k_vi.
    pub view_incoming_key: [u8; 32],
    /// s_ga.
    pub generate_address_secret: [u8; 32],
    /// K_s = k_gi*G + k_ps*T.
    pub account_spend_pubkey: [u8; 32],
    /// K_v0 = k_vi*G.
    pub primary_address_view_pubkey: [u8; 32],
    /// K_v = k_vi*K_s.
    pub account_view_pubkey: [u8; 32],
}

impl CarrotKeys {
    /// Derive the full hierarchy from a 32-byte master secret.
    pub fn from_master(master_secret: &[u8; 32]) -> Self {
        let prove_spend = derive_scalar(master_secret, domain::PROVE_SPEND_KEY, &[]);
        let view_balance = derive_bytes_32(master_secret, domain::VIEW_BALANCE_SECRET, &[]);
        let generate_image = derive_scalar(&view_balance, domain::GENERATE_IMAGE_KEY, &[]);
        let view_incoming = derive_scalar(&view_balance, domain::INCOMING_VIEW_KEY, &[]);
        let generate_address = derive_bytes_32(&view_balance, domain::GENERATE_ADDRESS_SECRET, &[]);

        let account_spend = EdwardsPoint::vartime_multiscalar_mul(
            [generate_image, prove_spend],
            [ED25519_BASEPOINT_POINT, t_point()],
        );
        let primary_view = ED25519_BASEPOINT_TABLE * &view_incoming;
        let account_view = view_incoming * account_spend;

        Self {
            master_secret: Some(*master_secret),
            prove_spend_key: Some(prove_spend.to_bytes()),
            view_balance_secret: view_balance,
            generate_image_key: generate_image.to_bytes(),
            view_incoming_key: view_incoming.to_bytes(),
            generate_address_secret: generate_address,
            account_spend_pubkey: account_spend.compress().to_bytes(),
            primary_address_view_pubkey: primary_view.compress().to_bytes(),
            account_view_pubkey: account_view.compress().to_bytes(),
        }
    }

    /// Derive the view-only subset from s_vb and the account spend pubkey
    /// (which cannot be recomputed without k_ps).
    pub fn view_only(
        view_balance_secret: &[u8; 32],
        account_spend_pubkey: &[u8; 32],
    ) -> Result<Self, CryptoError> {
        let generate_image = derive_scalar(view_balance_secret, domain::GENERATE_IMAGE_KEY, &[]);
        let view_incoming = derive_scalar(view_balance_secret, domain::INCOMING_VIEW_KEY, &[]);
        let generate_address =
            derive_bytes_32(view_balance_secret, domain::GENERATE_ADDRESS_SECRET, &[]);

        let spend_point = decompress(account_spend_pubkey)?;
        let primary_view = ED25519_BASEPOINT_TABLE * &view_incoming;
        let account_view = view_incoming * spend_point;

        Ok(Self {
            master_secret: None,
            prove_spend_key: None,
            view_balance_secret: *view_balance_secret,
            generate_image_key: generate_image.to_bytes(),
            view_incoming_key: view_incoming.to_bytes(),
            generate_address_secret: generate_address,
            account_spend_pubkey: *account_spend_pubkey,
            primary_address_view_pubkey: primary_view.compress().to_bytes(),
            account_view_pubkey: account_view.compress().to_bytes(),
        })
    }

    pub fn can_spend(&self) -> bool {
        self.prove_spend_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = CarrotKeys::from_master(&[0x42; 32]);
        let b = CarrotKeys::from_master(&[0x42; 32]);
        assert_eq!(a.account_spend_pubkey, b.account_spend_pubkey);
        assert_eq!(a.account_view_pubkey, b.account_view_pubkey);
    }

    #[test]
    fn all_keys_differ() {
        let keys = CarrotKeys::from_master(&[0x01; 32]);
        let all = [
            keys.prove_spend_key.unwrap(),
            keys.view_balance_secret,
            keys.generate_image_key,
            keys.view_incoming_key,
            keys.generate_address_secret,
            keys.account_spend_pubkey,
            keys.primary_address_view_pubkey,
            keys.account_view_pubkey,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn view_only_matches_full() {
        let full = CarrotKeys::from_master(&[0x55; 32]);
        let view =
            CarrotKeys::view_only(&full.view_balance_secret, &full.account_spend_pubkey).unwrap();
        assert_eq!(view.generate_image_key, full.generate_image_key);
        assert_eq!(view.view_incoming_key, full.view_incoming_key);
        assert_eq!(view.generate_address_secret, full.generate_address_secret);
        assert_eq!(view.primary_address_view_pubkey, full.primary_address_view_pubkey);
        assert_eq!(view.account_view_pubkey, full.account_view_pubkey);
        assert!(!view.can_spend());
        assert!(full.can_spend());
    }

    #[test]
    fn spend_pubkey_decomposes_over_both_generators() {
        // K_s - k_ps*T must equal k_gi*G.
        let keys = CarrotKeys::from_master(&[0x07; 32]);
        let k_ps = crate::scalar(&keys.prove_spend_key.unwrap());
        let k_gi = crate::scalar(&keys.generate_image_key);
        let expected = decompress(&keys.account_spend_pubkey).unwrap() - k_ps * t_point();
        assert_eq!(
            expected.compress().to_bytes(),
            (ED25519_BASEPOINT_TABLE * &k_gi).compress().to_bytes()
        );
    }

    #[test]
    fn transcript_layout() {
        let t = build_transcript(b"test", &[&[1, 2], &[3]]);
        assert_eq!(t[0], 4);
        assert_eq!(&t[1..5], b"test");
        assert_eq!(&t[5..], &[1, 2, 3]);
    }
}
