//! Per-transaction output recognition.
//!
//! Feeds each output of a parsed transaction through the era-appropriate
//! scanner from salvium-crypto: legacy outputs through the CN derivation
//! path, CARROT outputs through the external scan with an internal
//! (self-send) retry. Unrecognized outputs are silently skipped — only
//! matches come back.

use salvium_crypto::carrot_enote::{input_context_coinbase, input_context_rct};
use salvium_crypto::carrot_scan::{
    derive_spend_keys, scan_enote, scan_internal_enote, CarrotEnote,
};
use salvium_crypto::subaddress::{carrot_subaddress_scalar, SubaddressTable};
use salvium_crypto::{cn, generate_key_image};
use salvium_tx::extra::{find_additional_pubkeys, find_pubkey, parse_extra};
use salvium_tx::types::{Transaction, TxInput, TxOutput};
use salvium_types::AddressEra;

use crate::keys::WalletKeys;
use crate::store::EnoteRecord;
use crate::WalletError;

/// Keys and lookup tables, prepared once per sync session.
pub struct ScanContext {
    cn_view_secret: [u8; 32],
    cn_spend_secret: Option<[u8; 32]>,
    cn_table: SubaddressTable,
    carrot: salvium_crypto::carrot_keys::CarrotKeys,
    carrot_table: SubaddressTable,
}

impl ScanContext {
    /// Precompute subaddress tables for majors/minors up to the given
    /// inclusive bounds.
    pub fn new(
        keys: &WalletKeys,
        major_count: u32,
        minor_count: u32,
    ) -> Result<Self, WalletError> {
        let (cn_table, carrot_table) = keys.subaddress_tables(major_count, minor_count)?;
        Ok(Self {
            cn_view_secret: keys.cn.view_secret,
            cn_spend_secret: keys.cn.spend_secret,
            cn_table,
            carrot: keys.carrot.clone(),
            carrot_table,
        })
    }
}

/// Scan one parsed transaction. Returned enotes are ordered by output
/// index; outputs the wallet does not own simply do not appear.
pub fn scan_transaction(
    ctx: &ScanContext,
    tx: &Transaction,
    tx_hash: [u8; 32],
    block_height: u64,
) -> Vec<EnoteRecord> {
    let is_coinbase = tx.is_coinbase();

    // Ephemeral pubkeys from the extra TLV; a broken extra only disables
    // recognition, it is not an error.
    let fields = parse_extra(&tx.prefix.extra).unwrap_or_default();
    let shared_pubkey = find_pubkey(&fields);
    let additional = find_additional_pubkeys(&fields);

    // Input context for CARROT outputs.
    let input_context = if is_coinbase {
        match tx.prefix.inputs.first() {
            Some(TxInput::Gen { height }) => Some(input_context_coinbase(*height)),
            _ => None,
        }
    } else {
        tx.prefix.key_images().next().map(input_context_rct)
    };

    // Legacy derivation from the shared tx pubkey (invalid for pure CARROT
    // transactions, whose extra key is an X25519 point).
    let cn_shared_derivation = shared_pubkey
        .and_then(|r| cn::generate_key_derivation(&r, &ctx.cn_view_secret).ok());

    let mut found = Vec::new();

    for (index, output) in tx.prefix.outputs.iter().enumerate() {
        let per_output_key = additional.and_then(|keys| keys.get(index).copied());
        let rct = tx.rct.as_ref();
        let encrypted_amount = rct
            .and_then(|r| r.ecdh_amounts.get(index))
            .copied()
            .unwrap_or([0u8; 8]);
        let commitment = rct.and_then(|r| r.out_pk.get(index));

        let record = match output {
            TxOutput::Key { .. } | TxOutput::TaggedKey { .. } => scan_legacy_output(
                ctx,
                output,
                index as u32,
                per_output_key,
                &cn_shared_derivation,
                encrypted_amount,
                commitment,
                is_coinbase,
            ),
            TxOutput::CarrotV1 { .. } => {
                let Some(context) = input_context.as_ref() else { continue };
                scan_carrot_output(
                    ctx,
                    output,
                    per_output_key.or(shared_pubkey),
                    context,
                    encrypted_amount,
                    commitment,
                    is_coinbase,
                )
            }
        };

        if let Some(mut record) = record {
            record.tx_hash = tx_hash;
            record.block_height = block_height;
            record.output_index = index as u32;
            record.is_coinbase = is_coinbase;
            if record.unlock_time == 0 {
                record.unlock_time = tx.prefix.unlock_time;
            }
            found.push(record);
        }
    }

    found
}

#[allow(clippy::too_many_arguments)]
fn scan_legacy_output(
    ctx: &ScanContext,
    output: &TxOutput,
    index: u32,
    per_output_key: Option<[u8; 32]>,
    shared_derivation: &Option<[u8; 32]>,
    encrypted_amount: [u8; 8],
    commitment: Option<&[u8; 32]>,
    is_coinbase: bool,
) -> Option<EnoteRecord> {
    let (key, view_tag, unlock_time) = match output {
        TxOutput::Key { key, unlock_time, .. } => (key, None, *unlock_time),
        TxOutput::TaggedKey { key, view_tag, unlock_time, .. } => {
            (key, Some(*view_tag), *unlock_time)
        }
        TxOutput::CarrotV1 { .. } => return None,
    };

    // Subaddress sends publish per-output tx pubkeys; derive against the
    // matching one when present.
    let per_output_derivation = per_output_key
        .and_then(|r| cn::generate_key_derivation(&r, &ctx.cn_view_secret).ok());
    let derivation = per_output_derivation.or(*shared_derivation)?;

    let clear_amount = is_coinbase.then(|| output.amount());
    let input = cn::CnScanInput {
        output_pubkey: key,
        derivation: &derivation,
        output_index: index,
        view_tag,
        clear_amount,
        encrypted_amount: &encrypted_amount,
        commitment: if is_coinbase { None } else { commitment },
    };

    let result = cn::scan_output(
        &input,
        &ctx.cn_view_secret,
        ctx.cn_spend_secret.as_ref(),
        &ctx.cn_table,
    )?;

    Some(EnoteRecord {
        key_image: result.key_image,
        onetime_address: *key,
        amount: result.amount,
        mask: result.mask,
        asset_type: output.asset_type().to_string(),
        era: AddressEra::Legacy,
        enote_type: 0,
        subaddress: (result.subaddress_major, result.subaddress_minor),
        block_height: 0,
        tx_hash: [0; 32],
        output_index: index,
        unlock_time,
        is_coinbase,
        shared_secret: Some(result.shared_secret),
        spent: None,
        frozen: false,
    })
}

fn scan_carrot_output(
    ctx: &ScanContext,
    output: &TxOutput,
    ephemeral_pubkey: Option<[u8; 32]>,
    input_context: &[u8; 33],
    encrypted_amount: [u8; 8],
    commitment: Option<&[u8; 32]>,
    is_coinbase: bool,
) -> Option<EnoteRecord> {
    let TxOutput::CarrotV1 { key, view_tag, .. } = output else { return None };
    let ephemeral = ephemeral_pubkey?;

    let clear_amount = is_coinbase.then(|| output.amount());
    let enote = CarrotEnote {
        onetime_address: key,
        view_tag,
        ephemeral_pubkey: &ephemeral,
        encrypted_amount: &encrypted_amount,
        commitment: if is_coinbase { None } else { commitment },
        clear_amount,
    };

    // External scan first, then the self-send path keyed directly on the
    // view-balance secret.
    let result = scan_enote(
        &enote,
        &ctx.carrot.view_incoming_key,
        &ctx.carrot.account_spend_pubkey,
        input_context,
        &ctx.carrot_table,
    )
    .or_else(|| {
        scan_internal_enote(
            &enote,
            &ctx.carrot.view_balance_secret,
            &ctx.carrot.account_spend_pubkey,
            input_context,
            &ctx.carrot_table,
        )
    })?;

    // Key image needs the full key set; view-only wallets record the enote
    // and defer spending.
    let key_image = ctx.carrot.prove_spend_key.as_ref().map(|prove_spend| {
        let subaddress_scalar = (result.subaddress_major != 0 || result.subaddress_minor != 0)
            .then(|| {
                carrot_subaddress_scalar(
                    &ctx.carrot.generate_address_secret,
                    result.subaddress_major,
                    result.subaddress_minor,
                )
                .to_bytes()
            });
        let commitment_bytes = commitment.copied().unwrap_or([0u8; 32]);
        let (x, _y) = derive_spend_keys(
            prove_spend,
            &ctx.carrot.generate_image_key,
            subaddress_scalar.as_ref(),
            &result.shared_secret,
            &commitment_bytes,
        );
        generate_key_image(key, &x)
    });

    Some(EnoteRecord {
        key_image,
        onetime_address: *key,
        amount: result.amount,
        mask: result.mask,
        asset_type: output.asset_type().to_string(),
        era: AddressEra::Carrot,
        enote_type: result.enote_type,
        subaddress: (result.subaddress_major, result.subaddress_minor),
        block_height: 0,
        tx_hash: [0; 32],
        output_index: 0,
        unlock_time: 0,
        is_coinbase,
        shared_secret: Some(result.shared_secret),
        spent: None,
        frozen: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvium_tx::builder::{PreparedInput, TransactionBuilder};
    use salvium_tx::sign::sign_transaction;
    use salvium_types::{Address, Network};

    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
    use curve25519_dalek::edwards::EdwardsPoint;
    use curve25519_dalek::traits::VartimeMultiscalarMul;

    fn twin_input(amount: u64, seed: u8) -> PreparedInput {
        let x = salvium_crypto::hash_to_scalar(&[seed, 0]);
        let y = salvium_crypto::hash_to_scalar(&[seed, 1]);
        let t = salvium_crypto::pedersen::t_point();
        let public = EdwardsPoint::vartime_multiscalar_mul([x, y], [ED25519_BASEPOINT_POINT, t])
            .compress()
            .to_bytes();
        let mask = salvium_crypto::hash_to_scalar(&[seed, 2]).to_bytes();
        let ring_size = 16;
        let mut ring = Vec::new();
        let mut commitments = Vec::new();
        for i in 0..ring_size {
            if i == 4 {
                ring.push(public);
                commitments.push(salvium_crypto::pedersen::commit(amount, &mask));
            } else {
                let s = salvium_crypto::hash_to_scalar(&[seed, 3, i as u8]).to_bytes();
                ring.push(salvium_crypto::scalar_mult_base(&s));
                commitments.push(salvium_crypto::pedersen::commit(5, &s));
            }
        }
        PreparedInput {
            secret_key: x.to_bytes(),
            secret_key_y: Some(y.to_bytes()),
            public_key: public,
            amount,
            mask,
            asset_type: "SAL1".into(),
            ring,
            ring_commitments: commitments,
            ring_indices: (0..ring_size as u64).collect(),
            real_index: 4,
        }
    }

    fn wallet(seed: u8) -> WalletKeys {
        WalletKeys::from_seed(&[seed; 32], Network::Testnet)
    }

    fn carrot_addr(keys: &WalletKeys) -> Address {
        keys.carrot_address()
    }

    #[test]
    fn recipient_scanner_finds_built_transfer() {
        let sender = wallet(0xA0);
        let recipient = wallet(0xB0);

        let unsigned = TransactionBuilder::new()
            .add_input(twin_input(100_000_000, 1))
            .add_destination(carrot_addr(&recipient), 12_345_678)
            .change_address(carrot_addr(&sender))
            .fee(40_000)
            .build()
            .unwrap();
        let tx = sign_transaction(unsigned).unwrap();

        let ctx = ScanContext::new(&recipient, 0, 0).unwrap();
        let found = scan_transaction(&ctx, &tx, [0x11; 32], 1000);
        assert_eq!(found.len(), 1);
        let enote = &found[0];
        assert_eq!(enote.amount, 12_345_678);
        assert_eq!(enote.era, AddressEra::Carrot);
        assert_eq!(enote.block_height, 1000);
        assert!(enote.key_image.is_some());
        assert_eq!(enote.subaddress, (0, 0));
    }

    #[test]
    fn subaddress_payment_is_attributed() {
        let sender = wallet(0xA1);
        let recipient = wallet(0xB1);
        let sub = recipient.subaddress(AddressEra::Carrot, 1, 2).unwrap();

        let unsigned = TransactionBuilder::new()
            .add_input(twin_input(100_000_000, 2))
            .add_destination(sub, 777_777)
            .change_address(carrot_addr(&sender))
            .fee(40_000)
            .build()
            .unwrap();
        let tx = sign_transaction(unsigned).unwrap();

        let ctx = ScanContext::new(&recipient, 2, 4).unwrap();
        let found = scan_transaction(&ctx, &tx, [0x12; 32], 1001);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subaddress, (1, 2));
        assert_eq!(found[0].amount, 777_777);
    }

    #[test]
    fn view_only_wallet_scans_without_key_images() {
        let sender = wallet(0xA2);
        let recipient = wallet(0xB2);
        let view_only = WalletKeys::view_only(
            recipient.cn.view_secret,
            recipient.cn.spend_pubkey,
            &recipient.carrot.view_balance_secret,
            &recipient.carrot.account_spend_pubkey,
            Network::Testnet,
        )
        .unwrap();

        let unsigned = TransactionBuilder::new()
            .add_input(twin_input(100_000_000, 3))
            .add_destination(carrot_addr(&recipient), 555)
            .change_address(carrot_addr(&sender))
            .fee(40_000)
            .build()
            .unwrap();
        let tx = sign_transaction(unsigned).unwrap();

        let ctx = ScanContext::new(&view_only, 0, 0).unwrap();
        let found = scan_transaction(&ctx, &tx, [0x13; 32], 7);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, 555);
        assert!(found[0].key_image.is_none());

        // The full wallet computes the key image for the same enote.
        let full_ctx = ScanContext::new(&recipient, 0, 0).unwrap();
        let full_found = scan_transaction(&full_ctx, &tx, [0x13; 32], 7);
        assert!(full_found[0].key_image.is_some());
    }

    #[test]
    fn foreign_transaction_yields_nothing() {
        let sender = wallet(0xA3);
        let recipient = wallet(0xB3);
        let stranger = wallet(0xC3);

        let unsigned = TransactionBuilder::new()
            .add_input(twin_input(100_000_000, 4))
            .add_destination(carrot_addr(&recipient), 1)
            .change_address(carrot_addr(&sender))
            .fee(40_000)
            .build()
            .unwrap();
        let tx = sign_transaction(unsigned).unwrap();

        let ctx = ScanContext::new(&stranger, 1, 1).unwrap();
        assert!(scan_transaction(&ctx, &tx, [0x14; 32], 8).is_empty());
    }
}
