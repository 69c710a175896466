//! Transaction builder.
//!
//! Assembles prepared inputs, destinations, and ring data into an unsigned
//! transaction: outputs (CARROT or legacy depending on the RCT type), the
//! canonically sorted prefix, and all the per-output secrets the signer
//! needs. A change output is always produced, even for zero change, so every
//! transaction has a uniform output count.

use salvium_types::{Address, AddressEra, AddressKind};

use crate::extra;
use crate::fee::{self, FeePriority};
use crate::types::*;
use crate::TxError;
use salvium_crypto::carrot_enote::{
    build_enote, enote_type, input_context_rct, CarrotDestination, CarrotEnoteParams,
};
use salvium_crypto::{cn, generate_key_image, pedersen, x25519};

/// A recipient and amount.
#[derive(Clone)]
pub struct Destination {
    pub address: Address,
    pub amount: u64,
}

/// A spendable enote with everything needed to ring-sign it.
#[derive(Clone)]
pub struct PreparedInput {
    /// One-time secret (the G component).
    pub secret_key: [u8; 32],
    /// T component, required for TCLSAG (CARROT enotes).
    pub secret_key_y: Option<[u8; 32]>,
    /// The one-time output key being spent.
    pub public_key: [u8; 32],
    pub amount: u64,
    /// Commitment blinding factor of the spent enote.
    pub mask: [u8; 32],
    pub asset_type: String,
    /// Ring member one-time keys, ascending global-index order.
    pub ring: Vec<[u8; 32]>,
    /// Ring member commitments, same order.
    pub ring_commitments: Vec<[u8; 32]>,
    /// Absolute global indices, ascending.
    pub ring_indices: Vec<u64>,
    /// Where the real output sits inside the ring.
    pub real_index: usize,
}

/// The builder output, ready for [`crate::sign::sign_transaction`].
pub struct UnsignedTransaction {
    pub prefix: TxPrefix,
    pub output_amounts: Vec<u64>,
    pub output_masks: Vec<[u8; 32]>,
    pub output_commitments: Vec<[u8; 32]>,
    pub encrypted_amounts: Vec<[u8; 8]>,
    /// Inputs in final (key-image-descending) order, key images attached.
    pub inputs: Vec<(PreparedInput, [u8; 32])>,
    pub rct_type: u8,
    pub fee: u64,
}

pub struct TransactionBuilder {
    inputs: Vec<PreparedInput>,
    destinations: Vec<Destination>,
    change_address: Option<Address>,
    tx_type: u8,
    rct_type: u8,
    ring_size: usize,
    fee: Option<u64>,
    priority: FeePriority,
    unlock_time: u64,
    source_asset_type: String,
    destination_asset_type: String,
    amount_burnt: u64,
    amount_slippage_limit: u64,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            destinations: Vec::new(),
            change_address: None,
            tx_type: tx_type::TRANSFER,
            rct_type: rct_type::SALVIUM_ONE,
            ring_size: fee::DEFAULT_RING_SIZE,
            fee: None,
            priority: FeePriority::Default,
            unlock_time: 0,
            source_asset_type: "SAL1".into(),
            destination_asset_type: "SAL1".into(),
            amount_burnt: 0,
            amount_slippage_limit: 0,
        }
    }

    pub fn add_input(mut self, input: PreparedInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_destination(mut self, address: Address, amount: u64) -> Self {
        self.destinations.push(Destination { address, amount });
        self
    }

    pub fn change_address(mut self, address: Address) -> Self {
        self.change_address = Some(address);
        self
    }

    pub fn tx_type(mut self, tx_type: u8) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn rct_type(mut self, rct_type: u8) -> Self {
        self.rct_type = rct_type;
        self
    }

    /// Consensus ring size. Inputs whose rings are smaller fail the build
    /// with [`TxError::RingTooSmall`] — the builder never shrinks a ring.
    pub fn ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn priority(mut self, priority: FeePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn unlock_time(mut self, unlock_time: u64) -> Self {
        self.unlock_time = unlock_time;
        self
    }

    pub fn asset_types(mut self, source: &str, destination: &str) -> Self {
        self.source_asset_type = source.into();
        self.destination_asset_type = destination.into();
        self
    }

    pub fn amount_burnt(mut self, amount: u64) -> Self {
        self.amount_burnt = amount;
        self
    }

    pub fn slippage_limit(mut self, limit: u64) -> Self {
        self.amount_slippage_limit = limit;
        self
    }

    pub fn build(self) -> Result<UnsignedTransaction, TxError> {
        if self.destinations.is_empty() && self.amount_burnt == 0 {
            return Err(TxError::NoDestinations);
        }
        if self.inputs.is_empty() {
            return Err(TxError::NoInputs);
        }

        let carrot_era = self.rct_type == rct_type::SALVIUM_ONE;
        let expected_era = if carrot_era { AddressEra::Carrot } else { AddressEra::Legacy };
        let change = self.change_address.clone().ok_or(TxError::MissingChangeAddress)?;
        for dest in &self.destinations {
            if dest.address.era != expected_era {
                return Err(TxError::EraMismatch);
            }
        }
        if change.era != expected_era {
            return Err(TxError::EraMismatch);
        }

        // Ring shape checks before anything expensive.
        for (i, input) in self.inputs.iter().enumerate() {
            if input.ring.len() < self.ring_size {
                return Err(TxError::RingTooSmall {
                    requested: self.ring_size,
                    available: input.ring.len(),
                });
            }
            if input.ring.len() != input.ring_commitments.len()
                || input.ring.len() != input.ring_indices.len()
            {
                return Err(TxError::RingTooSmall {
                    requested: input.ring.len(),
                    available: input.ring_commitments.len().min(input.ring_indices.len()),
                });
            }
            if input.real_index >= input.ring.len() {
                return Err(TxError::BadRealIndex {
                    index: i,
                    real: input.real_index,
                    len: input.ring.len(),
                });
            }
        }

        // Funds check against the (possibly estimated) fee.
        let total_in: u64 = self.inputs.iter().map(|i| i.amount).sum();
        let total_out: u64 = self.destinations.iter().map(|d| d.amount).sum();
        let num_outputs = self.destinations.len() + 1; // + change
        let out_tag = if carrot_era { output_tag::CARROT_V1 } else { output_tag::TAGGED_KEY };
        let fee = self.fee.unwrap_or_else(|| {
            fee::estimate_fee(
                self.inputs.len(),
                num_outputs,
                self.ring_size,
                carrot_era,
                out_tag,
                self.priority,
            )
        });

        let need = total_out
            .checked_add(fee)
            .and_then(|n| n.checked_add(self.amount_burnt))
            .ok_or(TxError::InsufficientFunds { need: u64::MAX, have: total_in })?;
        if total_in < need {
            return Err(TxError::InsufficientFunds { need, have: total_in });
        }
        let change_amount = total_in - need;

        // Key images first: the sorted first image feeds the CARROT input
        // context, so ordering must be fixed before outputs are derived.
        let mut inputs: Vec<(PreparedInput, [u8; 32])> = self
            .inputs
            .into_iter()
            .map(|input| {
                let image = generate_key_image(&input.public_key, &input.secret_key);
                (input, image)
            })
            .collect();
        inputs.sort_by(|a, b| b.1.cmp(&a.1));

        for window in 0..inputs.len() {
            for other in window + 1..inputs.len() {
                if inputs[window].1 == inputs[other].1 {
                    return Err(TxError::DuplicateKeyImage);
                }
            }
        }

        let input_context = input_context_rct(&inputs[0].1);

        // Outputs: destinations first, change last; sorted below.
        struct BuiltOutput {
            output: TxOutput,
            amount: u64,
            mask: [u8; 32],
            commitment: [u8; 32],
            encrypted_amount: [u8; 8],
            ephemeral_pubkey: [u8; 32],
            is_change: bool,
        }

        let mut built: Vec<BuiltOutput> = Vec::with_capacity(num_outputs);
        let mut encrypted_payment_id = None;

        if carrot_era {
            let mut plan: Vec<(&Address, u64, u8)> = self
                .destinations
                .iter()
                .map(|d| (&d.address, d.amount, enote_type::PAYMENT))
                .collect();
            plan.push((&change, change_amount, enote_type::CHANGE));

            for (address, amount, etype) in plan {
                let carrot_dest = CarrotDestination {
                    spend_pubkey: address.spend_pubkey,
                    view_pubkey: address.view_pubkey,
                    is_subaddress: address.kind == AddressKind::Subaddress,
                };
                let payment_id = address.payment_id.unwrap_or([0; 8]);
                let params = CarrotEnoteParams {
                    destination: &carrot_dest,
                    amount,
                    enote_type: etype,
                    payment_id,
                    input_context: &input_context,
                };
                let (enote, _d_e) = build_enote(&params)?;

                if address.payment_id.is_some() && encrypted_payment_id.is_none() {
                    encrypted_payment_id = Some(enote.encrypted_payment_id);
                }

                let asset_type = if etype == enote_type::CHANGE {
                    self.source_asset_type.clone()
                } else {
                    self.destination_asset_type.clone()
                };
                built.push(BuiltOutput {
                    output: TxOutput::CarrotV1 {
                        amount: 0,
                        key: enote.onetime_address,
                        asset_type,
                        view_tag: enote.view_tag,
                        encrypted_janus_anchor: enote.encrypted_anchor,
                    },
                    amount,
                    mask: enote.commitment_mask,
                    commitment: enote.amount_commitment,
                    encrypted_amount: enote.encrypted_amount,
                    ephemeral_pubkey: enote.ephemeral_pubkey,
                    is_change: etype == enote_type::CHANGE,
                });
            }
        } else {
            // Legacy stealth outputs under one shared tx secret r.
            let r = salvium_crypto::sc_reduce64(&random_wide());
            let r_pub = salvium_crypto::scalar_mult_base(&r);

            let mut plan: Vec<(&Address, u64, bool)> = self
                .destinations
                .iter()
                .map(|d| (&d.address, d.amount, false))
                .collect();
            plan.push((&change, change_amount, true));

            for (index, (address, amount, is_change)) in plan.into_iter().enumerate() {
                let derivation = cn::generate_key_derivation(&address.view_pubkey, &r)?;
                let ko = cn::derive_public_key(&derivation, index as u32, &address.spend_pubkey)?;
                let shared = cn::derivation_to_scalar(&derivation, index as u32).to_bytes();
                let view_tag = cn::derive_view_tag(&derivation, index as u32);
                let encrypted_amount = cn::ecdh_encode_amount(amount, &shared);
                let mask = pedersen::gen_commitment_mask(&shared);
                let commitment = pedersen::commit(amount, &mask);

                let asset_type = if is_change {
                    self.source_asset_type.clone()
                } else {
                    self.destination_asset_type.clone()
                };
                built.push(BuiltOutput {
                    output: TxOutput::TaggedKey {
                        amount: 0,
                        key: ko,
                        asset_type,
                        unlock_time: 0,
                        view_tag,
                    },
                    amount,
                    mask,
                    commitment,
                    encrypted_amount,
                    ephemeral_pubkey: r_pub,
                    is_change,
                });
            }
        }

        // Canonical output order: lexicographic on the one-time key, so the
        // change position leaks nothing.
        built.sort_by(|a, b| a.output.key().cmp(b.output.key()));

        let ephemeral_pubkeys: Vec<[u8; 32]> =
            built.iter().map(|b| b.ephemeral_pubkey).collect();
        let extra = extra::build_extra(&ephemeral_pubkeys, encrypted_payment_id);

        // Inputs to wire form: relative offsets.
        let tx_inputs: Vec<TxInput> = inputs
            .iter()
            .map(|(input, image)| TxInput::Key {
                amount: 0,
                asset_type: input.asset_type.clone(),
                key_offsets: absolute_to_relative(&input.ring_indices),
                key_image: *image,
            })
            .collect();

        let version = if carrot_era { 4 } else { 2 };

        // Trailer fields per (version, tx_type).
        let mut return_address = None;
        let mut return_pubkey = None;
        let mut return_address_list = None;
        let mut return_address_change_mask = None;
        let mut protocol_tx_data = None;

        if self.tx_type != tx_type::UNSET
            && self.tx_type != tx_type::PROTOCOL
            && self.tx_type != tx_type::MINER
        {
            if self.tx_type == tx_type::TRANSFER && version >= 3 {
                return_address_list =
                    Some(built.iter().map(|_| change.spend_pubkey).collect::<Vec<_>>());
                return_address_change_mask =
                    Some(built.iter().map(|b| b.is_change as u8).collect::<Vec<_>>());
            } else if self.tx_type == tx_type::STAKE && version >= 4 {
                protocol_tx_data = Some(build_stake_return(&change, &input_context)?);
            } else {
                return_address = Some(change.spend_pubkey);
                return_pubkey = Some(ephemeral_pubkeys[0]);
            }
        }

        let prefix = TxPrefix {
            version,
            unlock_time: self.unlock_time,
            inputs: tx_inputs,
            outputs: built.iter().map(|b| b.output.clone()).collect(),
            extra,
            tx_type: self.tx_type,
            amount_burnt: self.amount_burnt,
            return_address,
            return_pubkey,
            return_address_list,
            return_address_change_mask,
            protocol_tx_data,
            source_asset_type: self.source_asset_type,
            destination_asset_type: self.destination_asset_type,
            amount_slippage_limit: self.amount_slippage_limit,
        };

        Ok(UnsignedTransaction {
            prefix,
            output_amounts: built.iter().map(|b| b.amount).collect(),
            output_masks: built.iter().map(|b| b.mask).collect(),
            output_commitments: built.iter().map(|b| b.commitment).collect(),
            encrypted_amounts: built.iter().map(|b| b.encrypted_amount).collect(),
            inputs,
            rct_type: self.rct_type,
            fee,
        })
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// CARROT return enote for a v4 STAKE: a zero-amount change-typed enote
/// back to the staker.
fn build_stake_return(
    change: &Address,
    input_context: &[u8; 33],
) -> Result<ProtocolTxData, TxError> {
    let dest = CarrotDestination {
        spend_pubkey: change.spend_pubkey,
        view_pubkey: change.view_pubkey,
        is_subaddress: change.kind == AddressKind::Subaddress,
    };
    let params = CarrotEnoteParams {
        destination: &dest,
        amount: 0,
        enote_type: enote_type::CHANGE,
        payment_id: [0; 8],
        input_context,
    };
    let (enote, d_e) = build_enote(&params)?;
    Ok(ProtocolTxData {
        version: 1,
        return_address: enote.onetime_address,
        return_pubkey: x25519::scalar_mult_base(&d_e),
        return_view_tag: enote.view_tag,
        return_anchor_enc: enote.encrypted_anchor,
    })
}

/// `[10, 50, 80] -> [10, 40, 30]`.
fn absolute_to_relative(indices: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(indices.len());
    let mut prev = 0;
    for (i, &index) in indices.iter().enumerate() {
        out.push(if i == 0 { index } else { index - prev });
        prev = index;
    }
    out
}

/// Inverse prefix sum, used when resolving parsed inputs.
pub fn relative_to_absolute(offsets: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(offsets.len());
    let mut sum = 0u64;
    for &offset in offsets {
        sum += offset;
        out.push(sum);
    }
    out
}

fn random_wide() -> [u8; 64] {
    use rand::RngCore;
    let mut buf = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvium_types::Network;

    fn carrot_address(seed: u8) -> Address {
        let keys = salvium_crypto::carrot_keys::CarrotKeys::from_master(&[seed; 32]);
        Address::standard(
            Network::Testnet,
            AddressEra::Carrot,
            keys.account_spend_pubkey,
            keys.account_view_pubkey,
        )
    }

    fn prepared_input(amount: u64, seed: u8, ring_size: usize) -> PreparedInput {
        let secret = salvium_crypto::hash_to_scalar(&[seed]).to_bytes();
        let public = salvium_crypto::scalar_mult_base(&secret);
        let mask = salvium_crypto::hash_to_scalar(&[seed, 1]).to_bytes();
        let mut ring = Vec::with_capacity(ring_size);
        let mut commitments = Vec::with_capacity(ring_size);
        for i in 0..ring_size {
            if i == 3 {
                ring.push(public);
                commitments.push(pedersen::commit(amount, &mask));
            } else {
                let s = salvium_crypto::hash_to_scalar(&[seed, 2, i as u8]).to_bytes();
                ring.push(salvium_crypto::scalar_mult_base(&s));
                commitments.push(pedersen::commit(1, &s));
            }
        }
        PreparedInput {
            secret_key: secret,
            secret_key_y: Some(salvium_crypto::hash_to_scalar(&[seed, 3]).to_bytes()),
            public_key: public,
            amount,
            mask,
            asset_type: "SAL1".into(),
            ring,
            ring_commitments: commitments,
            ring_indices: (0..ring_size as u64).map(|i| i * 7 + 10).collect(),
            real_index: 3,
        }
    }

    #[test]
    fn offsets_roundtrip() {
        let abs = vec![10, 50, 80, 100];
        let rel = absolute_to_relative(&abs);
        assert_eq!(rel, vec![10, 40, 30, 20]);
        assert_eq!(relative_to_absolute(&rel), abs);
    }

    #[test]
    fn missing_inputs_rejected() {
        let result = TransactionBuilder::new()
            .add_destination(carrot_address(1), 100)
            .change_address(carrot_address(2))
            .build();
        assert!(matches!(result, Err(TxError::NoInputs)));
    }

    #[test]
    fn missing_destinations_rejected() {
        let result = TransactionBuilder::new()
            .add_input(prepared_input(1_000_000, 1, 16))
            .change_address(carrot_address(2))
            .build();
        assert!(matches!(result, Err(TxError::NoDestinations)));
    }

    #[test]
    fn overspend_rejected() {
        let result = TransactionBuilder::new()
            .add_input(prepared_input(1_000, 1, 16))
            .add_destination(carrot_address(1), 1_000_000_000)
            .change_address(carrot_address(2))
            .fee(10)
            .build();
        assert!(matches!(result, Err(TxError::InsufficientFunds { .. })));
    }

    #[test]
    fn small_ring_rejected() {
        let result = TransactionBuilder::new()
            .add_input(prepared_input(1_000_000_000, 1, 11))
            .add_destination(carrot_address(1), 100)
            .change_address(carrot_address(2))
            .ring_size(16)
            .fee(10)
            .build();
        assert!(matches!(
            result,
            Err(TxError::RingTooSmall { requested: 16, available: 11 })
        ));
    }

    #[test]
    fn duplicate_key_image_rejected() {
        let input = prepared_input(1_000_000_000, 1, 16);
        let result = TransactionBuilder::new()
            .add_input(input.clone())
            .add_input(input)
            .add_destination(carrot_address(1), 100)
            .change_address(carrot_address(2))
            .fee(10)
            .build();
        assert!(matches!(result, Err(TxError::DuplicateKeyImage)));
    }

    #[test]
    fn era_mismatch_rejected() {
        let legacy = Address::standard(
            Network::Testnet,
            AddressEra::Legacy,
            [1; 32],
            [2; 32],
        );
        let result = TransactionBuilder::new()
            .add_input(prepared_input(1_000_000_000, 1, 16))
            .add_destination(legacy, 100)
            .change_address(carrot_address(2))
            .fee(10)
            .build();
        assert!(matches!(result, Err(TxError::EraMismatch)));
    }

    #[test]
    fn zero_change_still_produces_change_output() {
        let input = prepared_input(1_000_000, 1, 16);
        let unsigned = TransactionBuilder::new()
            .add_input(input)
            .add_destination(carrot_address(1), 999_990)
            .change_address(carrot_address(2))
            .fee(10)
            .build()
            .unwrap();
        // 1 destination + 1 change, change amount 0.
        assert_eq!(unsigned.prefix.outputs.len(), 2);
        assert!(unsigned.output_amounts.contains(&0));
        assert_eq!(unsigned.output_amounts.iter().sum::<u64>(), 999_990);
    }

    #[test]
    fn outputs_sorted_by_onetime_key() {
        let unsigned = TransactionBuilder::new()
            .add_input(prepared_input(10_000_000, 1, 16))
            .add_destination(carrot_address(1), 1_000_000)
            .add_destination(carrot_address(3), 2_000_000)
            .add_destination(carrot_address(4), 3_000_000)
            .change_address(carrot_address(2))
            .fee(100)
            .build()
            .unwrap();
        let keys: Vec<_> = unsigned.prefix.outputs.iter().map(|o| *o.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn transfer_v4_carries_return_list_and_mask() {
        let unsigned = TransactionBuilder::new()
            .add_input(prepared_input(10_000_000, 1, 16))
            .add_destination(carrot_address(1), 1_000_000)
            .change_address(carrot_address(2))
            .fee(100)
            .build()
            .unwrap();
        assert_eq!(unsigned.prefix.version, 4);
        let list = unsigned.prefix.return_address_list.as_ref().unwrap();
        let mask = unsigned.prefix.return_address_change_mask.as_ref().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.iter().filter(|&&m| m == 1).count(), 1);
    }

    #[test]
    fn stake_v4_carries_protocol_tx_data() {
        let unsigned = TransactionBuilder::new()
            .add_input(prepared_input(10_000_000, 1, 16))
            .add_destination(carrot_address(1), 1_000_000)
            .change_address(carrot_address(2))
            .tx_type(tx_type::STAKE)
            .amount_burnt(1_000_000)
            .fee(100)
            .build()
            .unwrap();
        let ptx = unsigned.prefix.protocol_tx_data.as_ref().unwrap();
        assert_eq!(ptx.version, 1);
        assert_ne!(ptx.return_address, [0; 32]);
    }

    #[test]
    fn balance_includes_burn() {
        // in = out + fee + burnt, change picks up the remainder.
        let unsigned = TransactionBuilder::new()
            .add_input(prepared_input(10_000_000, 1, 16))
            .add_destination(carrot_address(1), 4_000_000)
            .change_address(carrot_address(2))
            .tx_type(tx_type::BURN)
            .amount_burnt(1_000_000)
            .fee(500)
            .build()
            .unwrap();
        let total_out: u64 = unsigned.output_amounts.iter().sum();
        assert_eq!(total_out + unsigned.fee + 1_000_000, 10_000_000);
    }
}
