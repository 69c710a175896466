//! The tx_extra TLV stream.
//!
//! An append-only sequence of tagged fields. Recognized tags are parsed into
//! [`ExtraField`]; anything else is preserved verbatim so re-serialization
//! round-trips foreign extras byte for byte.
//!
//! Reference: cryptonote_basic/tx_extra.h and format_utils.cpp
//! `store_carrot_ephemeral_pubkeys_to_extra` for the 0x01-vs-0x04 rule.

use crate::codec::{read_varint_at, write_varint};
use crate::TxError;

pub const TAG_PADDING: u8 = 0x00;
pub const TAG_PUBKEY: u8 = 0x01;
pub const TAG_NONCE: u8 = 0x02;
pub const TAG_MERGE_MINING: u8 = 0x03;
pub const TAG_ADDITIONAL_PUBKEYS: u8 = 0x04;
pub const TAG_MINERGATE: u8 = 0xDE;

const NONCE_PAYMENT_ID: u8 = 0x00;
const NONCE_ENCRYPTED_PAYMENT_ID: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraField {
    /// Run of 0x00 bytes (count includes the tag byte's run).
    Padding(usize),
    /// Shared transaction pubkey.
    Pubkey([u8; 32]),
    /// Unencrypted 32-byte payment id.
    PaymentId([u8; 32]),
    /// Encrypted 8-byte payment id.
    EncryptedPaymentId([u8; 8]),
    /// Free-form nonce that is not a payment id.
    Nonce(Vec<u8>),
    /// Per-output ephemeral pubkeys.
    AdditionalPubkeys(Vec<[u8; 32]>),
    MergeMining(Vec<u8>),
    /// Unknown tag preserved verbatim: (tag, body).
    Unknown(u8, Vec<u8>),
}

/// Parse the whole extra blob. Truncated recognized fields are an error;
/// unknown tags fall back to varint-length skipping and are preserved.
pub fn parse_extra(extra: &[u8]) -> Result<Vec<ExtraField>, TxError> {
    let mut fields = Vec::new();
    let mut offset = 0;

    while offset < extra.len() {
        let tag = extra[offset];
        offset += 1;
        match tag {
            TAG_PADDING => {
                let start = offset;
                while offset < extra.len() && extra[offset] == 0 {
                    offset += 1;
                }
                fields.push(ExtraField::Padding(1 + offset - start));
            }
            TAG_PUBKEY => {
                let key = read_array::<32>(extra, &mut offset)?;
                fields.push(ExtraField::Pubkey(key));
            }
            TAG_NONCE => {
                let len = *extra
                    .get(offset)
                    .ok_or(TxError::Truncated { offset, need: 1 })?
                    as usize;
                offset += 1;
                let body = read_slice(extra, &mut offset, len)?;
                fields.push(parse_nonce(body));
            }
            TAG_MERGE_MINING | TAG_MINERGATE => {
                let (len, consumed) = read_varint_at(extra, offset)?;
                offset += consumed;
                let body = read_slice(extra, &mut offset, len as usize)?;
                if tag == TAG_MERGE_MINING {
                    fields.push(ExtraField::MergeMining(body.to_vec()));
                } else {
                    fields.push(ExtraField::Unknown(tag, body.to_vec()));
                }
            }
            TAG_ADDITIONAL_PUBKEYS => {
                let (count, consumed) = read_varint_at(extra, offset)?;
                offset += consumed;
                let mut keys = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    keys.push(read_array::<32>(extra, &mut offset)?);
                }
                fields.push(ExtraField::AdditionalPubkeys(keys));
            }
            _ => {
                // Unknown tag: varint length then body, preserved as-is.
                let (len, consumed) = read_varint_at(extra, offset)?;
                offset += consumed;
                let body = read_slice(extra, &mut offset, len as usize)?;
                fields.push(ExtraField::Unknown(tag, body.to_vec()));
            }
        }
    }

    Ok(fields)
}

fn parse_nonce(nonce: &[u8]) -> ExtraField {
    match nonce.first() {
        Some(&NONCE_PAYMENT_ID) if nonce.len() == 33 => {
            let mut pid = [0u8; 32];
            pid.copy_from_slice(&nonce[1..]);
            ExtraField::PaymentId(pid)
        }
        Some(&NONCE_ENCRYPTED_PAYMENT_ID) if nonce.len() == 9 => {
            let mut pid = [0u8; 8];
            pid.copy_from_slice(&nonce[1..]);
            ExtraField::EncryptedPaymentId(pid)
        }
        _ => ExtraField::Nonce(nonce.to_vec()),
    }
}

/// Serialize fields back to a blob. `parse_extra . serialize_extra` is the
/// identity on recognized streams.
pub fn serialize_extra(fields: &[ExtraField]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        match field {
            ExtraField::Padding(len) => out.extend(std::iter::repeat(0u8).take(*len)),
            ExtraField::Pubkey(key) => {
                out.push(TAG_PUBKEY);
                out.extend_from_slice(key);
            }
            ExtraField::PaymentId(pid) => {
                out.push(TAG_NONCE);
                out.push(33);
                out.push(NONCE_PAYMENT_ID);
                out.extend_from_slice(pid);
            }
            ExtraField::EncryptedPaymentId(pid) => {
                out.push(TAG_NONCE);
                out.push(9);
                out.push(NONCE_ENCRYPTED_PAYMENT_ID);
                out.extend_from_slice(pid);
            }
            ExtraField::Nonce(body) => {
                out.push(TAG_NONCE);
                out.push(body.len() as u8);
                out.extend_from_slice(body);
            }
            ExtraField::AdditionalPubkeys(keys) => {
                out.push(TAG_ADDITIONAL_PUBKEYS);
                write_varint(&mut out, keys.len() as u64);
                for key in keys {
                    out.extend_from_slice(key);
                }
            }
            ExtraField::MergeMining(body) => {
                out.push(TAG_MERGE_MINING);
                write_varint(&mut out, body.len() as u64);
                out.extend_from_slice(body);
            }
            ExtraField::Unknown(tag, body) => {
                out.push(*tag);
                write_varint(&mut out, body.len() as u64);
                out.extend_from_slice(body);
            }
        }
    }
    out
}

/// Build the extra blob for a new transaction, choosing tag 0x01 vs 0x04:
/// a single shared ephemeral pubkey uses 0x01; distinct per-output keys go
/// into 0x04 (and 0x01 is omitted).
pub fn build_extra(
    ephemeral_pubkeys: &[[u8; 32]],
    encrypted_payment_id: Option<[u8; 8]>,
) -> Vec<u8> {
    let mut fields = Vec::new();

    let all_same = ephemeral_pubkeys.windows(2).all(|w| w[0] == w[1]);
    match ephemeral_pubkeys {
        [] => {}
        [only] => fields.push(ExtraField::Pubkey(*only)),
        keys if all_same => fields.push(ExtraField::Pubkey(keys[0])),
        keys => fields.push(ExtraField::AdditionalPubkeys(keys.to_vec())),
    }

    if let Some(pid) = encrypted_payment_id {
        fields.push(ExtraField::EncryptedPaymentId(pid));
    }

    serialize_extra(&fields)
}

/// The shared tx pubkey, if the extra carries one.
pub fn find_pubkey(fields: &[ExtraField]) -> Option<[u8; 32]> {
    fields.iter().find_map(|f| match f {
        ExtraField::Pubkey(key) => Some(*key),
        _ => None,
    })
}

/// Per-output pubkeys from tag 0x04, if present.
pub fn find_additional_pubkeys(fields: &[ExtraField]) -> Option<&[[u8; 32]]> {
    fields.iter().find_map(|f| match f {
        ExtraField::AdditionalPubkeys(keys) => Some(keys.as_slice()),
        _ => None,
    })
}

fn read_slice<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8], TxError> {
    if *offset + len > data.len() {
        return Err(TxError::Truncated { offset: *offset, need: *offset + len - data.len() });
    }
    let slice = &data[*offset..*offset + len];
    *offset += len;
    Ok(slice)
}

fn read_array<const N: usize>(data: &[u8], offset: &mut usize) -> Result<[u8; N], TxError> {
    let slice = read_slice(data, offset, N)?;
    Ok(slice.try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_roundtrip() {
        let fields = vec![ExtraField::Pubkey([0x42; 32])];
        let blob = serialize_extra(&fields);
        assert_eq!(blob.len(), 33);
        assert_eq!(parse_extra(&blob).unwrap(), fields);
    }

    #[test]
    fn encrypted_payment_id_roundtrip() {
        let fields = vec![
            ExtraField::Pubkey([0x11; 32]),
            ExtraField::EncryptedPaymentId([0xAB; 8]),
        ];
        let blob = serialize_extra(&fields);
        assert_eq!(parse_extra(&blob).unwrap(), fields);
    }

    #[test]
    fn additional_pubkeys_roundtrip() {
        let fields = vec![ExtraField::AdditionalPubkeys(vec![[0xAA; 32], [0xBB; 32]])];
        let blob = serialize_extra(&fields);
        assert_eq!(blob[0], TAG_ADDITIONAL_PUBKEYS);
        assert_eq!(blob[1], 2);
        assert_eq!(parse_extra(&blob).unwrap(), fields);
    }

    #[test]
    fn unknown_tag_preserved_verbatim() {
        let fields = vec![ExtraField::Unknown(0xAB, vec![1, 2, 3])];
        let blob = serialize_extra(&fields);
        assert_eq!(blob, vec![0xAB, 3, 1, 2, 3]);
        assert_eq!(parse_extra(&blob).unwrap(), fields);
    }

    #[test]
    fn truncated_pubkey_is_error() {
        let mut blob = vec![TAG_PUBKEY];
        blob.extend_from_slice(&[0; 16]);
        assert!(parse_extra(&blob).is_err());
    }

    #[test]
    fn build_extra_shared_vs_per_output() {
        // Identical keys collapse to tag 0x01.
        let shared = build_extra(&[[0x10; 32], [0x10; 32]], None);
        assert_eq!(shared[0], TAG_PUBKEY);
        assert_eq!(shared.len(), 33);

        // Distinct keys use tag 0x04 only.
        let separate = build_extra(&[[0x10; 32], [0x20; 32]], None);
        assert_eq!(separate[0], TAG_ADDITIONAL_PUBKEYS);
        let fields = parse_extra(&separate).unwrap();
        assert!(find_pubkey(&fields).is_none());
        assert_eq!(find_additional_pubkeys(&fields).unwrap().len(), 2);
    }

    #[test]
    fn padding_roundtrip() {
        let blob = vec![0u8; 5];
        let fields = parse_extra(&blob).unwrap();
        assert_eq!(fields, vec![ExtraField::Padding(5)]);
        assert_eq!(serialize_extra(&fields), blob);
    }
}
