//! Salvium address encoding and parsing.
//!
//! An address is `base58(varint(prefix_tag) || spend_pub(32) || view_pub(32)
//! [|| payment_id(8)] || keccak256_checksum(4))`. The prefix tag selects
//! network, era, and kind (see [`crate::network`]).

use crate::base58;
use crate::network::{prefix_by_tag, prefix_tag, AddressEra, AddressKind, Network};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KEY_SIZE: usize = 32;
pub const PAYMENT_ID_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("base58: {0}")]
    Base58(#[from] base58::Base58Error),

    #[error("unknown address prefix tag 0x{0:x}")]
    UnknownPrefix(u64),

    #[error("address body is {actual} bytes, expected {expected}")]
    BadBodyLength { expected: usize, actual: usize },

    #[error("payment id required for integrated addresses")]
    MissingPaymentId,

    #[error("payment id not allowed for {0:?} addresses")]
    UnexpectedPaymentId(AddressKind),
}

/// A decoded Salvium address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub network: Network,
    pub era: AddressEra,
    pub kind: AddressKind,
    pub spend_pubkey: [u8; KEY_SIZE],
    pub view_pubkey: [u8; KEY_SIZE],
    pub payment_id: Option<[u8; PAYMENT_ID_SIZE]>,
}

impl Address {
    /// A standard (non-integrated, non-subaddress) address.
    pub fn standard(
        network: Network,
        era: AddressEra,
        spend_pubkey: [u8; KEY_SIZE],
        view_pubkey: [u8; KEY_SIZE],
    ) -> Self {
        Self { network, era, kind: AddressKind::Standard, spend_pubkey, view_pubkey, payment_id: None }
    }

    /// A subaddress at a derived (spend, view) key pair.
    pub fn subaddress(
        network: Network,
        era: AddressEra,
        spend_pubkey: [u8; KEY_SIZE],
        view_pubkey: [u8; KEY_SIZE],
    ) -> Self {
        Self { network, era, kind: AddressKind::Subaddress, spend_pubkey, view_pubkey, payment_id: None }
    }

    /// Attach a payment id, producing the integrated form.
    pub fn with_payment_id(mut self, payment_id: [u8; PAYMENT_ID_SIZE]) -> Self {
        self.kind = AddressKind::Integrated;
        self.payment_id = Some(payment_id);
        self
    }

    /// Strip the payment id from an integrated address.
    pub fn to_standard(mut self) -> Self {
        if self.kind == AddressKind::Integrated {
            self.kind = AddressKind::Standard;
            self.payment_id = None;
        }
        self
    }

    pub fn is_carrot(&self) -> bool {
        self.era == AddressEra::Carrot
    }

    pub fn is_subaddress(&self) -> bool {
        self.kind == AddressKind::Subaddress
    }

    /// Encode to the Base58 string form.
    pub fn encode(&self) -> String {
        let tag = prefix_tag(self.network, self.era, self.kind);
        let mut body = Vec::with_capacity(KEY_SIZE * 2 + PAYMENT_ID_SIZE);
        body.extend_from_slice(&self.spend_pubkey);
        body.extend_from_slice(&self.view_pubkey);
        if let Some(pid) = &self.payment_id {
            body.extend_from_slice(pid);
        }
        base58::encode_tagged(tag, &body)
    }

    /// Parse and validate a Base58 address string.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (tag, body) = base58::decode_tagged(s.trim())?;
        let prefix = prefix_by_tag(tag).ok_or(AddressError::UnknownPrefix(tag))?;

        let expected = match prefix.kind {
            AddressKind::Integrated => KEY_SIZE * 2 + PAYMENT_ID_SIZE,
            _ => KEY_SIZE * 2,
        };
        if body.len() != expected {
            return Err(AddressError::BadBodyLength { expected, actual: body.len() });
        }

        let mut spend_pubkey = [0u8; KEY_SIZE];
        spend_pubkey.copy_from_slice(&body[..KEY_SIZE]);
        let mut view_pubkey = [0u8; KEY_SIZE];
        view_pubkey.copy_from_slice(&body[KEY_SIZE..KEY_SIZE * 2]);

        let payment_id = (prefix.kind == AddressKind::Integrated).then(|| {
            let mut pid = [0u8; PAYMENT_ID_SIZE];
            pid.copy_from_slice(&body[KEY_SIZE * 2..]);
            pid
        });

        Ok(Self {
            network: prefix.network,
            era: prefix.era,
            kind: prefix.kind,
            spend_pubkey,
            view_pubkey,
            payment_id,
        })
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_roundtrip() {
        let addr = Address::standard(Network::Mainnet, AddressEra::Legacy, [1; 32], [2; 32]);
        let encoded = addr.encode();
        assert!(encoded.starts_with("SaLv"));
        assert_eq!(Address::parse(&encoded).unwrap(), addr);
    }

    #[test]
    fn carrot_roundtrip() {
        let addr = Address::standard(Network::Testnet, AddressEra::Carrot, [3; 32], [4; 32]);
        let encoded = addr.encode();
        assert!(encoded.starts_with("SC1T"));
        let parsed = Address::parse(&encoded).unwrap();
        assert!(parsed.is_carrot());
        assert_eq!(parsed, addr);
    }

    #[test]
    fn integrated_roundtrip() {
        let addr = Address::standard(Network::Mainnet, AddressEra::Carrot, [5; 32], [6; 32])
            .with_payment_id([0xAA; 8]);
        let parsed = Address::parse(&addr.encode()).unwrap();
        assert_eq!(parsed.kind, AddressKind::Integrated);
        assert_eq!(parsed.payment_id, Some([0xAA; 8]));
        assert_eq!(parsed.to_standard().payment_id, None);
    }

    #[test]
    fn subaddress_has_own_prefix() {
        let sub = Address::subaddress(Network::Mainnet, AddressEra::Legacy, [7; 32], [8; 32]);
        assert!(sub.encode().starts_with("SaLvs"));
    }

    #[test]
    fn corrupted_address_fails() {
        let addr = Address::standard(Network::Mainnet, AddressEra::Legacy, [9; 32], [10; 32]);
        let mut s = addr.encode().into_bytes();
        s[20] = if s[20] == b'2' { b'3' } else { b'2' };
        assert!(Address::parse(std::str::from_utf8(&s).unwrap()).is_err());
    }
}
