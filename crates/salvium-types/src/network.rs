//! Network selection and the fixed per-network parameters.
//!
//! Reference: salvium/src/cryptonote_config.h. Prefix values are consensus
//! constants; the human-readable text is what the first characters of an
//! encoded address look like.

use serde::{Deserialize, Serialize};

/// Which chain the wallet talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Stagenet,
}

/// Output address era: legacy CryptoNote construction or CARROT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressEra {
    /// Legacy CryptoNote (SaLv... prefixes, 1-byte view tags).
    Legacy,
    /// CARROT two-generator construction (SC1... prefixes, 3-byte view tags).
    Carrot,
}

/// Address kind within an era.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Standard,
    Integrated,
    Subaddress,
}

/// One row of the address prefix table.
#[derive(Debug, Clone, Copy)]
pub struct AddressPrefix {
    pub tag: u64,
    pub text: &'static str,
    pub network: Network,
    pub era: AddressEra,
    pub kind: AddressKind,
}

/// The full prefix table: 3 networks x 2 eras x 3 kinds.
pub static ADDRESS_PREFIXES: [AddressPrefix; 18] = [
    AddressPrefix { tag: 0x3ef318,    text: "SaLv",   network: Network::Mainnet,  era: AddressEra::Legacy, kind: AddressKind::Standard },
    AddressPrefix { tag: 0x55ef318,   text: "SaLvi",  network: Network::Mainnet,  era: AddressEra::Legacy, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0xf5ef318,   text: "SaLvs",  network: Network::Mainnet,  era: AddressEra::Legacy, kind: AddressKind::Subaddress },
    AddressPrefix { tag: 0x180c96,    text: "SC1",    network: Network::Mainnet,  era: AddressEra::Carrot, kind: AddressKind::Standard },
    AddressPrefix { tag: 0x2ccc96,    text: "SC1i",   network: Network::Mainnet,  era: AddressEra::Carrot, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0x314c96,    text: "SC1s",   network: Network::Mainnet,  era: AddressEra::Carrot, kind: AddressKind::Subaddress },
    AddressPrefix { tag: 0x15beb318,  text: "SaLvT",  network: Network::Testnet,  era: AddressEra::Legacy, kind: AddressKind::Standard },
    AddressPrefix { tag: 0xd055eb318, text: "SaLvTi", network: Network::Testnet,  era: AddressEra::Legacy, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0xa59eb318,  text: "SaLvTs", network: Network::Testnet,  era: AddressEra::Legacy, kind: AddressKind::Subaddress },
    AddressPrefix { tag: 0x254c96,    text: "SC1T",   network: Network::Testnet,  era: AddressEra::Carrot, kind: AddressKind::Standard },
    AddressPrefix { tag: 0x1ac50c96,  text: "SC1Ti",  network: Network::Testnet,  era: AddressEra::Carrot, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0x3c54c96,   text: "SC1Ts",  network: Network::Testnet,  era: AddressEra::Carrot, kind: AddressKind::Subaddress },
    AddressPrefix { tag: 0x149eb318,  text: "SaLvS",  network: Network::Stagenet, era: AddressEra::Legacy, kind: AddressKind::Standard },
    AddressPrefix { tag: 0xf343eb318, text: "SaLvSi", network: Network::Stagenet, era: AddressEra::Legacy, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0x2d47eb318, text: "SaLvSs", network: Network::Stagenet, era: AddressEra::Legacy, kind: AddressKind::Subaddress },
    AddressPrefix { tag: 0x24cc96,    text: "SC1S",   network: Network::Stagenet, era: AddressEra::Carrot, kind: AddressKind::Standard },
    AddressPrefix { tag: 0x1a848c96,  text: "SC1Si",  network: Network::Stagenet, era: AddressEra::Carrot, kind: AddressKind::Integrated },
    AddressPrefix { tag: 0x384cc96,   text: "SC1Ss",  network: Network::Stagenet, era: AddressEra::Carrot, kind: AddressKind::Subaddress },
];

/// Look up a prefix row by its varint tag.
pub fn prefix_by_tag(tag: u64) -> Option<&'static AddressPrefix> {
    ADDRESS_PREFIXES.iter().find(|p| p.tag == tag)
}

/// Look up the varint tag for a (network, era, kind) triple.
pub fn prefix_tag(network: Network, era: AddressEra, kind: AddressKind) -> u64 {
    ADDRESS_PREFIXES
        .iter()
        .find(|p| p.network == network && p.era == era && p.kind == kind)
        .map(|p| p.tag)
        .expect("prefix table covers every combination")
}

/// Per-network parameters that are not address prefixes.
#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    pub network: Network,
    /// Blocks before a normal output unlocks.
    pub spendable_age: u64,
    /// Blocks before a coinbase output unlocks.
    pub coinbase_unlock: u64,
    /// Lock period enforced on STAKE transactions.
    pub stake_lock_period: u64,
    /// Ring size before the view-tag hard fork.
    pub legacy_ring_size: usize,
    /// Ring size from the view-tag hard fork onward.
    pub ring_size: usize,
    /// Height at which CARROT outputs activate.
    pub carrot_fork_height: u64,
}

pub static MAINNET: NetworkParams = NetworkParams {
    network: Network::Mainnet,
    spendable_age: 10,
    coinbase_unlock: 60,
    stake_lock_period: 21_600,
    legacy_ring_size: 11,
    ring_size: 16,
    carrot_fork_height: 334_750,
};

pub static TESTNET: NetworkParams = NetworkParams {
    network: Network::Testnet,
    spendable_age: 10,
    coinbase_unlock: 60,
    stake_lock_period: 20,
    legacy_ring_size: 11,
    ring_size: 16,
    carrot_fork_height: 1_100,
};

pub static STAGENET: NetworkParams = NetworkParams {
    network: Network::Stagenet,
    spendable_age: 10,
    coinbase_unlock: 60,
    stake_lock_period: 20,
    legacy_ring_size: 11,
    ring_size: 16,
    carrot_fork_height: 1_100,
};

impl Network {
    pub fn params(&self) -> &'static NetworkParams {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
            Network::Stagenet => &STAGENET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_lookup_by_tag() {
        let p = prefix_by_tag(0x3ef318).unwrap();
        assert_eq!(p.network, Network::Mainnet);
        assert_eq!(p.era, AddressEra::Legacy);
        assert_eq!(p.kind, AddressKind::Standard);
        assert_eq!(p.text, "SaLv");
    }

    #[test]
    fn prefix_table_is_injective() {
        for (i, a) in ADDRESS_PREFIXES.iter().enumerate() {
            for b in &ADDRESS_PREFIXES[i + 1..] {
                assert_ne!(a.tag, b.tag);
            }
        }
    }

    #[test]
    fn every_combination_has_a_tag() {
        for network in [Network::Mainnet, Network::Testnet, Network::Stagenet] {
            for era in [AddressEra::Legacy, AddressEra::Carrot] {
                for kind in [AddressKind::Standard, AddressKind::Integrated, AddressKind::Subaddress] {
                    assert_eq!(prefix_by_tag(prefix_tag(network, era, kind)).unwrap().network, network);
                }
            }
        }
    }

    #[test]
    fn mainnet_lock_periods() {
        let p = Network::Mainnet.params();
        assert_eq!(p.spendable_age, 10);
        assert_eq!(p.coinbase_unlock, 60);
        assert_eq!(p.stake_lock_period, 21_600);
        assert_eq!(p.ring_size, 16);
    }
}
