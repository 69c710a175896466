//! Wallet key sets.
//!
//! A 32-byte seed derives both hierarchies: the legacy CryptoNote pair
//! (spend = reduce(seed), view = reduce(keccak(spend))) and the CARROT tree
//! (seed as master secret). View-only wallets drop the spend-side secrets
//! but keep everything scanning needs.

use salvium_crypto::carrot_keys::CarrotKeys;
use salvium_crypto::subaddress::{
    carrot_subaddress_spend_pubkey, carrot_subaddress_table, carrot_subaddress_view_pubkey,
    cn_subaddress_spend_pubkey, cn_subaddress_table, cn_subaddress_view_pubkey, SubaddressTable,
};
use salvium_crypto::{keccak256, sc_reduce32, scalar_mult_base};
use salvium_types::{Address, AddressEra, AddressKind, Network};

use crate::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    /// Scans and spends.
    Full,
    /// Scans only.
    ViewOnly,
}

/// Legacy CryptoNote key pair.
#[derive(Clone)]
pub struct CnKeys {
    pub spend_secret: Option<[u8; 32]>,
    pub spend_pubkey: [u8; 32],
    pub view_secret: [u8; 32],
    pub view_pubkey: [u8; 32],
}

pub struct WalletKeys {
    pub wallet_type: WalletType,
    pub network: Network,
    pub cn: CnKeys,
    pub carrot: CarrotKeys,
}

impl WalletKeys {
    /// Full wallet from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32], network: Network) -> Self {
        let spend_secret = sc_reduce32(seed);
        let spend_pubkey = scalar_mult_base(&spend_secret);
        let view_secret = sc_reduce32(&keccak256(&spend_secret));
        let view_pubkey = scalar_mult_base(&view_secret);

        Self {
            wallet_type: WalletType::Full,
            network,
            cn: CnKeys {
                spend_secret: Some(spend_secret),
                spend_pubkey,
                view_secret,
                view_pubkey,
            },
            carrot: CarrotKeys::from_master(seed),
        }
    }

    /// View-only wallet from the legacy view secret plus the CARROT
    /// view-balance secret and account spend pubkeys.
    pub fn view_only(
        cn_view_secret: [u8; 32],
        cn_spend_pubkey: [u8; 32],
        view_balance_secret: &[u8; 32],
        account_spend_pubkey: &[u8; 32],
        network: Network,
    ) -> Result<Self, WalletError> {
        Ok(Self {
            wallet_type: WalletType::ViewOnly,
            network,
            cn: CnKeys {
                spend_secret: None,
                spend_pubkey: cn_spend_pubkey,
                view_pubkey: scalar_mult_base(&cn_view_secret),
                view_secret: cn_view_secret,
            },
            carrot: CarrotKeys::view_only(view_balance_secret, account_spend_pubkey)?,
        })
    }

    pub fn random_seed() -> [u8; 32] {
        use rand::RngCore;
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        seed
    }

    pub fn can_spend(&self) -> bool {
        self.wallet_type == WalletType::Full
    }

    /// Primary legacy address.
    pub fn cn_address(&self) -> Address {
        Address::standard(
            self.network,
            AddressEra::Legacy,
            self.cn.spend_pubkey,
            self.cn.view_pubkey,
        )
    }

    /// Primary CARROT address (account spend + account view pubkeys).
    pub fn carrot_address(&self) -> Address {
        Address::standard(
            self.network,
            AddressEra::Carrot,
            self.carrot.account_spend_pubkey,
            self.carrot.account_view_pubkey,
        )
    }

    /// Derived address at (major, minor); (0, 0) is the primary address.
    pub fn subaddress(
        &self,
        era: AddressEra,
        major: u32,
        minor: u32,
    ) -> Result<Address, WalletError> {
        if major == 0 && minor == 0 {
            return Ok(match era {
                AddressEra::Legacy => self.cn_address(),
                AddressEra::Carrot => self.carrot_address(),
            });
        }
        let (spend, view) = match era {
            AddressEra::Legacy => {
                let spend = cn_subaddress_spend_pubkey(
                    &self.cn.spend_pubkey,
                    &self.cn.view_secret,
                    major,
                    minor,
                )?;
                let view = cn_subaddress_view_pubkey(&spend, &self.cn.view_secret)?;
                (spend, view)
            }
            AddressEra::Carrot => {
                let spend = carrot_subaddress_spend_pubkey(
                    &self.carrot.account_spend_pubkey,
                    &self.carrot.generate_address_secret,
                    major,
                    minor,
                )?;
                let view =
                    carrot_subaddress_view_pubkey(&spend, &self.carrot.view_incoming_key)?;
                (spend, view)
            }
        };
        Ok(Address {
            network: self.network,
            era,
            kind: AddressKind::Subaddress,
            spend_pubkey: spend,
            view_pubkey: view,
            payment_id: None,
        })
    }

    /// Lookup tables for the scanners, majors/minors inclusive.
    pub fn subaddress_tables(
        &self,
        major_count: u32,
        minor_count: u32,
    ) -> Result<(SubaddressTable, SubaddressTable), WalletError> {
        let cn = cn_subaddress_table(
            &self.cn.spend_pubkey,
            &self.cn.view_secret,
            major_count,
            minor_count,
        )?;
        let carrot = carrot_subaddress_table(
            &self.carrot.account_spend_pubkey,
            &self.carrot.generate_address_secret,
            major_count,
            minor_count,
        )?;
        Ok((cn, carrot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_derivation() {
        let a = WalletKeys::from_seed(&[42; 32], Network::Mainnet);
        let b = WalletKeys::from_seed(&[42; 32], Network::Mainnet);
        assert_eq!(a.cn.spend_pubkey, b.cn.spend_pubkey);
        assert_eq!(a.carrot.account_spend_pubkey, b.carrot.account_spend_pubkey);
    }

    #[test]
    fn cn_and_carrot_hierarchies_differ() {
        let keys = WalletKeys::from_seed(&[7; 32], Network::Mainnet);
        assert_ne!(keys.cn.spend_pubkey, keys.carrot.account_spend_pubkey);
    }

    #[test]
    fn addresses_have_expected_prefixes() {
        let keys = WalletKeys::from_seed(&[9; 32], Network::Mainnet);
        assert!(keys.cn_address().encode().starts_with("SaLv"));
        assert!(keys.carrot_address().encode().starts_with("SC1"));
    }

    #[test]
    fn view_only_scans_like_full() {
        let full = WalletKeys::from_seed(&[11; 32], Network::Testnet);
        let view = WalletKeys::view_only(
            full.cn.view_secret,
            full.cn.spend_pubkey,
            &full.carrot.view_balance_secret,
            &full.carrot.account_spend_pubkey,
            Network::Testnet,
        )
        .unwrap();
        assert!(!view.can_spend());
        assert_eq!(view.carrot.view_incoming_key, full.carrot.view_incoming_key);
        assert_eq!(view.carrot.account_view_pubkey, full.carrot.account_view_pubkey);
        assert_eq!(view.cn_address(), full.cn_address());
    }

    #[test]
    fn subaddresses_are_found_in_tables() {
        let keys = WalletKeys::from_seed(&[13; 32], Network::Testnet);
        let (cn_table, carrot_table) = keys.subaddress_tables(2, 4).unwrap();

        let cn_sub = keys.subaddress(AddressEra::Legacy, 1, 3).unwrap();
        assert_eq!(cn_table.get(&cn_sub.spend_pubkey), Some(&(1, 3)));

        let carrot_sub = keys.subaddress(AddressEra::Carrot, 2, 2).unwrap();
        assert_eq!(carrot_table.get(&carrot_sub.spend_pubkey), Some(&(2, 2)));
    }

    #[test]
    fn origin_subaddress_is_primary() {
        let keys = WalletKeys::from_seed(&[15; 32], Network::Mainnet);
        assert_eq!(
            keys.subaddress(AddressEra::Carrot, 0, 0).unwrap(),
            keys.carrot_address()
        );
    }
}
