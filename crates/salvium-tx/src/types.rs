//! Typed transaction structures.
//!
//! Everything the binary codec reads or writes has a struct or tagged enum
//! here; field presence rules (which trailer fields exist for which
//! (version, tx_type) pair) live in [`crate::codec`].

use serde::{Deserialize, Serialize};

// ─── Tag constants ──────────────────────────────────────────────────────────

pub mod tx_type {
    pub const UNSET: u8 = 0;
    pub const MINER: u8 = 1;
    pub const PROTOCOL: u8 = 2;
    pub const TRANSFER: u8 = 3;
    pub const CONVERT: u8 = 4;
    pub const BURN: u8 = 5;
    pub const STAKE: u8 = 6;
    pub const RETURN: u8 = 7;
    pub const AUDIT: u8 = 8;
}

pub mod rct_type {
    pub const NULL: u8 = 0;
    pub const FULL: u8 = 1;
    pub const SIMPLE: u8 = 2;
    pub const BULLETPROOF: u8 = 3;
    pub const BULLETPROOF2: u8 = 4;
    pub const CLSAG: u8 = 5;
    pub const BULLETPROOF_PLUS: u8 = 6;
    pub const FULL_PROOFS: u8 = 7;
    pub const SALVIUM_ZERO: u8 = 8;
    pub const SALVIUM_ONE: u8 = 9;
}

pub mod input_tag {
    pub const GEN: u8 = 0xff;
    pub const KEY: u8 = 0x02;
}

pub mod output_tag {
    pub const KEY: u8 = 0x02;
    pub const TAGGED_KEY: u8 = 0x03;
    pub const CARROT_V1: u8 = 0x04;
}

// ─── Prefix ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxInput {
    /// Coinbase generation input.
    Gen { height: u64 },
    /// Spend of a prior output through a ring.
    Key {
        /// Always 0 in the RCT era.
        amount: u64,
        asset_type: String,
        /// Relative offsets into the per-asset global output index space.
        key_offsets: Vec<u64>,
        key_image: [u8; 32],
    },
}

impl TxInput {
    pub fn key_image(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Key { key_image, .. } => Some(key_image),
            Self::Gen { .. } => None,
        }
    }

    pub fn ring_size(&self) -> usize {
        match self {
            Self::Key { key_offsets, .. } => key_offsets.len(),
            Self::Gen { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutput {
    /// Pre-view-tag legacy output.
    Key {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
        unlock_time: u64,
    },
    /// Legacy output with a 1-byte view tag.
    TaggedKey {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
        unlock_time: u64,
        view_tag: u8,
    },
    /// CARROT output: 3-byte view tag, encrypted Janus anchor, no unlock
    /// time on the wire.
    CarrotV1 {
        amount: u64,
        key: [u8; 32],
        asset_type: String,
        view_tag: [u8; 3],
        encrypted_janus_anchor: [u8; 16],
    },
}

impl TxOutput {
    pub fn amount(&self) -> u64 {
        match self {
            Self::Key { amount, .. }
            | Self::TaggedKey { amount, .. }
            | Self::CarrotV1 { amount, .. } => *amount,
        }
    }

    pub fn key(&self) -> &[u8; 32] {
        match self {
            Self::Key { key, .. } | Self::TaggedKey { key, .. } | Self::CarrotV1 { key, .. } => key,
        }
    }

    pub fn asset_type(&self) -> &str {
        match self {
            Self::Key { asset_type, .. }
            | Self::TaggedKey { asset_type, .. }
            | Self::CarrotV1 { asset_type, .. } => asset_type,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            Self::Key { .. } => output_tag::KEY,
            Self::TaggedKey { .. } => output_tag::TAGGED_KEY,
            Self::CarrotV1 { .. } => output_tag::CARROT_V1,
        }
    }
}

/// CARROT return enote for v4 STAKE transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTxData {
    pub version: u64,
    pub return_address: [u8; 32],
    pub return_pubkey: [u8; 32],
    pub return_view_tag: [u8; 3],
    pub return_anchor_enc: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPrefix {
    pub version: u64,
    pub unlock_time: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub extra: Vec<u8>,
    pub tx_type: u8,
    pub amount_burnt: u64,
    /// Pre-CARROT STAKE/AUDIT return path.
    pub return_address: Option<[u8; 32]>,
    pub return_pubkey: Option<[u8; 32]>,
    /// TRANSFER v3+: one return address per output plus a change bitmask.
    pub return_address_list: Option<Vec<[u8; 32]>>,
    pub return_address_change_mask: Option<Vec<u8>>,
    /// STAKE v4+.
    pub protocol_tx_data: Option<ProtocolTxData>,
    pub source_asset_type: String,
    pub destination_asset_type: String,
    pub amount_slippage_limit: u64,
}

impl TxPrefix {
    pub fn key_images(&self) -> impl Iterator<Item = &[u8; 32]> {
        self.inputs.iter().filter_map(TxInput::key_image)
    }
}

// ─── RCT signatures ─────────────────────────────────────────────────────────

/// `R || z1 || z2` Schnorr-style proof binding conversion data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    pub r: [u8; 32],
    pub z1: [u8; 32],
    pub z2: [u8; 32],
}

impl ZkProof {
    pub const ZERO: ZkProof = ZkProof { r: [0; 32], z1: [0; 32], z2: [0; 32] };
}

/// Per-input verification material of a SalviumZeroAudit body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInputData {
    pub a_r: [u8; 32],
    pub amount: u64,
    pub index: u64,
    pub origin_tx_type: u8,
    /// (aR_stake, i_stake) when the origin was a stake.
    pub stake: Option<([u8; 32], u64)>,
}

/// Extension body carried when salvium_data_type == 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditData {
    pub cz_proof: ZkProof,
    pub inputs: Vec<AuditInputData>,
    pub spend_pubkey: [u8; 32],
    pub enc_view_privkey: Vec<u8>,
}

/// Conversion-proof block; shape depends on the RCT type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalviumData {
    /// RCT type FullProofs: bare proof pair, no discriminator on the wire.
    Proofs { pr_proof: ZkProof, sa_proof: ZkProof },
    /// RCT types SalviumZero/SalviumOne: discriminator + proofs, plus the
    /// audit body when data_type == 1.
    Salvium {
        data_type: u64,
        pr_proof: ZkProof,
        sa_proof: ZkProof,
        audit: Option<AuditData>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClsagSer {
    pub s: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    pub d: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TclsagSer {
    pub sx: Vec<[u8; 32]>,
    pub sy: Vec<[u8; 32]>,
    pub c1: [u8; 32],
    pub d: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletproofPlusSer {
    pub a: [u8; 32],
    pub a1: [u8; 32],
    pub b: [u8; 32],
    pub r1: [u8; 32],
    pub s1: [u8; 32],
    pub d1: [u8; 32],
    pub l: Vec<[u8; 32]>,
    pub r: Vec<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RctSignatures {
    pub rct_type: u8,
    pub fee: u64,
    /// Compact 8-byte encrypted amounts, one per output.
    pub ecdh_amounts: Vec<[u8; 8]>,
    /// Output commitments.
    pub out_pk: Vec<[u8; 32]>,
    /// Blinding-difference publication point (identity when balanced).
    pub p_r: [u8; 32],
    pub salvium_data: Option<SalviumData>,
    pub bulletproofs_plus: Vec<BulletproofPlusSer>,
    pub clsags: Vec<ClsagSer>,
    pub tclsags: Vec<TclsagSer>,
    pub pseudo_outs: Vec<[u8; 32]>,
}

impl RctSignatures {
    pub fn uses_tclsag(&self) -> bool {
        self.rct_type == rct_type::SALVIUM_ONE
    }
}

// ─── Transaction & block ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub prefix: TxPrefix,
    /// None only for v1 transactions (no RCT section at all).
    pub rct: Option<RctSignatures>,
}

impl Transaction {
    pub fn input_count(&self) -> usize {
        self.prefix.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.prefix.outputs.len()
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self.prefix.inputs.first(), Some(TxInput::Gen { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub major_version: u64,
    pub minor_version: u64,
    pub timestamp: u64,
    pub prev_id: [u8; 32],
    pub nonce: u32,
}

/// A parsed block: header, the miner and protocol transactions, and the
/// hashes of the remaining transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub miner_tx: Transaction,
    pub protocol_tx: Transaction,
    pub tx_hashes: Vec<[u8; 32]>,
}
