//! Consensus binary codec.
//!
//! Canonical serialization and strict parsing of transactions and blocks.
//! Parsing is the exact inverse of serialization; `parse(serialize(tx))`
//! reproduces the input for every consensus-valid transaction. All integers
//! are unsigned LEB128 varints capped at 10 bytes.

use crate::types::*;
use crate::TxError;
use salvium_crypto::keccak256;

// ─── Varints ────────────────────────────────────────────────────────────────

pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a varint at `offset`; rejects encodings longer than 10 bytes.
pub fn read_varint_at(data: &[u8], offset: usize) -> Result<(u64, usize), TxError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut consumed = 0usize;
    loop {
        let byte = *data
            .get(offset + consumed)
            .ok_or(TxError::BadVarint { offset })?;
        consumed += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, consumed));
        }
        shift += 7;
        if shift >= 70 {
            return Err(TxError::BadVarint { offset });
        }
    }
}

// ─── Cursor ─────────────────────────────────────────────────────────────────

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], TxError> {
        if self.offset + count > self.data.len() {
            return Err(TxError::Truncated {
                offset: self.offset,
                need: self.offset + count - self.data.len(),
            });
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn read_byte(&mut self) -> Result<u8, TxError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        Ok(self.read_bytes(N)?.try_into().unwrap())
    }

    fn read_varint(&mut self) -> Result<u64, TxError> {
        let (value, consumed) = read_varint_at(self.data, self.offset)?;
        self.offset += consumed;
        Ok(value)
    }

    fn read_u32_le(&mut self) -> Result<u32, TxError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_u64_le(&mut self) -> Result<u64, TxError> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    fn read_string(&mut self) -> Result<String, TxError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TxError::BadAssetType)
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

// ─── Prefix ─────────────────────────────────────────────────────────────────

pub fn serialize_prefix(prefix: &TxPrefix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    write_varint(&mut buf, prefix.version);
    write_varint(&mut buf, prefix.unlock_time);

    write_varint(&mut buf, prefix.inputs.len() as u64);
    for input in &prefix.inputs {
        match input {
            TxInput::Gen { height } => {
                buf.push(input_tag::GEN);
                write_varint(&mut buf, *height);
            }
            TxInput::Key { amount, asset_type, key_offsets, key_image } => {
                buf.push(input_tag::KEY);
                write_varint(&mut buf, *amount);
                write_string(&mut buf, asset_type);
                write_varint(&mut buf, key_offsets.len() as u64);
                for offset in key_offsets {
                    write_varint(&mut buf, *offset);
                }
                buf.extend_from_slice(key_image);
            }
        }
    }

    write_varint(&mut buf, prefix.outputs.len() as u64);
    for output in &prefix.outputs {
        write_varint(&mut buf, output.amount());
        buf.push(output.tag());
        match output {
            TxOutput::Key { key, asset_type, unlock_time, .. } => {
                buf.extend_from_slice(key);
                write_string(&mut buf, asset_type);
                write_varint(&mut buf, *unlock_time);
            }
            TxOutput::TaggedKey { key, asset_type, unlock_time, view_tag, .. } => {
                buf.extend_from_slice(key);
                write_string(&mut buf, asset_type);
                write_varint(&mut buf, *unlock_time);
                buf.push(*view_tag);
            }
            TxOutput::CarrotV1 { key, asset_type, view_tag, encrypted_janus_anchor, .. } => {
                buf.extend_from_slice(key);
                write_string(&mut buf, asset_type);
                buf.extend_from_slice(view_tag);
                buf.extend_from_slice(encrypted_janus_anchor);
            }
        }
    }

    write_varint(&mut buf, prefix.extra.len() as u64);
    buf.extend_from_slice(&prefix.extra);

    write_varint(&mut buf, prefix.tx_type as u64);

    // Salvium trailer, gated on (version, tx_type).
    if prefix.tx_type != tx_type::UNSET && prefix.tx_type != tx_type::PROTOCOL {
        write_varint(&mut buf, prefix.amount_burnt);

        if prefix.tx_type != tx_type::MINER {
            if prefix.tx_type == tx_type::TRANSFER && prefix.version >= 3 {
                let list = prefix.return_address_list.as_deref().unwrap_or(&[]);
                write_varint(&mut buf, list.len() as u64);
                for address in list {
                    buf.extend_from_slice(address);
                }
                let mask = prefix.return_address_change_mask.as_deref().unwrap_or(&[]);
                write_varint(&mut buf, mask.len() as u64);
                buf.extend_from_slice(mask);
            } else if prefix.tx_type == tx_type::STAKE && prefix.version >= 4 {
                let ptx = prefix.protocol_tx_data.as_ref().cloned().unwrap_or(ProtocolTxData {
                    version: 0,
                    return_address: [0; 32],
                    return_pubkey: [0; 32],
                    return_view_tag: [0; 3],
                    return_anchor_enc: [0; 16],
                });
                write_varint(&mut buf, ptx.version);
                buf.extend_from_slice(&ptx.return_address);
                buf.extend_from_slice(&ptx.return_pubkey);
                buf.extend_from_slice(&ptx.return_view_tag);
                buf.extend_from_slice(&ptx.return_anchor_enc);
            } else {
                buf.extend_from_slice(&prefix.return_address.unwrap_or([0; 32]));
                buf.extend_from_slice(&prefix.return_pubkey.unwrap_or([0; 32]));
            }

            write_string(&mut buf, &prefix.source_asset_type);
            write_string(&mut buf, &prefix.destination_asset_type);
            write_varint(&mut buf, prefix.amount_slippage_limit);
        }
    }

    buf
}

fn parse_prefix(c: &mut Cursor) -> Result<TxPrefix, TxError> {
    let version = c.read_varint()?;
    let unlock_time = c.read_varint()?;

    let input_count = c.read_varint()? as usize;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let tag = c.read_byte()?;
        match tag {
            input_tag::GEN => inputs.push(TxInput::Gen { height: c.read_varint()? }),
            input_tag::KEY => {
                let amount = c.read_varint()?;
                let asset_type = c.read_string()?;
                let offset_count = c.read_varint()? as usize;
                let mut key_offsets = Vec::with_capacity(offset_count);
                for _ in 0..offset_count {
                    key_offsets.push(c.read_varint()?);
                }
                let key_image = c.read_array::<32>()?;
                inputs.push(TxInput::Key { amount, asset_type, key_offsets, key_image });
            }
            other => return Err(TxError::UnknownInputType(other)),
        }
    }

    let output_count = c.read_varint()? as usize;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        let amount = c.read_varint()?;
        let tag = c.read_byte()?;
        match tag {
            output_tag::KEY => {
                let key = c.read_array::<32>()?;
                let asset_type = c.read_string()?;
                let unlock_time = c.read_varint()?;
                outputs.push(TxOutput::Key { amount, key, asset_type, unlock_time });
            }
            output_tag::TAGGED_KEY => {
                let key = c.read_array::<32>()?;
                let asset_type = c.read_string()?;
                let unlock_time = c.read_varint()?;
                let view_tag = c.read_byte()?;
                outputs.push(TxOutput::TaggedKey { amount, key, asset_type, unlock_time, view_tag });
            }
            output_tag::CARROT_V1 => {
                let key = c.read_array::<32>()?;
                let asset_type = c.read_string()?;
                let view_tag = c.read_array::<3>()?;
                let encrypted_janus_anchor = c.read_array::<16>()?;
                outputs.push(TxOutput::CarrotV1 {
                    amount,
                    key,
                    asset_type,
                    view_tag,
                    encrypted_janus_anchor,
                });
            }
            other => return Err(TxError::UnknownOutputType(other)),
        }
    }

    let extra_len = c.read_varint()? as usize;
    let extra = c.read_bytes(extra_len)?.to_vec();

    let tx_type = c.read_varint()? as u8;

    let mut amount_burnt = 0;
    let mut return_address = None;
    let mut return_pubkey = None;
    let mut return_address_list = None;
    let mut return_address_change_mask = None;
    let mut protocol_tx_data = None;
    let mut source_asset_type = String::new();
    let mut destination_asset_type = String::new();
    let mut amount_slippage_limit = 0;

    if tx_type != tx_type::UNSET && tx_type != tx_type::PROTOCOL {
        amount_burnt = c.read_varint()?;

        if tx_type != tx_type::MINER {
            if tx_type == tx_type::TRANSFER && version >= 3 {
                let count = c.read_varint()? as usize;
                let mut list = Vec::with_capacity(count);
                for _ in 0..count {
                    list.push(c.read_array::<32>()?);
                }
                return_address_list = Some(list);
                let mask_len = c.read_varint()? as usize;
                return_address_change_mask = Some(c.read_bytes(mask_len)?.to_vec());
            } else if tx_type == tx_type::STAKE && version >= 4 {
                protocol_tx_data = Some(ProtocolTxData {
                    version: c.read_varint()?,
                    return_address: c.read_array::<32>()?,
                    return_pubkey: c.read_array::<32>()?,
                    return_view_tag: c.read_array::<3>()?,
                    return_anchor_enc: c.read_array::<16>()?,
                });
            } else {
                return_address = Some(c.read_array::<32>()?);
                return_pubkey = Some(c.read_array::<32>()?);
            }

            source_asset_type = c.read_string()?;
            destination_asset_type = c.read_string()?;
            amount_slippage_limit = c.read_varint()?;
        }
    }

    Ok(TxPrefix {
        version,
        unlock_time,
        inputs,
        outputs,
        extra,
        tx_type,
        amount_burnt,
        return_address,
        return_pubkey,
        return_address_list,
        return_address_change_mask,
        protocol_tx_data,
        source_asset_type,
        destination_asset_type,
        amount_slippage_limit,
    })
}

// ─── ZK proofs & salvium_data ───────────────────────────────────────────────

fn write_zk_proof(buf: &mut Vec<u8>, proof: &ZkProof) {
    buf.extend_from_slice(&proof.r);
    buf.extend_from_slice(&proof.z1);
    buf.extend_from_slice(&proof.z2);
}

fn parse_zk_proof(c: &mut Cursor) -> Result<ZkProof, TxError> {
    Ok(ZkProof {
        r: c.read_array::<32>()?,
        z1: c.read_array::<32>()?,
        z2: c.read_array::<32>()?,
    })
}

fn write_salvium_data(buf: &mut Vec<u8>, data: &SalviumData) {
    match data {
        SalviumData::Proofs { pr_proof, sa_proof } => {
            write_zk_proof(buf, pr_proof);
            write_zk_proof(buf, sa_proof);
        }
        SalviumData::Salvium { data_type, pr_proof, sa_proof, audit } => {
            write_varint(buf, *data_type);
            write_zk_proof(buf, pr_proof);
            write_zk_proof(buf, sa_proof);
            if let Some(audit) = audit {
                write_zk_proof(buf, &audit.cz_proof);
                write_varint(buf, audit.inputs.len() as u64);
                for item in &audit.inputs {
                    buf.extend_from_slice(&item.a_r);
                    write_varint(buf, item.amount);
                    write_varint(buf, item.index);
                    write_varint(buf, item.origin_tx_type as u64);
                    if let Some((a_r_stake, i_stake)) = &item.stake {
                        buf.extend_from_slice(a_r_stake);
                        buf.extend_from_slice(&i_stake.to_le_bytes());
                    }
                }
                buf.extend_from_slice(&audit.spend_pubkey);
                write_varint(buf, audit.enc_view_privkey.len() as u64);
                buf.extend_from_slice(&audit.enc_view_privkey);
            }
        }
    }
}

fn parse_salvium_data(c: &mut Cursor) -> Result<SalviumData, TxError> {
    let data_type = c.read_varint()?;
    let pr_proof = parse_zk_proof(c)?;
    let sa_proof = parse_zk_proof(c)?;

    let audit = if data_type == 1 {
        let cz_proof = parse_zk_proof(c)?;
        let count = c.read_varint()? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let a_r = c.read_array::<32>()?;
            let amount = c.read_varint()?;
            let index = c.read_varint()?;
            let origin_tx_type = c.read_varint()? as u8;
            let stake = if origin_tx_type != 0 {
                Some((c.read_array::<32>()?, c.read_u64_le()?))
            } else {
                None
            };
            items.push(AuditInputData { a_r, amount, index, origin_tx_type, stake });
        }
        let spend_pubkey = c.read_array::<32>()?;
        let len = c.read_varint()? as usize;
        let enc_view_privkey = c.read_bytes(len)?.to_vec();
        Some(AuditData { cz_proof, inputs: items, spend_pubkey, enc_view_privkey })
    } else {
        None
    };

    Ok(SalviumData::Salvium { data_type, pr_proof, sa_proof, audit })
}

// ─── RCT base ───────────────────────────────────────────────────────────────

/// Serialize the non-prunable RCT section. Also the byte string hashed into
/// the pre-MLSAG message.
pub fn serialize_rct_base(rct: &RctSignatures) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + rct.out_pk.len() * 40);
    buf.push(rct.rct_type);
    if rct.rct_type == rct_type::NULL {
        return buf;
    }

    write_varint(&mut buf, rct.fee);
    for amount in &rct.ecdh_amounts {
        buf.extend_from_slice(amount);
    }
    for pk in &rct.out_pk {
        buf.extend_from_slice(pk);
    }
    buf.extend_from_slice(&rct.p_r);

    if let Some(data) = &rct.salvium_data {
        write_salvium_data(&mut buf, data);
    }

    buf
}

fn parse_rct_base(c: &mut Cursor, output_count: usize) -> Result<RctSignatures, TxError> {
    let rct_type = c.read_byte()?;
    if rct_type == rct_type::NULL {
        return Ok(RctSignatures {
            rct_type,
            fee: 0,
            ecdh_amounts: Vec::new(),
            out_pk: Vec::new(),
            p_r: [0; 32],
            salvium_data: None,
            bulletproofs_plus: Vec::new(),
            clsags: Vec::new(),
            tclsags: Vec::new(),
            pseudo_outs: Vec::new(),
        });
    }

    if !(rct_type::BULLETPROOF_PLUS..=rct_type::SALVIUM_ONE).contains(&rct_type) {
        return Err(TxError::UnknownRctType(rct_type));
    }

    let fee = c.read_varint()?;
    let mut ecdh_amounts = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        ecdh_amounts.push(c.read_array::<8>()?);
    }
    let mut out_pk = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        out_pk.push(c.read_array::<32>()?);
    }
    let p_r = c.read_array::<32>()?;

    let salvium_data = match rct_type {
        rct_type::SALVIUM_ZERO | rct_type::SALVIUM_ONE => Some(parse_salvium_data(c)?),
        rct_type::FULL_PROOFS => Some(SalviumData::Proofs {
            pr_proof: parse_zk_proof(c)?,
            sa_proof: parse_zk_proof(c)?,
        }),
        _ => None,
    };

    Ok(RctSignatures {
        rct_type,
        fee,
        ecdh_amounts,
        out_pk,
        p_r,
        salvium_data,
        bulletproofs_plus: Vec::new(),
        clsags: Vec::new(),
        tclsags: Vec::new(),
        pseudo_outs: Vec::new(),
    })
}

// ─── RCT prunable ───────────────────────────────────────────────────────────

fn serialize_rct_prunable(buf: &mut Vec<u8>, rct: &RctSignatures) {
    write_varint(buf, rct.bulletproofs_plus.len() as u64);
    for bp in &rct.bulletproofs_plus {
        buf.extend_from_slice(&bp.a);
        buf.extend_from_slice(&bp.a1);
        buf.extend_from_slice(&bp.b);
        buf.extend_from_slice(&bp.r1);
        buf.extend_from_slice(&bp.s1);
        buf.extend_from_slice(&bp.d1);
        write_varint(buf, bp.l.len() as u64);
        for l in &bp.l {
            buf.extend_from_slice(l);
        }
        write_varint(buf, bp.r.len() as u64);
        for r in &bp.r {
            buf.extend_from_slice(r);
        }
    }

    // Ring signatures carry no count: one per input, sizes fixed by the
    // corresponding ring.
    for sig in &rct.tclsags {
        for s in &sig.sx {
            buf.extend_from_slice(s);
        }
        for s in &sig.sy {
            buf.extend_from_slice(s);
        }
        buf.extend_from_slice(&sig.c1);
        buf.extend_from_slice(&sig.d);
    }
    for sig in &rct.clsags {
        for s in &sig.s {
            buf.extend_from_slice(s);
        }
        buf.extend_from_slice(&sig.c1);
        buf.extend_from_slice(&sig.d);
    }

    for pseudo in &rct.pseudo_outs {
        buf.extend_from_slice(pseudo);
    }
}

fn parse_rct_prunable(
    c: &mut Cursor,
    rct: &mut RctSignatures,
    ring_sizes: &[usize],
) -> Result<(), TxError> {
    let bp_count = c.read_varint()? as usize;
    if bp_count > 1000 {
        return Err(TxError::UnknownRctType(rct.rct_type));
    }
    for _ in 0..bp_count {
        let a = c.read_array::<32>()?;
        let a1 = c.read_array::<32>()?;
        let b = c.read_array::<32>()?;
        let r1 = c.read_array::<32>()?;
        let s1 = c.read_array::<32>()?;
        let d1 = c.read_array::<32>()?;
        let l_count = c.read_varint()? as usize;
        if l_count > 64 {
            return Err(TxError::UnknownRctType(rct.rct_type));
        }
        let mut l = Vec::with_capacity(l_count);
        for _ in 0..l_count {
            l.push(c.read_array::<32>()?);
        }
        let r_count = c.read_varint()? as usize;
        if r_count > 64 {
            return Err(TxError::UnknownRctType(rct.rct_type));
        }
        let mut r = Vec::with_capacity(r_count);
        for _ in 0..r_count {
            r.push(c.read_array::<32>()?);
        }
        rct.bulletproofs_plus.push(BulletproofPlusSer { a, a1, b, r1, s1, d1, l, r });
    }

    if rct.rct_type == rct_type::SALVIUM_ONE {
        for &ring_size in ring_sizes {
            let mut sx = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                sx.push(c.read_array::<32>()?);
            }
            let mut sy = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                sy.push(c.read_array::<32>()?);
            }
            let c1 = c.read_array::<32>()?;
            let d = c.read_array::<32>()?;
            rct.tclsags.push(TclsagSer { sx, sy, c1, d });
        }
    } else {
        for &ring_size in ring_sizes {
            let mut s = Vec::with_capacity(ring_size);
            for _ in 0..ring_size {
                s.push(c.read_array::<32>()?);
            }
            let c1 = c.read_array::<32>()?;
            let d = c.read_array::<32>()?;
            rct.clsags.push(ClsagSer { s, c1, d });
        }
    }

    for _ in ring_sizes {
        rct.pseudo_outs.push(c.read_array::<32>()?);
    }

    Ok(())
}

// ─── Transactions ───────────────────────────────────────────────────────────

pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = serialize_prefix(&tx.prefix);
    if let Some(rct) = &tx.rct {
        buf.extend_from_slice(&serialize_rct_base(rct));
        if rct.rct_type != rct_type::NULL {
            serialize_rct_prunable(&mut buf, rct);
        }
    }
    buf
}

/// Parse a complete transaction; trailing bytes are an error.
pub fn parse_transaction(data: &[u8]) -> Result<Transaction, TxError> {
    let mut c = Cursor::new(data);
    let tx = parse_transaction_inner(&mut c)?;
    if c.remaining() > 0 {
        return Err(TxError::TrailingBytes(c.remaining()));
    }
    Ok(tx)
}

pub(crate) fn parse_transaction_inner(c: &mut Cursor) -> Result<Transaction, TxError> {
    let prefix = parse_prefix(c)?;

    if prefix.version == 1 {
        return Ok(Transaction { prefix, rct: None });
    }

    let mut rct = parse_rct_base(c, prefix.outputs.len())?;
    if rct.rct_type != rct_type::NULL {
        let ring_sizes: Vec<usize> = prefix
            .inputs
            .iter()
            .filter_map(|i| match i {
                TxInput::Key { key_offsets, .. } => Some(key_offsets.len()),
                TxInput::Gen { .. } => None,
            })
            .collect();
        parse_rct_prunable(c, &mut rct, &ring_sizes)?;
    }

    Ok(Transaction { prefix, rct: Some(rct) })
}

// ─── Hashing ────────────────────────────────────────────────────────────────

/// Keccak-256 of the canonical prefix serialization.
pub fn tx_prefix_hash(prefix: &TxPrefix) -> [u8; 32] {
    keccak256(&serialize_prefix(prefix))
}

/// Transaction hash over the full serialization.
pub fn tx_hash(tx: &Transaction) -> [u8; 32] {
    keccak256(&serialize_transaction(tx))
}

/// Flat concatenation of the BP+ fields, as hashed into the signing message
/// (no varint prefixes; V is excluded — it is already bound via outPk).
pub fn bp_components_bytes(rct: &RctSignatures) -> Vec<u8> {
    let mut buf = Vec::new();
    for bp in &rct.bulletproofs_plus {
        buf.extend_from_slice(&bp.a);
        buf.extend_from_slice(&bp.a1);
        buf.extend_from_slice(&bp.b);
        buf.extend_from_slice(&bp.r1);
        buf.extend_from_slice(&bp.s1);
        buf.extend_from_slice(&bp.d1);
        for l in &bp.l {
            buf.extend_from_slice(l);
        }
        for r in &bp.r {
            buf.extend_from_slice(r);
        }
    }
    buf
}

/// The message CLSAG/TCLSAG actually sign:
/// `H(prefix_hash || H(rct_base) || H(bp_components))`.
pub fn pre_mlsag_hash(prefix: &TxPrefix, rct: &RctSignatures) -> [u8; 32] {
    let prefix_hash = tx_prefix_hash(prefix);
    let base_hash = keccak256(&serialize_rct_base(rct));
    let bp_hash = keccak256(&bp_components_bytes(rct));
    let mut combined = [0u8; 96];
    combined[..32].copy_from_slice(&prefix_hash);
    combined[32..64].copy_from_slice(&base_hash);
    combined[64..].copy_from_slice(&bp_hash);
    keccak256(&combined)
}

// ─── Blocks ─────────────────────────────────────────────────────────────────

pub fn serialize_block(block: &Block) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512);
    write_varint(&mut buf, block.header.major_version);
    write_varint(&mut buf, block.header.minor_version);
    write_varint(&mut buf, block.header.timestamp);
    buf.extend_from_slice(&block.header.prev_id);
    buf.extend_from_slice(&block.header.nonce.to_le_bytes());
    buf.extend_from_slice(&serialize_transaction(&block.miner_tx));
    buf.extend_from_slice(&serialize_transaction(&block.protocol_tx));
    write_varint(&mut buf, block.tx_hashes.len() as u64);
    for hash in &block.tx_hashes {
        buf.extend_from_slice(hash);
    }
    buf
}

pub fn parse_block(data: &[u8]) -> Result<Block, TxError> {
    let mut c = Cursor::new(data);

    let header = BlockHeader {
        major_version: c.read_varint()?,
        minor_version: c.read_varint()?,
        timestamp: c.read_varint()?,
        prev_id: c.read_array::<32>()?,
        nonce: c.read_u32_le()?,
    };

    let miner_tx = parse_transaction_inner(&mut c)?;
    let protocol_tx = parse_transaction_inner(&mut c)?;

    let count = c.read_varint()? as usize;
    let mut tx_hashes = Vec::with_capacity(count);
    for _ in 0..count {
        tx_hashes.push(c.read_array::<32>()?);
    }

    if c.remaining() > 0 {
        return Err(TxError::TrailingBytes(c.remaining()));
    }

    Ok(Block { header, miner_tx, protocol_tx, tx_hashes })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
