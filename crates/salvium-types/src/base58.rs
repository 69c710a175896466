//! CryptoNote block-based Base58.
//!
//! Not Bitcoin Base58Check: data is cut into 8-byte blocks, each block
//! encoding to exactly 11 characters so decoded length is unambiguous.
//! Partial trailing blocks use a size table. Addresses additionally carry a
//! varint tag and a 4-byte Keccak-256 checksum.
//!
//! Reference: salvium/src/common/base58.cpp

use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// The Monero/CryptoNote alphabet (no 0, O, I, l).
const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const FULL_BLOCK_SIZE: usize = 8;
const FULL_ENCODED_BLOCK_SIZE: usize = 11;
const CHECKSUM_SIZE: usize = 4;

/// Encoded character count for a partial block of N bytes.
const ENCODED_BLOCK_SIZES: [usize; 9] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

/// Decoded byte count for a partial block of N characters; -1 = impossible.
const DECODED_BLOCK_SIZES: [i8; 12] = [0, -1, 1, 2, -1, 3, 4, 5, -1, 6, 7, 8];

#[derive(Debug, Error)]
pub enum Base58Error {
    #[error("character '{0}' is not in the Base58 alphabet")]
    InvalidCharacter(char),

    #[error("encoded length {0} cannot decode to whole bytes")]
    InvalidLength(usize),

    #[error("block {0} overflows its decoded size")]
    Overflow(usize),

    #[error("decoded address too short ({0} bytes)")]
    TooShort(usize),

    #[error("address checksum mismatch")]
    ChecksumMismatch,

    #[error("varint truncated or longer than 10 bytes")]
    BadVarint,
}

const fn reverse_alphabet() -> [i8; 128] {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < 58 {
        table[ALPHABET[i] as usize] = i as i8;
        i += 1;
    }
    table
}

static REVERSE: [i8; 128] = reverse_alphabet();

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut out);
    out
}

fn encode_block(block: &[u8], out: &mut String) {
    debug_assert!(block.len() <= FULL_BLOCK_SIZE);
    let mut num = block.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let width = ENCODED_BLOCK_SIZES[block.len()];
    let mut chars = [ALPHABET[0]; FULL_ENCODED_BLOCK_SIZE];
    let mut i = width;
    while num > 0 {
        i -= 1;
        chars[i] = ALPHABET[(num % 58) as usize];
        num /= 58;
    }
    out.push_str(std::str::from_utf8(&chars[..width]).expect("alphabet is ASCII"));
}

fn decode_block(block: &[u8], block_index: usize, out: &mut Vec<u8>) -> Result<(), Base58Error> {
    let decoded_size = DECODED_BLOCK_SIZES
        .get(block.len())
        .copied()
        .filter(|&s| s >= 0)
        .ok_or(Base58Error::InvalidLength(block.len()))? as usize;

    let mut num: u64 = 0;
    for &ch in block {
        let digit = if ch < 128 { REVERSE[ch as usize] } else { -1 };
        if digit < 0 {
            return Err(Base58Error::InvalidCharacter(ch as char));
        }
        num = num
            .checked_mul(58)
            .and_then(|n| n.checked_add(digit as u64))
            .ok_or(Base58Error::Overflow(block_index))?;
    }
    if decoded_size < FULL_BLOCK_SIZE && num >= 1u64 << (8 * decoded_size) {
        return Err(Base58Error::Overflow(block_index));
    }

    for i in (0..decoded_size).rev() {
        out.push((num >> (8 * i)) as u8);
    }
    Ok(())
}

/// Encode binary data to CryptoNote Base58.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(FULL_BLOCK_SIZE) * FULL_ENCODED_BLOCK_SIZE);
    for block in data.chunks(FULL_BLOCK_SIZE) {
        encode_block(block, &mut out);
    }
    out
}

/// Decode CryptoNote Base58 back to bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Base58Error> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * FULL_BLOCK_SIZE / FULL_ENCODED_BLOCK_SIZE + FULL_BLOCK_SIZE);
    for (i, block) in bytes.chunks(FULL_ENCODED_BLOCK_SIZE).enumerate() {
        decode_block(block, i, &mut out)?;
    }
    Ok(out)
}

/// LEB128-encode an unsigned integer.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a LEB128 varint from the start of `data`. Returns (value, consumed).
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), Base58Error> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate().take(10) {
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(Base58Error::BadVarint)
}

/// Encode `varint(tag) || data || keccak256(varint(tag) || data)[..4]`.
pub fn encode_tagged(tag: u64, data: &[u8]) -> String {
    let mut payload = encode_varint(tag);
    payload.extend_from_slice(data);
    let checksum = keccak256(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_SIZE]);
    encode(&payload)
}

/// Decode a tagged+checksummed string, returning (tag, data).
pub fn decode_tagged(encoded: &str) -> Result<(u64, Vec<u8>), Base58Error> {
    let decoded = decode(encoded)?;
    if decoded.len() <= CHECKSUM_SIZE {
        return Err(Base58Error::TooShort(decoded.len()));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_SIZE);
    if &keccak256(payload)[..CHECKSUM_SIZE] != checksum {
        return Err(Base58Error::ChecksumMismatch);
    }
    let (tag, consumed) = decode_varint(payload)?;
    Ok((tag, payload[consumed..].to_vec()))
}
