//! AES-based generators: the 1-round scratchpad filler, the 4-round program
//! generator, and the scratchpad fingerprint hash.
//!
//! Each works on four 16-byte columns; odd columns run encryption rounds and
//! even columns run decryption rounds so the diffusion differs per lane.
//! Single rounds come from the `aes` crate's hazmat API (hardware AES when
//! available).

use aes::hazmat::{cipher_round, equiv_inv_cipher_round};
use aes::Block;

fn block_from_words(words: [u32; 4]) -> Block {
    let mut bytes = [0u8; 16];
    for (i, w) in words.iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }
    Block::clone_from_slice(&bytes)
}

fn aesenc(block: &mut Block, key: &Block) {
    cipher_round(block, key);
}

fn aesdec(block: &mut Block, key: &Block) {
    equiv_inv_cipher_round(block, key);
}

// Generator keys (aes_hash.cpp).
fn gen1r_keys() -> [Block; 4] {
    [
        block_from_words([0xb4f44917, 0xdbb5552b, 0x62716609, 0x6daca553]),
        block_from_words([0x0da1dc4e, 0x1725d378, 0x846a710d, 0x6d7caf07]),
        block_from_words([0x3e20e345, 0xf4c0794f, 0x9f947ec6, 0x3f1262f1]),
        block_from_words([0x49169154, 0x16314c88, 0xb1ba317c, 0x6aef8135]),
    ]
}

fn gen4r_keys() -> [Block; 8] {
    [
        block_from_words([0x99e5d23f, 0x2f546d2b, 0xd1833ddb, 0x6421aadd]),
        block_from_words([0xa5dfcde5, 0x06f79d53, 0xb6913f55, 0xb20e3450]),
        block_from_words([0x171c02bf, 0x0aa4679f, 0x515e7baf, 0x5c3ed904]),
        block_from_words([0xd8ded291, 0xcd673785, 0xe78f5d08, 0x85623763]),
        block_from_words([0x229effb4, 0x3d518b6d, 0xe3d6a7a6, 0xb5826f73]),
        block_from_words([0xb272b7d2, 0xe9024d4e, 0x9c10b3d9, 0xc7566bf3]),
        block_from_words([0xf63befa7, 0x2ba9660a, 0xf765a38b, 0xf273c9e7]),
        block_from_words([0xc0b0762d, 0x0c06d1fd, 0x915839de, 0x7a7cd609]),
    ]
}

fn load_state(state: &[u8; 64]) -> [Block; 4] {
    std::array::from_fn(|i| Block::clone_from_slice(&state[i * 16..(i + 1) * 16]))
}

fn store_state(columns: &[Block; 4], state: &mut [u8; 64]) {
    for (i, column) in columns.iter().enumerate() {
        state[i * 16..(i + 1) * 16].copy_from_slice(column);
    }
}

/// One AES round per 64 bytes of output. The final generator state is
/// written back into `state` (the hash chain depends on this).
pub fn fill_aes_1rx4(state: &mut [u8; 64], output: &mut [u8]) {
    debug_assert_eq!(output.len() % 64, 0);
    let keys = gen1r_keys();
    let mut columns = load_state(state);

    for chunk in output.chunks_exact_mut(64) {
        aesdec(&mut columns[0], &keys[0]);
        aesenc(&mut columns[1], &keys[1]);
        aesdec(&mut columns[2], &keys[2]);
        aesenc(&mut columns[3], &keys[3]);
        for (i, column) in columns.iter().enumerate() {
            chunk[i * 16..(i + 1) * 16].copy_from_slice(column);
        }
    }

    store_state(&columns, state);
}

/// Four AES rounds per 64 bytes; used to expand a seed into a program
/// buffer. The seed is not consumed.
pub fn fill_aes_4rx4(state: &[u8; 64], output: &mut [u8]) {
    debug_assert_eq!(output.len() % 64, 0);
    let keys = gen4r_keys();
    let mut columns = load_state(state);

    for chunk in output.chunks_exact_mut(64) {
        for round in 0..4 {
            aesdec(&mut columns[0], &keys[round]);
            aesenc(&mut columns[1], &keys[round]);
            aesdec(&mut columns[2], &keys[round + 4]);
            aesenc(&mut columns[3], &keys[round + 4]);
        }
        for (i, column) in columns.iter().enumerate() {
            chunk[i * 16..(i + 1) * 16].copy_from_slice(column);
        }
    }
}

/// Fingerprint a buffer (the scratchpad) into 64 bytes.
pub fn hash_aes_1rx4(input: &[u8]) -> [u8; 64] {
    debug_assert_eq!(input.len() % 64, 0);

    let mut columns = [
        block_from_words([0xd7983aad, 0xcc82db47, 0x9fa856de, 0x92b52c0d]),
        block_from_words([0xace78057, 0xf59e125a, 0x15c7b798, 0x338d996e]),
        block_from_words([0xe8a07ce4, 0x5079506b, 0x9beac0c6, 0xf8e3c946]),
        block_from_words([0x03c0c148, 0x7df7fb75, 0x624b7388, 0x9e106d78]),
    ];

    for chunk in input.chunks_exact(64) {
        for (i, column) in columns.iter_mut().enumerate() {
            let data = Block::clone_from_slice(&chunk[i * 16..(i + 1) * 16]);
            if i % 2 == 0 {
                aesenc(column, &data);
            } else {
                aesdec(column, &data);
            }
        }
    }

    let xkey0 = block_from_words([0x06890201, 0x90dc56bf, 0x8b24949f, 0xf6fa8389]);
    let xkey1 = block_from_words([0xed18f99b, 0xee1043c6, 0x51f4e03c, 0x61b263d1]);
    for xkey in [&xkey0, &xkey1] {
        for (i, column) in columns.iter_mut().enumerate() {
            if i % 2 == 0 {
                aesenc(column, xkey);
            } else {
                aesdec(column, xkey);
            }
        }
    }

    let mut out = [0u8; 64];
    store_state(&columns, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_deterministic_and_advances_state() {
        let mut state1 = [0x5Au8; 64];
        let mut state2 = [0x5Au8; 64];
        let mut out1 = vec![0u8; 256];
        let mut out2 = vec![0u8; 256];
        fill_aes_1rx4(&mut state1, &mut out1);
        fill_aes_1rx4(&mut state2, &mut out2);
        assert_eq!(out1, out2);
        assert_eq!(state1, state2);
        assert_ne!(state1, [0x5A; 64]);
        // The last 64 bytes of output ARE the final state.
        assert_eq!(&out1[192..], &state1[..]);
    }

    #[test]
    fn four_round_generator_differs_from_one_round() {
        let state = [0x11u8; 64];
        let mut one = vec![0u8; 128];
        let mut four = vec![0u8; 128];
        let mut state1 = state;
        fill_aes_1rx4(&mut state1, &mut one);
        fill_aes_4rx4(&state, &mut four);
        assert_ne!(one, four);
    }

    #[test]
    fn hash_depends_on_every_chunk() {
        let mut data = vec![0u8; 256];
        let h1 = hash_aes_1rx4(&data);
        data[200] ^= 1;
        let h2 = hash_aes_1rx4(&data);
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_is_deterministic() {
        let data = vec![0xABu8; 2048];
        assert_eq!(hash_aes_1rx4(&data), hash_aes_1rx4(&data));
    }
}
