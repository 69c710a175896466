//! Argon2d memory fill for the RandomX cache.
//!
//! Fixed parameters: 256 MiB (262144 KiB), 3 iterations, 1 lane, salt
//! `RandomX\x03`, version 0x13, Argon2d addressing (the data-dependent
//! J1 comes from the first word of the previous block). Only the filled
//! memory matters; no final tag is ever produced.

pub const ARGON_MEMORY_KIB: u32 = 262144;
pub const ARGON_ITERATIONS: u32 = 3;
pub const ARGON_LANES: u32 = 1;
pub const ARGON_SALT: &[u8] = b"RandomX\x03";
const ARGON_VERSION: u32 = 0x13;

pub const BLOCK_SIZE: usize = 1024;
const QWORDS_PER_BLOCK: usize = BLOCK_SIZE / 8;
const SYNC_POINTS: usize = 4;

/// One 1 KiB Argon2 block as 128 64-bit words.
#[derive(Clone, Copy)]
#[repr(align(16))]
pub struct Block(pub [u64; QWORDS_PER_BLOCK]);

impl Block {
    const ZERO: Block = Block([0; QWORDS_PER_BLOCK]);

    fn xor_from(&mut self, other: &Block) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= b;
        }
    }
}

fn blake2b_64(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(
        blake2b_simd::Params::new().hash_length(64).hash(data).as_bytes(),
    );
    out
}

/// Argon2 variable-length hash H'(T, X).
fn hash_prime(out: &mut [u8], input: &[u8]) {
    let t = out.len();
    let mut prefixed = Vec::with_capacity(4 + input.len());
    prefixed.extend_from_slice(&(t as u32).to_le_bytes());
    prefixed.extend_from_slice(input);

    if t <= 64 {
        let hash = blake2b_simd::Params::new().hash_length(t).hash(&prefixed);
        out.copy_from_slice(hash.as_bytes());
        return;
    }

    let r = t.div_ceil(32) - 2;
    let mut v = blake2b_64(&prefixed);
    out[..32].copy_from_slice(&v[..32]);
    let mut offset = 32;
    for _ in 1..r {
        v = blake2b_64(&v);
        out[offset..offset + 32].copy_from_slice(&v[..32]);
        offset += 32;
    }
    let last_len = t - offset;
    let last = blake2b_simd::Params::new().hash_length(last_len).hash(&v);
    out[offset..].copy_from_slice(last.as_bytes());
}

/// H0: the 64-byte seed binding all parameters and the key.
fn initial_hash(key: &[u8]) -> [u8; 64] {
    let mut buf = Vec::with_capacity(10 * 4 + key.len() + ARGON_SALT.len());
    for value in [
        ARGON_LANES,
        0, // tag length: the fill is the output
        ARGON_MEMORY_KIB,
        ARGON_ITERATIONS,
        ARGON_VERSION,
        0, // Argon2d
    ] {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(&(ARGON_SALT.len() as u32).to_le_bytes());
    buf.extend_from_slice(ARGON_SALT);
    buf.extend_from_slice(&0u32.to_le_bytes()); // secret
    buf.extend_from_slice(&0u32.to_le_bytes()); // associated data
    blake2b_64(&buf)
}

/// The Argon2 G function built on the fBlaMka multiply-add.
fn fbla_mka(x: u64, y: u64) -> u64 {
    let m = (x as u32 as u64).wrapping_mul(y as u32 as u64);
    x.wrapping_add(y).wrapping_add(m.wrapping_mul(2))
}

#[allow(clippy::too_many_arguments)]
fn blake2_round(v: &mut [u64; QWORDS_PER_BLOCK], a: usize, b: usize, c: usize, d: usize) {
    v[a] = fbla_mka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = fbla_mka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = fbla_mka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = fbla_mka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn round_function(v: &mut [u64; QWORDS_PER_BLOCK], base: [usize; 16]) {
    blake2_round(v, base[0], base[4], base[8], base[12]);
    blake2_round(v, base[1], base[5], base[9], base[13]);
    blake2_round(v, base[2], base[6], base[10], base[14]);
    blake2_round(v, base[3], base[7], base[11], base[15]);
    blake2_round(v, base[0], base[5], base[10], base[15]);
    blake2_round(v, base[1], base[6], base[11], base[12]);
    blake2_round(v, base[2], base[7], base[8], base[13]);
    blake2_round(v, base[3], base[4], base[9], base[14]);
}

/// `next = prev ^ ref ^ P(prev ^ ref)` (with the pass>0 overwrite XOR
/// applied by the caller).
fn fill_block(prev: &Block, reference: &Block, next: &mut Block, with_xor: bool) {
    let mut r = *prev;
    r.xor_from(reference);
    let mut z = r;

    // Apply P to each of the 8 rows...
    for row in 0..8 {
        let base: [usize; 16] = std::array::from_fn(|i| row * 16 + i);
        round_function(&mut z.0, base);
    }
    // ...then to each of the 8 columns.
    for col in 0..8 {
        let base: [usize; 16] = std::array::from_fn(|i| {
            let pair = i / 2;
            pair * 16 + col * 2 + (i & 1)
        });
        round_function(&mut z.0, base);
    }

    if with_xor {
        // Pass > 0: the slot already has content that stays XORed in.
        next.xor_from(&r);
        next.xor_from(&z);
    } else {
        *next = r;
        next.xor_from(&z);
    }
}

/// Data-dependent reference index (Argon2d position mapping).
fn reference_index(
    pass: u32,
    slice: usize,
    index_in_segment: usize,
    segment_length: usize,
    lane_length: usize,
    j1: u32,
) -> usize {
    let reference_area = if pass == 0 {
        // Everything filled so far this pass, minus the immediate
        // predecessor.
        slice * segment_length + index_in_segment - 1
    } else {
        lane_length - segment_length + index_in_segment - 1
    };

    let x = ((j1 as u64) * (j1 as u64)) >> 32;
    let y = ((reference_area as u64) * x) >> 32;
    let relative = reference_area as u64 - 1 - y;

    let start = if pass == 0 {
        0
    } else {
        ((slice + 1) % SYNC_POINTS) * segment_length
    };
    (start + relative as usize) % lane_length
}

/// Fill the whole 256 MiB cache memory from `key`.
pub fn fill_memory(key: &[u8]) -> Vec<Block> {
    let lane_length = ARGON_MEMORY_KIB as usize; // 1 KiB blocks, 1 lane
    let segment_length = lane_length / SYNC_POINTS;
    let mut memory = vec![Block::ZERO; lane_length];

    // First two blocks from H0.
    let h0 = initial_hash(key);
    let mut seed = [0u8; 72];
    seed[..64].copy_from_slice(&h0);
    for (block_index, block) in memory.iter_mut().enumerate().take(2) {
        seed[64..68].copy_from_slice(&(block_index as u32).to_le_bytes());
        seed[68..72].copy_from_slice(&0u32.to_le_bytes());
        let mut raw = [0u8; BLOCK_SIZE];
        hash_prime(&mut raw, &seed);
        for (word, chunk) in block.0.iter_mut().zip(raw.chunks_exact(8)) {
            *word = u64::from_le_bytes(chunk.try_into().unwrap());
        }
    }

    for pass in 0..ARGON_ITERATIONS {
        for slice in 0..SYNC_POINTS {
            let first = if pass == 0 && slice == 0 { 2 } else { 0 };
            for index_in_segment in first..segment_length {
                let current = slice * segment_length + index_in_segment;
                let prev = if current == 0 { lane_length - 1 } else { current - 1 };

                let j1 = memory[prev].0[0] as u32;
                let reference = reference_index(
                    pass,
                    slice,
                    index_in_segment,
                    segment_length,
                    lane_length,
                    j1,
                );

                let prev_block = memory[prev];
                let ref_block = memory[reference];
                fill_block(&prev_block, &ref_block, &mut memory[current], pass > 0);
            }
        }
    }

    memory
}
