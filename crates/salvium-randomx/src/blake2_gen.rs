//! Deterministic byte stream for program generation.
//!
//! A 64-byte BLAKE2b state reseeded from itself whenever it runs dry. Both
//! the superscalar generator and the dataset tests draw from this.

pub struct Blake2Generator {
    data: [u8; 64],
    index: usize,
}

impl Blake2Generator {
    const MAX_SEED: usize = 60;

    pub fn new(seed: &[u8], nonce: u32) -> Self {
        let mut data = [0u8; 64];
        let len = seed.len().min(Self::MAX_SEED);
        data[..len].copy_from_slice(&seed[..len]);
        data[Self::MAX_SEED..].copy_from_slice(&nonce.to_le_bytes());
        Self { data, index: data.len() }
    }

    fn ensure(&mut self, bytes: usize) {
        if self.index + bytes > self.data.len() {
            let rehash = blake2b_simd::Params::new().hash_length(64).hash(&self.data);
            self.data.copy_from_slice(rehash.as_bytes());
            self.index = 0;
        }
    }

    pub fn get_u8(&mut self) -> u8 {
        self.ensure(1);
        let value = self.data[self.index];
        self.index += 1;
        value
    }

    pub fn get_u32(&mut self) -> u32 {
        self.ensure(4);
        let value =
            u32::from_le_bytes(self.data[self.index..self.index + 4].try_into().unwrap());
        self.index += 4;
        value
    }
}
