//! The CryptoNote field-element-to-point map (`ge_fromfe_frombytes_vartime`).
//!
//! Maps 32 hash bytes to a curve point via the Elligator-2 style construction
//! from crypto-ops.c. The result is NOT cofactor-cleared; callers multiply by
//! 8 (see [`crate::hash_to_point`]).
//!
//! curve25519-dalek does not expose raw field arithmetic, so this module
//! carries its own arithmetic over GF(p), p = 2^255 - 19, in four 64-bit
//! limbs with u128 intermediates. Everything is variable time, which is fine:
//! inputs are public hashes.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};

/// Field element mod p, little-endian limbs, always kept < p after ops.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Fe([u64; 4]);

const P: Fe = Fe([
    0xFFFF_FFFF_FFFF_FFED,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// sqrt(-1) mod p.
const SQRT_M1: Fe = Fe([
    0xC4EE_1B27_4A0E_A0B0,
    0x2F43_1806_AD2F_E478,
    0x2B4D_0099_3DFB_D7A7,
    0x2B83_2480_4FC1_DF0B,
]);

/// Montgomery curve coefficient A = 486662.
const A: u64 = 486662;

impl Fe {
    const ZERO: Fe = Fe([0, 0, 0, 0]);
    const ONE: Fe = Fe([1, 0, 0, 0]);

    fn from_bytes(bytes: &[u8; 32]) -> Fe {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
        }
        Fe(limbs).reduced()
    }

    fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Parity of the canonical encoding (fe_isnegative in the C sources).
    fn is_odd(&self) -> bool {
        self.0[0] & 1 == 1
    }

    fn geq(&self, other: &Fe) -> bool {
        for i in (0..4).rev() {
            if self.0[i] != other.0[i] {
                return self.0[i] > other.0[i];
            }
        }
        true
    }

    fn add_carry(&self, other: &Fe) -> (Fe, bool) {
        let mut out = [0u64; 4];
        let mut carry = 0u128;
        for i in 0..4 {
            let sum = self.0[i] as u128 + other.0[i] as u128 + carry;
            out[i] = sum as u64;
            carry = sum >> 64;
        }
        (Fe(out), carry != 0)
    }

    fn sub_borrow(&self, other: &Fe) -> (Fe, bool) {
        let mut out = [0u64; 4];
        let mut borrow = 0u64;
        for i in 0..4 {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow);
            out[i] = d2;
            borrow = (b1 | b2) as u64;
        }
        (Fe(out), borrow != 0)
    }

    fn reduced(self) -> Fe {
        let mut r = self;
        while r.geq(&P) {
            r = r.sub_borrow(&P).0;
        }
        r
    }

    fn add(&self, other: &Fe) -> Fe {
        let (sum, carry) = self.add_carry(other);
        // Inputs are < p < 2^255, so a carry is impossible.
        debug_assert!(!carry);
        sum.reduced()
    }

    fn sub(&self, other: &Fe) -> Fe {
        if self.geq(other) {
            self.sub_borrow(other).0
        } else {
            self.add_carry(&P).0.sub_borrow(other).0.reduced()
        }
    }

    fn neg(&self) -> Fe {
        if self.is_zero() {
            Fe::ZERO
        } else {
            P.sub_borrow(self).0
        }
    }

    fn mul(&self, other: &Fe) -> Fe {
        // Schoolbook 256x256 -> 512, then fold with 2^256 = 38 (mod p).
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let t = self.0[i] as u128 * other.0[j] as u128 + wide[i + j] as u128 + carry;
                wide[i + j] = t as u64;
                carry = t >> 64;
            }
            wide[i + 4] = carry as u64;
        }

        let lo = Fe([wide[0], wide[1], wide[2], wide[3]]);
        let hi = Fe([wide[4], wide[5], wide[6], wide[7]]);
        lo.add_mod_folded(&hi.mul_small(38))
    }

    /// Add without the < p precondition on the right operand's carry.
    fn add_mod_folded(&self, other: &Fe) -> Fe {
        let (sum, carry) = self.add_carry(other);
        let sum = if carry {
            sum.add_carry(&Fe([38, 0, 0, 0])).0
        } else {
            sum
        };
        sum.reduced()
    }

    fn mul_small(&self, k: u64) -> Fe {
        let mut out = [0u64; 4];
        let mut carry = 0u128;
        for i in 0..4 {
            let t = self.0[i] as u128 * k as u128 + carry;
            out[i] = t as u64;
            carry = t >> 64;
        }
        let folded = Fe(out);
        if carry > 0 {
            folded.add_mod_folded(&Fe([carry as u64 * 38, 0, 0, 0]))
        } else {
            folded.reduced()
        }
    }

    fn square(&self) -> Fe {
        self.mul(self)
    }

    fn pow(&self, exp: &Fe) -> Fe {
        let mut result = Fe::ONE;
        let mut base = *self;
        for limb in exp.0 {
            let mut bits = limb;
            for _ in 0..64 {
                if bits & 1 == 1 {
                    result = result.mul(&base);
                }
                base = base.square();
                bits >>= 1;
            }
        }
        result
    }

    /// a^(p-2): multiplicative inverse (0 maps to 0).
    fn invert(&self) -> Fe {
        let exp = Fe([
            0xFFFF_FFFF_FFFF_FFEB,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x7FFF_FFFF_FFFF_FFFF,
        ]);
        self.pow(&exp)
    }

    /// a^((p-5)/8) = a^(2^252 - 3).
    fn pow_p58(&self) -> Fe {
        let exp = Fe([
            0xFFFF_FFFF_FFFF_FFFD,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ]);
        self.pow(&exp)
    }

    /// Square root mod p when one exists.
    fn sqrt(&self) -> Option<Fe> {
        if self.is_zero() {
            return Some(Fe::ZERO);
        }
        // candidate = a^((p+3)/8) = a^(2^252 - 2)
        let exp = Fe([
            0xFFFF_FFFF_FFFF_FFFE,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ]);
        let candidate = self.pow(&exp);
        if candidate.square() == *self {
            return Some(candidate);
        }
        let adjusted = candidate.mul(&SQRT_M1);
        if adjusted.square() == *self {
            return Some(adjusted);
        }
        None
    }
}

/// `(u/v)^((p+3)/8)` computed as `u * v^3 * (u * v^7)^((p-5)/8)`.
fn divpowm1(u: &Fe, v: &Fe) -> Fe {
    let v3 = v.square().mul(v);
    let v7 = v3.square().mul(v);
    u.mul(&v3).mul(&u.mul(&v7).pow_p58())
}

fn fe_a() -> Fe {
    Fe([A, 0, 0, 0])
}

/// `sqrt(c * A * (A + 2))` for the four branch constants fffb1..fffb4.
fn branch_constant(scale: &Fe, negate: bool) -> Fe {
    let a = fe_a();
    let a_plus_2 = a.add(&Fe([2, 0, 0, 0]));
    let mut value = scale.mul(&a).mul(&a_plus_2);
    if negate {
        value = value.neg();
    }
    // These are quadratic residues by construction of the map.
    value.sqrt().expect("branch constant is a square")
}

/// The map itself. Output is in the full group, NOT cofactor-cleared.
pub fn map_to_point(hash: &[u8; 32]) -> EdwardsPoint {
    let u = Fe::from_bytes(hash);

    let v = u.square().mul_small(2); // 2u^2
    let w = v.add(&Fe::ONE); // 2u^2 + 1
    let neg_a2 = fe_a().square().neg();
    // x = w^2 - 2*A^2*u^2  (note -A^2 * v = -2*A^2*u^2)
    let mut x = w.square().add(&neg_a2.mul(&v));

    let mut r_x = divpowm1(&w, &x);
    let mut y = r_x.square().mul(&x);

    let mut z = fe_a().neg();
    let sign;

    if w.sub(&y).is_zero() {
        // y == w: r_x *= sqrt(2A(A+2)) * u
        r_x = r_x.mul(&branch_constant(&Fe([2, 0, 0, 0]), false)).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else if w.add(&y).is_zero() {
        // y == -w: r_x *= sqrt(-2A(A+2)) * u
        r_x = r_x.mul(&branch_constant(&Fe([2, 0, 0, 0]), true)).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else {
        // Twist branch: scale x by sqrt(-1) and retry.
        x = x.mul(&SQRT_M1);
        y = r_x.square().mul(&x);
        if w.sub(&y).is_zero() {
            r_x = r_x.mul(&branch_constant(&SQRT_M1, false));
        } else {
            r_x = r_x.mul(&branch_constant(&SQRT_M1, true));
        }
        // z stays -A.
        sign = true;
    }

    if r_x.is_odd() != sign {
        r_x = r_x.neg();
    }

    // Projective completion: Z = z + w, Y = z - w, X = r_x * Z.
    let proj_z = z.add(&w);
    let proj_y = z.sub(&w);
    let z_inv = proj_z.invert();
    let affine_x = r_x; // X/Z = r_x by construction
    let affine_y = proj_y.mul(&z_inv);

    let mut compressed = affine_y.to_bytes();
    if affine_x.is_odd() {
        compressed[31] |= 0x80;
    }

    CompressedEdwardsY(compressed)
        .decompress()
        .expect("map output is on the curve")
}
