//! X25519 operations for the CARROT view path.
//!
//! CARROT runs its ECDH on the Montgomery form with *unclamped* scalars
//! (they are already reduced mod L by the key derivation), so this wraps the
//! dalek Montgomery ladder directly instead of the RFC 7748 clamped API.

use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::Scalar;

use crate::{decompress, CryptoError};

/// The X25519 base point u-coordinate (u = 9).
pub const BASE_U: [u8; 32] = {
    let mut u = [0u8; 32];
    u[0] = 9;
    u
};

/// `u = (1 + y) / (1 - y)`: convert a compressed Edwards point to its
/// Montgomery u-coordinate.
pub fn edwards_to_montgomery_u(point: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    Ok(decompress(point)?.to_montgomery().to_bytes())
}

/// `s * U` on the Montgomery curve. Salvium's convention clears the top bit
/// of the scalar but applies no other clamping; reduced scalars are
/// unaffected.
pub fn scalar_mult(scalar: &[u8; 32], u: &[u8; 32]) -> [u8; 32] {
    let mut s = *scalar;
    s[31] &= 0x7F;
    (MontgomeryPoint(*u) * Scalar::from_bytes_mod_order(s)).to_bytes()
}

/// `s * 9`, the public key for an ephemeral X25519 scalar.
pub fn scalar_mult_base(scalar: &[u8; 32]) -> [u8; 32] {
    scalar_mult(scalar, &BASE_U)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash_to_scalar, scalar_mult_base as ed_mul_base};

    #[test]
    fn diffie_hellman_agrees() {
        let a = hash_to_scalar(b"alice").to_bytes();
        let b = hash_to_scalar(b"bob").to_bytes();
        let a_pub = scalar_mult_base(&a);
        let b_pub = scalar_mult_base(&b);
        assert_eq!(scalar_mult(&a, &b_pub), scalar_mult(&b, &a_pub));
    }

    #[test]
    fn edwards_conversion_matches_ladder() {
        // s*G on Edwards, converted to Montgomery u, equals s*9 on Montgomery.
        let s = hash_to_scalar(b"convert").to_bytes();
        let edwards = ed_mul_base(&s);
        let u = edwards_to_montgomery_u(&edwards).unwrap();
        assert_eq!(u, scalar_mult_base(&s));
    }

    #[test]
    fn invalid_edwards_point_rejected() {
        assert!(edwards_to_montgomery_u(&[0xAA; 32]).is_err());
    }
}
