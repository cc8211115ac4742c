//! Finite field abstraction over one prime modulus.
//!
//! A [`FieldContext`] owns a modulus; every [`FieldElement`] created through
//! it is reduced into `[0, p)` and stays there. Two contexts exist at runtime
//! (curve coordinates and scalars) and are never interchangeable: mixing
//! values from different contexts yields `FieldContextMismatch`, never a
//! silent coercion.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::{CryptoError, Result};
use crate::math;

/// A prime field, shared by reference between all of its elements.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldContext {
    modulus: BigUint,
    byte_len: usize,
}

impl FieldContext {
    pub fn new(modulus: BigUint) -> Arc<Self> {
        let byte_len = (modulus.bits() as usize + 7) / 8;
        Arc::new(FieldContext { modulus, byte_len })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Fixed serialization width for elements of this field.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

/// An immutable (context, residue) pair with `residue` in `[0, modulus)`.
#[derive(Debug, Clone)]
pub struct FieldElement {
    ctx: Arc<FieldContext>,
    value: BigUint,
}

impl PartialEq for FieldElement {
    fn eq(&self, other: &Self) -> bool {
        self.ctx.modulus == other.ctx.modulus && self.value == other.value
    }
}

impl Eq for FieldElement {}

impl FieldElement {
    pub fn new(ctx: &Arc<FieldContext>, value: BigUint) -> Self {
        let value = value % &ctx.modulus;
        FieldElement {
            ctx: Arc::clone(ctx),
            value,
        }
    }

    /// Lift a possibly-negative integer into the field.
    pub fn from_signed(ctx: &Arc<FieldContext>, value: &BigInt) -> Self {
        FieldElement {
            ctx: Arc::clone(ctx),
            value: math::normalize(value, &ctx.modulus),
        }
    }

    pub fn from_bytes_be(ctx: &Arc<FieldContext>, bytes: &[u8]) -> Self {
        Self::new(ctx, BigUint::from_bytes_be(bytes))
    }

    pub fn context(&self) -> &Arc<FieldContext> {
        &self.ctx
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Low bit of the residue; drives parity selection in `sqrt`.
    pub fn is_even(&self) -> bool {
        self.value.is_even()
    }

    /// Big-endian bytes zero-padded to the field's byte length.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let raw = self.value.to_bytes_be();
        let mut out = vec![0u8; self.ctx.byte_len.saturating_sub(raw.len())];
        out.extend_from_slice(&raw);
        out
    }

    fn check_context(&self, other: &FieldElement) -> Result<()> {
        if self.ctx.modulus != other.ctx.modulus {
            return Err(CryptoError::FieldContextMismatch);
        }
        Ok(())
    }

    pub fn add(&self, other: &FieldElement) -> Result<FieldElement> {
        self.check_context(other)?;
        Ok(Self::new(&self.ctx, &self.value + &other.value))
    }

    pub fn sub(&self, other: &FieldElement) -> Result<FieldElement> {
        self.check_context(other)?;
        let diff = BigInt::from(self.value.clone()) - BigInt::from(other.value.clone());
        Ok(Self::from_signed(&self.ctx, &diff))
    }

    pub fn mul(&self, other: &FieldElement) -> Result<FieldElement> {
        self.check_context(other)?;
        Ok(Self::new(&self.ctx, &self.value * &other.value))
    }

    pub fn div(&self, other: &FieldElement) -> Result<FieldElement> {
        self.check_context(other)?;
        self.mul(&other.inverse()?)
    }

    pub fn square(&self) -> FieldElement {
        Self::new(&self.ctx, &self.value * &self.value)
    }

    pub fn cube(&self) -> FieldElement {
        Self::new(&self.ctx, &self.value * &self.value * &self.value)
    }

    pub fn negate(&self) -> FieldElement {
        if self.value.is_zero() {
            self.clone()
        } else {
            FieldElement {
                ctx: Arc::clone(&self.ctx),
                value: &self.ctx.modulus - &self.value,
            }
        }
    }

    pub fn inverse(&self) -> Result<FieldElement> {
        let inv = math::mod_inverse(&self.value, &self.ctx.modulus)?;
        Ok(FieldElement {
            ctx: Arc::clone(&self.ctx),
            value: inv,
        })
    }

    pub fn pow(&self, exponent: &BigInt) -> Result<FieldElement> {
        let value = math::mod_exp(&self.value, exponent, &self.ctx.modulus)?;
        Ok(FieldElement {
            ctx: Arc::clone(&self.ctx),
            value,
        })
    }

    /// Legendre symbol: 1 for residues, p-1 for non-residues, 0 for zero.
    fn legendre(&self) -> BigUint {
        let exp = (&self.ctx.modulus - 1u32) >> 1;
        self.value.modpow(&exp, &self.ctx.modulus)
    }

    /// Square root with parity selection.
    ///
    /// Returns the root whose low bit matches `even`; `NoSquareRoot` if the
    /// value is a non-residue. Uses the `p == 3 (mod 4)` fast path when the
    /// modulus allows it and full Tonelli-Shanks otherwise.
    pub fn sqrt(&self, even: bool) -> Result<FieldElement> {
        if self.value.is_zero() {
            return Ok(self.clone());
        }
        if self.legendre() != BigUint::one() {
            return Err(CryptoError::NoSquareRoot);
        }

        let p = &self.ctx.modulus;
        let root = if (p % 4u32) == BigUint::from(3u32) {
            let exp = (p + 1u32) >> 2;
            self.value.modpow(&exp, p)
        } else {
            self.tonelli_shanks()
        };

        let root = FieldElement {
            ctx: Arc::clone(&self.ctx),
            value: root,
        };
        if root.is_even() == even {
            Ok(root)
        } else {
            Ok(root.negate())
        }
    }

    /// Tonelli-Shanks for moduli with `p == 1 (mod 4)`.
    fn tonelli_shanks(&self) -> BigUint {
        let p = &self.ctx.modulus;
        let one = BigUint::one();
        let p_minus_1 = p - &one;

        // Factor p - 1 = q * 2^s with q odd.
        let mut q = p_minus_1.clone();
        let mut s = 0u32;
        while q.is_even() {
            q >>= 1;
            s += 1;
        }

        // Find a quadratic non-residue z.
        let half = &p_minus_1 >> 1;
        let mut z = BigUint::from(2u32);
        while z.modpow(&half, p) != p_minus_1 {
            z += 1u32;
        }

        let mut m = s;
        let mut c = z.modpow(&q, p);
        let mut t = self.value.modpow(&q, p);
        let mut r = self.value.modpow(&((&q + &one) >> 1), p);

        while t != one {
            // Least i with t^(2^i) == 1.
            let mut i = 0u32;
            let mut t2 = t.clone();
            while t2 != one {
                t2 = (&t2 * &t2) % p;
                i += 1;
            }

            let mut b = c.clone();
            for _ in 0..(m - i - 1) {
                b = (&b * &b) % p;
            }

            m = i;
            c = (&b * &b) % p;
            t = (&t * &c) % p;
            r = (&r * &b) % p;
        }

        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    fn ctx(p: u64) -> Arc<FieldContext> {
        FieldContext::new(BigUint::from_u64(p).unwrap())
    }

    fn el(ctx: &Arc<FieldContext>, v: u64) -> FieldElement {
        FieldElement::new(ctx, BigUint::from_u64(v).unwrap())
    }

    #[test]
    fn test_construction_reduces() {
        let f = ctx(7);
        assert_eq!(el(&f, 10), el(&f, 3));
    }

    #[test]
    fn test_arithmetic_closed_over_field() {
        let f = ctx(23);
        let a = el(&f, 18);
        let b = el(&f, 9);
        assert_eq!(a.add(&b).unwrap(), el(&f, 4));
        assert_eq!(b.sub(&a).unwrap(), el(&f, 14));
        assert_eq!(a.mul(&b).unwrap(), el(&f, 1));
        assert_eq!(a.div(&b).unwrap(), a.mul(&b.inverse().unwrap()).unwrap());
    }

    #[test]
    fn test_cross_context_is_error() {
        let a = el(&ctx(23), 5);
        let b = el(&ctx(29), 5);
        assert_eq!(a.add(&b), Err(CryptoError::FieldContextMismatch));
        assert_eq!(a.mul(&b), Err(CryptoError::FieldContextMismatch));
    }

    #[test]
    fn test_negate_and_inverse() {
        let f = ctx(23);
        let a = el(&f, 18);
        assert_eq!(a.add(&a.negate()).unwrap(), el(&f, 0));
        assert_eq!(a.mul(&a.inverse().unwrap()).unwrap(), el(&f, 1));
        assert_eq!(el(&f, 0).negate(), el(&f, 0));
    }

    #[test]
    fn test_sqrt_fast_path_p_3_mod_4() {
        // 23 == 3 (mod 4); 18 = 8^2 mod 23
        let f = ctx(23);
        let a = el(&f, 18);
        let even = a.sqrt(true).unwrap();
        let odd = a.sqrt(false).unwrap();
        assert_eq!(even.square(), a);
        assert_eq!(odd.square(), a);
        assert!(even.is_even());
        assert!(!odd.is_even());
        assert_eq!(even.negate(), odd);
    }

    #[test]
    fn test_sqrt_tonelli_shanks_p_1_mod_4() {
        // 13 == 1 (mod 4); 10 = 6^2 mod 13
        let f = ctx(13);
        let a = el(&f, 10);
        let root = a.sqrt(true).unwrap();
        assert_eq!(root.square(), a);
        assert!(root.is_even());
    }

    #[test]
    fn test_sqrt_non_residue() {
        // 5 is a non-residue mod 23
        let f = ctx(23);
        assert_eq!(el(&f, 5).sqrt(true), Err(CryptoError::NoSquareRoot));
    }

    #[test]
    fn test_pow_negative_exponent() {
        let f = ctx(23);
        let a = el(&f, 18);
        let result = a.pow(&BigInt::from(-1)).unwrap();
        assert_eq!(result, a.inverse().unwrap());
    }

    #[test]
    fn test_to_bytes_be_fixed_width() {
        let f = FieldContext::new(BigUint::from_u64(1).unwrap() << 63);
        let a = FieldElement::new(&f, BigUint::from_u64(0xFF).unwrap());
        let bytes = a.to_bytes_be();
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[7], 0xFF);
        assert!(bytes[..7].iter().all(|&b| b == 0));
    }
}
