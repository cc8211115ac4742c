//! Modular arithmetic primitives shared by both moduli.
//!
//! Everything here works on raw big integers; the field layer wraps these
//! with context tagging.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, Zero};

use crate::error::{CryptoError, Result};

/// Extended Euclidean algorithm.
///
/// Returns `(g, x, y)` with `a*x + b*y = g = gcd(a, b)`.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;
        let tmp = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, tmp);
        let tmp = &old_x - &q * &x;
        old_x = std::mem::replace(&mut x, tmp);
        let tmp = &old_y - &q * &y;
        old_y = std::mem::replace(&mut y, tmp);
    }

    (old_r, old_x, old_y)
}

/// Normalize any signed integer into `[0, m)`.
pub fn normalize(a: &BigInt, m: &BigUint) -> BigUint {
    let m_signed = BigInt::from(m.clone());
    let mut r = a % &m_signed;
    if r.is_negative() {
        r += &m_signed;
    }
    r.to_biguint().expect("normalized value is non-negative")
}

/// Modular inverse: `b` with `a*b == 1 (mod m)`.
///
/// Errors when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    if a.is_zero() {
        return Err(CryptoError::DivisionByZeroScalar);
    }
    let (g, x, _) = extended_gcd(&BigInt::from(a.clone()), &BigInt::from(m.clone()));
    if !g.is_one() {
        return Err(CryptoError::NotInvertible);
    }
    Ok(normalize(&x, m))
}

/// Modular exponentiation with signed exponents.
///
/// A negative exponent inverts the base exactly once, then proceeds with
/// ordinary square-and-multiply on the magnitude.
pub fn mod_exp(base: &BigUint, exponent: &BigInt, m: &BigUint) -> Result<BigUint> {
    let (base, exponent) = if exponent.is_negative() {
        (mod_inverse(base, m)?, -exponent)
    } else {
        (base % m, exponent.clone())
    };
    let exponent = exponent
        .to_biguint()
        .expect("negated exponent is non-negative");
    Ok(base.modpow(&exponent, m))
}
