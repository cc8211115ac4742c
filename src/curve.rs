//! Short-Weierstrass curve group over the coordinate field.
//!
//! Points are an explicit sum type: the identity carries no coordinates, an
//! affine point always carries both. The curve context is constructed
//! explicitly and passed by reference; there is no global instance.

use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Num;

use crate::error::{CryptoError, Result};
use crate::field::{FieldContext, FieldElement};

/// A point on the curve, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: FieldElement, y: FieldElement },
}

impl Point {
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// x coordinate of an affine point; `PointNotOnCurve` for infinity.
    pub fn x(&self) -> Result<&FieldElement> {
        match self {
            Point::Affine { x, .. } => Ok(x),
            Point::Infinity => Err(CryptoError::PointNotOnCurve),
        }
    }

    pub fn y(&self) -> Result<&FieldElement> {
        match self {
            Point::Affine { y, .. } => Ok(y),
            Point::Infinity => Err(CryptoError::PointNotOnCurve),
        }
    }
}

/// Immutable curve context: coordinate field, equation parameters, scalar
/// (order) field and generator. Created once, shared by reference.
pub struct Curve {
    field: Arc<FieldContext>,
    order: Arc<FieldContext>,
    a: FieldElement,
    b: FieldElement,
    generator: Point,
}

impl Curve {
    pub fn new(
        field: Arc<FieldContext>,
        order: Arc<FieldContext>,
        a: FieldElement,
        b: FieldElement,
        generator: Point,
    ) -> Result<Self> {
        let curve = Curve {
            field,
            order,
            a,
            b,
            generator,
        };
        if !curve.contains(&curve.generator)? {
            return Err(CryptoError::PointNotOnCurve);
        }
        Ok(curve)
    }

    /// The secp256k1 context: y^2 = x^3 + 7 over the SEC2 prime.
    pub fn secp256k1() -> Self {
        let p = BigUint::from_str_radix(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
            16,
        )
        .expect("secp256k1 prime");
        let n = BigUint::from_str_radix(
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
            16,
        )
        .expect("secp256k1 order");
        let gx = BigUint::from_str_radix(
            "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798",
            16,
        )
        .expect("secp256k1 gx");
        let gy = BigUint::from_str_radix(
            "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8",
            16,
        )
        .expect("secp256k1 gy");

        let field = FieldContext::new(p);
        let order = FieldContext::new(n);
        let generator = Point::Affine {
            x: FieldElement::new(&field, gx),
            y: FieldElement::new(&field, gy),
        };
        let a = FieldElement::new(&field, BigUint::from(0u32));
        let b = FieldElement::new(&field, BigUint::from(7u32));

        Curve::new(field, order, a, b, generator).expect("secp256k1 parameters are consistent")
    }

    pub fn field(&self) -> &Arc<FieldContext> {
        &self.field
    }

    /// Scalar field (modulus = group order).
    pub fn order(&self) -> &Arc<FieldContext> {
        &self.order
    }

    pub fn generator(&self) -> &Point {
        &self.generator
    }

    /// Lift an integer into the scalar field.
    pub fn scalar(&self, value: BigUint) -> FieldElement {
        FieldElement::new(&self.order, value)
    }

    pub fn scalar_from_bytes(&self, bytes: &[u8]) -> FieldElement {
        FieldElement::from_bytes_be(&self.order, bytes)
    }

    /// Whether the point satisfies y^2 = x^3 + a*x + b (infinity counts).
    pub fn contains(&self, point: &Point) -> Result<bool> {
        match point {
            Point::Infinity => Ok(true),
            Point::Affine { x, y } => {
                let rhs = x.cube().add(&self.a.mul(x)?)?.add(&self.b)?;
                Ok(y.square() == rhs)
            }
        }
    }

    pub fn negate(&self, point: &Point) -> Point {
        match point {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: y.negate(),
            },
        }
    }

    /// Chord-and-tangent addition.
    pub fn add(&self, p: &Point, q: &Point) -> Result<Point> {
        let (x1, y1) = match p {
            Point::Infinity => return Ok(q.clone()),
            Point::Affine { x, y } => (x, y),
        };
        let (x2, y2) = match q {
            Point::Infinity => return Ok(p.clone()),
            Point::Affine { x, y } => (x, y),
        };

        let slope = if x1 == x2 {
            if y1 != y2 || y1.is_zero() {
                // Vertical chord, or tangent at a 2-torsion point.
                return Ok(Point::Infinity);
            }
            // Tangent: (3x^2 + a) / 2y
            let three = FieldElement::new(&self.field, BigUint::from(3u32));
            let two = FieldElement::new(&self.field, BigUint::from(2u32));
            let numer = three.mul(&x1.square())?.add(&self.a)?;
            let denom = two.mul(y1)?;
            numer.div(&denom)?
        } else {
            // Chord: (y2 - y1) / (x2 - x1)
            y2.sub(y1)?.div(&x2.sub(x1)?)?
        };

        let x3 = slope.square().sub(x1)?.sub(x2)?;
        let y3 = slope.mul(&x1.sub(&x3)?)?.sub(y1)?;
        Ok(Point::Affine { x: x3, y: y3 })
    }

    pub fn double(&self, p: &Point) -> Result<Point> {
        self.add(p, p)
    }

    /// Double-and-add over the bits of the scalar's residue.
    pub fn mul(&self, scalar: &FieldElement, point: &Point) -> Result<Point> {
        let mut result = Point::Infinity;
        let mut addend = point.clone();
        let k = scalar.value().clone();
        for i in 0..k.bits() {
            if k.bit(i) {
                result = self.add(&result, &addend)?;
            }
            addend = self.double(&addend)?;
        }
        Ok(result)
    }

    pub fn mul_generator(&self, scalar: &FieldElement) -> Result<Point> {
        self.mul(scalar, &self.generator)
    }

    /// Recover the affine point with the given x and y parity.
    pub fn decompress(&self, x: &BigUint, even: bool) -> Result<Point> {
        let x = FieldElement::new(&self.field, x.clone());
        let rhs = x.cube().add(&self.a.mul(&x)?)?.add(&self.b)?;
        let y = rhs.sqrt(even)?;
        Ok(Point::Affine { x, y })
    }

    /// SEC1 compressed form: parity prefix (0x02/0x03) + big-endian x.
    pub fn compress(&self, point: &Point) -> Result<Vec<u8>> {
        let x = point.x()?;
        let y = point.y()?;
        let mut out = Vec::with_capacity(1 + self.field.byte_len());
        out.push(if y.is_even() { 0x02 } else { 0x03 });
        out.extend_from_slice(&x.to_bytes_be());
        Ok(out)
    }

    /// SEC1 uncompressed form: 0x04 + x + y, each zero-padded.
    pub fn serialize_uncompressed(&self, point: &Point) -> Result<Vec<u8>> {
        let x = point.x()?;
        let y = point.y()?;
        let mut out = Vec::with_capacity(1 + 2 * self.field.byte_len());
        out.push(0x04);
        out.extend_from_slice(&x.to_bytes_be());
        out.extend_from_slice(&y.to_bytes_be());
        Ok(out)
    }
}
