//! Deterministic malleability-variant catalogue.
//!
//! From one decodable signature this produces the canonical baseline plus a
//! fixed, ordered set of alternate encodings: the high-S twin and the classic
//! BER-not-DER mutations. Verifiers that accept any of the mutations accept
//! multiple byte representations of one signature.

use num_bigint::BigUint;

use crate::curve::Curve;
use crate::der;
use crate::error::Result;

/// Category of a generated encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Canonical,
    HighS,
    ExtraZeroR,
    ExtraZeroS,
    LongFormLength,
    TrailingGarbage,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Canonical => "canonical",
            VariantKind::HighS => "high-s",
            VariantKind::ExtraZeroR => "extra-zero-r",
            VariantKind::ExtraZeroS => "extra-zero-s",
            VariantKind::LongFormLength => "long-form-length",
            VariantKind::TrailingGarbage => "trailing-garbage",
        }
    }
}

/// One generated encoding with its rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerVariant {
    pub kind: VariantKind,
    pub bytes: Vec<u8>,
    pub description: String,
}

/// Canonicality of a full signature encoding: strict DER and low-S.
///
/// [`der::is_canonical`] only judges byte structure; the low-S rule needs
/// the group order, so the order-aware check lives here. Every mutation in
/// the catalogue, the high-S twin included, fails this predicate.
pub fn is_canonical(curve: &Curve, bytes: &[u8]) -> bool {
    match der::decode(bytes) {
        Ok(decoded) => {
            decoded.defects.is_empty() && decoded.s_value() <= (curve.order().modulus() >> 1)
        }
        Err(_) => false,
    }
}

fn integer_payload(value: &BigUint, extra_zero: bool) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut payload = Vec::with_capacity(raw.len() + 2);
    if extra_zero {
        payload.push(0x00);
    }
    if raw[0] & 0x80 != 0 {
        payload.push(0x00);
    }
    payload.extend_from_slice(&raw);
    payload
}

fn sequence(r_payload: &[u8], s_payload: &[u8], long_form: bool) -> Vec<u8> {
    let content_len = 2 + r_payload.len() + 2 + s_payload.len();
    let mut out = Vec::with_capacity(3 + content_len);
    out.push(0x30);
    if long_form {
        out.push(0x81);
    }
    out.push(content_len as u8);
    out.push(0x02);
    out.push(r_payload.len() as u8);
    out.extend_from_slice(r_payload);
    out.push(0x02);
    out.push(s_payload.len() as u8);
    out.extend_from_slice(s_payload);
    out
}

/// Generate the ordered catalogue for one signature's DER bytes.
///
/// The input must at least decode structurally; it is first normalized to
/// the canonical baseline, so a slightly off input still yields the same
/// deterministic catalogue as its canonical form.
pub fn generate_variants(curve: &Curve, der_bytes: &[u8]) -> Result<Vec<DerVariant>> {
    let decoded = der::decode(der_bytes)?;
    let r = decoded.r_value();
    let s = decoded.s_value();

    // s' = n - s in the scalar field, not a byte-level approximation.
    let s_high = curve.scalar(s.clone()).negate();

    let canonical = der::encode(&r, &s);
    let mut trailing = canonical.clone();
    trailing.extend_from_slice(&[0x00, 0xff]);

    Ok(vec![
        DerVariant {
            kind: VariantKind::Canonical,
            bytes: canonical,
            description: "canonical baseline: strict DER, minimal lengths".to_string(),
        },
        DerVariant {
            kind: VariantKind::HighS,
            bytes: der::encode(&r, s_high.value()),
            description: "high-S twin: s' = n - s verifies under loose checks".to_string(),
        },
        DerVariant {
            kind: VariantKind::ExtraZeroR,
            bytes: sequence(
                &integer_payload(&r, true),
                &integer_payload(&s, false),
                false,
            ),
            description: "extra leading zero in R: BER-tolerated, DER-illegal".to_string(),
        },
        DerVariant {
            kind: VariantKind::ExtraZeroS,
            bytes: sequence(
                &integer_payload(&r, false),
                &integer_payload(&s, true),
                false,
            ),
            description: "extra leading zero in S: BER-tolerated, DER-illegal".to_string(),
        },
        DerVariant {
            kind: VariantKind::LongFormLength,
            bytes: sequence(
                &integer_payload(&r, false),
                &integer_payload(&s, false),
                true,
            ),
            description: "long-form outer length for a short-form-expressible size".to_string(),
        },
        DerVariant {
            kind: VariantKind::TrailingGarbage,
            bytes: trailing,
            description: "valid DER followed by garbage bytes".to_string(),
        },
    ])
}
