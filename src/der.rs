//! Strict DER codec for ECDSA signatures.
//!
//! Layout: `30 LEN 02 RLEN R 02 SLEN S [trailing]`. Structural damage
//! (wrong tag, truncation, a declared length overrunning the buffer) is a
//! [`CryptoError::MalformedDer`] with the offending byte offset; everything
//! the looser BER rules would tolerate (long-form lengths, surplus padding,
//! trailing bytes) decodes but is reported on the defect list. A decode is
//! canonical iff that list is empty.

use num_bigint::BigUint;

use crate::error::{CryptoError, Result};

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

/// Which of the two INTEGER fields a defect refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerField {
    R,
    S,
}

impl std::fmt::Display for IntegerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegerField::R => write!(f, "R"),
            IntegerField::S => write!(f, "S"),
        }
    }
}

/// A deviation from canonical DER that was still decodable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerDefect {
    /// Bytes remain after the encoded sequence.
    TrailingBytes(usize),
    /// A length that fits in one byte was written in long form (BER-legal).
    LongFormLength { offset: usize },
    /// More padding than the single 0x00 canonical DER permits.
    ExcessPadding(IntegerField),
    /// High bit set without a 0x00 pad; the value reads as negative.
    NegativeInteger(IntegerField),
    /// Zero-length INTEGER payload.
    EmptyInteger(IntegerField),
}

impl std::fmt::Display for DerDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerDefect::TrailingBytes(n) => write!(f, "{n} trailing byte(s) after sequence"),
            DerDefect::LongFormLength { offset } => {
                write!(f, "long-form length encoding at offset {offset}")
            }
            DerDefect::ExcessPadding(field) => {
                write!(f, "superfluous leading zero in {field}")
            }
            DerDefect::NegativeInteger(field) => {
                write!(f, "{field} reads as negative (missing sign padding)")
            }
            DerDefect::EmptyInteger(field) => write!(f, "empty {field} integer"),
        }
    }
}

/// Result of a successful structural decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDer {
    /// R payload as encoded (padding included).
    pub r: Vec<u8>,
    /// S payload as encoded (padding included).
    pub s: Vec<u8>,
    /// Canonicality defects; empty for strictly canonical input.
    pub defects: Vec<DerDefect>,
    /// Bytes covered by the sequence itself, excluding trailing bytes.
    pub consumed: usize,
}

impl DecodedDer {
    pub fn r_value(&self) -> BigUint {
        BigUint::from_bytes_be(&self.r)
    }

    pub fn s_value(&self) -> BigUint {
        BigUint::from_bytes_be(&self.s)
    }
}

fn malformed(offset: usize, reason: &str) -> CryptoError {
    CryptoError::MalformedDer {
        offset,
        reason: reason.to_string(),
    }
}

/// Parse one length field. Long-form lengths are accepted and recorded as a
/// defect; a declared count past the buffer is structural.
fn parse_length(
    bytes: &[u8],
    offset: usize,
    defects: &mut Vec<DerDefect>,
) -> Result<(usize, usize)> {
    let first = *bytes
        .get(offset)
        .ok_or_else(|| malformed(offset, "truncated before length byte"))?;

    if first & 0x80 == 0 {
        return Ok((usize::from(first), 1));
    }

    let count = usize::from(first & 0x7f);
    if count == 0 || count > 4 {
        return Err(malformed(offset, "unsupported long-form length"));
    }
    if bytes.len() < offset + 1 + count {
        return Err(malformed(offset, "truncated long-form length"));
    }
    let mut value = 0usize;
    for &b in &bytes[offset + 1..offset + 1 + count] {
        value = (value << 8) | usize::from(b);
    }
    defects.push(DerDefect::LongFormLength { offset });
    Ok((value, 1 + count))
}

fn parse_integer(
    bytes: &[u8],
    offset: usize,
    content_end: usize,
    field: IntegerField,
    defects: &mut Vec<DerDefect>,
) -> Result<(Vec<u8>, usize)> {
    let tag = *bytes
        .get(offset)
        .ok_or_else(|| malformed(offset, "truncated before integer tag"))?;
    if tag != INTEGER_TAG {
        return Err(malformed(offset, "expected INTEGER tag 0x02"));
    }

    let (len, len_bytes) = parse_length(bytes, offset + 1, defects)?;
    let payload_start = offset + 1 + len_bytes;
    let payload_end = payload_start + len;
    if payload_end > content_end {
        return Err(malformed(
            offset + 1,
            "integer length exceeds sequence content",
        ));
    }

    let payload = &bytes[payload_start..payload_end];
    if payload.is_empty() {
        defects.push(DerDefect::EmptyInteger(field));
    } else {
        if payload[0] & 0x80 != 0 {
            defects.push(DerDefect::NegativeInteger(field));
        }
        if payload[0] == 0x00 && (payload.len() == 1 || payload[1] & 0x80 == 0) {
            // A lone 0x00 pad is only canonical when the next byte needs it.
            if payload.len() > 1 {
                defects.push(DerDefect::ExcessPadding(field));
            }
        }
    }

    Ok((payload.to_vec(), payload_end))
}

/// Strict structural decode with canonicality reporting.
pub fn decode(bytes: &[u8]) -> Result<DecodedDer> {
    let mut defects = Vec::new();

    let tag = *bytes
        .get(0)
        .ok_or_else(|| malformed(0, "empty buffer"))?;
    if tag != SEQUENCE_TAG {
        return Err(malformed(0, "expected SEQUENCE tag 0x30"));
    }

    let (content_len, len_bytes) = parse_length(bytes, 1, &mut defects)?;
    let content_start = 1 + len_bytes;
    let content_end = content_start + content_len;
    if content_end > bytes.len() {
        return Err(malformed(1, "declared length exceeds buffer"));
    }

    let (r, after_r) = parse_integer(bytes, content_start, content_end, IntegerField::R, &mut defects)?;
    let (s, after_s) = parse_integer(bytes, after_r, content_end, IntegerField::S, &mut defects)?;

    if after_s != content_end {
        return Err(malformed(
            after_s,
            "sequence length does not match encoded integers",
        ));
    }

    let trailing = bytes.len() - content_end;
    if trailing > 0 {
        defects.push(DerDefect::TrailingBytes(trailing));
    }

    Ok(DecodedDer {
        r,
        s,
        defects,
        consumed: content_end,
    })
}

/// True iff the bytes decode and carry zero structural defects.
///
/// This is the byte-level judgment only. Whole-signature canonicality also
/// demands low-S, which needs the group order; see `variants::is_canonical`
/// and `Signature::is_canonical`.
pub fn is_canonical(bytes: &[u8]) -> bool {
    matches!(decode(bytes), Ok(decoded) if decoded.defects.is_empty())
}

/// Minimal positive-integer payload: no superfluous zeros, one 0x00 pad when
/// the leading byte would read as a sign bit.
fn encode_integer_payload(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        let mut padded = Vec::with_capacity(bytes.len() + 1);
        padded.push(0x00);
        padded.extend_from_slice(&bytes);
        padded
    } else {
        bytes
    }
}

/// Canonical DER encoding of an (r, s) pair.
pub fn encode(r: &BigUint, s: &BigUint) -> Vec<u8> {
    let r_payload = encode_integer_payload(r);
    let s_payload = encode_integer_payload(s);
    let content_len = 2 + r_payload.len() + 2 + s_payload.len();
    // Short-form lengths cover every group-order-sized scalar; anything
    // bigger would need long-form and cannot be a signature component.
    debug_assert!(
        content_len < 0x80,
        "integers too large for short-form DER lengths"
    );

    let mut out = Vec::with_capacity(2 + content_len);
    out.push(SEQUENCE_TAG);
    out.push(content_len as u8);
    out.push(INTEGER_TAG);
    out.push(r_payload.len() as u8);
    out.extend_from_slice(&r_payload);
    out.push(INTEGER_TAG);
    out.push(s_payload.len() as u8);
    out.extend_from_slice(&s_payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Num;

    const GOLDEN: &str = "304402200f13c7c741321a95510ba98792bc9050efdce2e422be4610f162449adce92a4702200b4cc3447a2793c4598e5829827f38c67f72e4c3d4688019cd94066b9e7df6b9";

    fn golden_bytes() -> Vec<u8> {
        hex::decode(GOLDEN).unwrap()
    }

    #[test]
    fn test_decode_canonical() {
        let decoded = decode(&golden_bytes()).unwrap();
        assert!(decoded.defects.is_empty());
        assert_eq!(
            hex::encode(&decoded.r),
            "0f13c7c741321a95510ba98792bc9050efdce2e422be4610f162449adce92a47"
        );
        assert_eq!(
            hex::encode(&decoded.s),
            "0b4cc3447a2793c4598e5829827f38c67f72e4c3d4688019cd94066b9e7df6b9"
        );
        assert_eq!(decoded.consumed, golden_bytes().len());
        assert!(is_canonical(&golden_bytes()));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let r = BigUint::from_str_radix(
            "eb5ed17e3027c9c4c87ffdb294a84ff725ba2b5b2bf72d30f98334ee68624621",
            16,
        )
        .unwrap();
        let s = BigUint::from_str_radix("1234abcd", 16).unwrap();
        let encoded = encode(&r, &s);
        assert!(is_canonical(&encoded));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.r_value(), r);
        assert_eq!(decoded.s_value(), s);
        // High-bit r payload carries exactly one sign pad.
        assert_eq!(decoded.r.len(), 33);
        assert_eq!(decoded.r[0], 0x00);
    }

    #[test]
    fn test_wrong_outer_tag() {
        let mut bytes = golden_bytes();
        bytes[0] = 0x31;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDer { offset: 0, .. }));
    }

    #[test]
    fn test_truncated_buffer() {
        let bytes = golden_bytes();
        let err = decode(&bytes[..10]).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDer { .. }));
    }

    #[test]
    fn test_declared_length_exceeds_buffer() {
        let mut bytes = golden_bytes();
        bytes[1] += 4;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDer { offset: 1, .. }));
    }

    #[test]
    fn test_declared_length_short_of_integers() {
        // Shrinking the outer length truncates S mid-payload.
        let mut bytes = golden_bytes();
        bytes[1] -= 1;
        bytes.pop();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDer { .. }));
    }

    #[test]
    fn test_trailing_bytes_reported_not_fatal() {
        let mut bytes = golden_bytes();
        bytes.extend_from_slice(&[0xde, 0xad]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.defects, vec![DerDefect::TrailingBytes(2)]);
        assert!(!is_canonical(&bytes));
    }

    #[test]
    fn test_long_form_outer_length_is_defect() {
        let canonical = golden_bytes();
        let mut bytes = vec![SEQUENCE_TAG, 0x81, canonical[1]];
        bytes.extend_from_slice(&canonical[2..]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(
            decoded.defects,
            vec![DerDefect::LongFormLength { offset: 1 }]
        );
        assert!(!is_canonical(&bytes));
    }

    #[test]
    fn test_excess_padding_is_defect() {
        // 3008 0203 00007f 0201 01 -- R padded although 0x7f needs no pad.
        let bytes = hex::decode("3008020300007f020101").unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.defects, vec![DerDefect::ExcessPadding(IntegerField::R)]);
    }

    #[test]
    fn test_single_pad_for_high_bit_is_canonical() {
        // 3007 0202 0080 0201 01 -- 0x80 needs exactly one pad byte.
        let bytes = hex::decode("300702020080020101").unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.defects.is_empty());
    }

    #[test]
    fn test_negative_integer_is_defect() {
        // 3006 0201 80 0201 01 -- unpadded 0x80 reads as negative.
        let bytes = hex::decode("3006020180020101").unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(
            decoded.defects,
            vec![DerDefect::NegativeInteger(IntegerField::R)]
        );
    }

    #[test]
    fn test_empty_integer_is_defect() {
        // 3005 0200 0201 01
        let bytes = hex::decode("30050200020101").unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(
            decoded.defects,
            vec![DerDefect::EmptyInteger(IntegerField::R)]
        );
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "short-form"))]
    fn test_encode_rejects_oversized_integers() {
        let huge = BigUint::from(1u32) << 1024;
        let encoded = encode(&huge, &huge);
        // Release builds fall through; the output must still not be a
        // silently corrupt short-form sequence accepted by decode.
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn test_integer_tag_wrong() {
        let mut bytes = golden_bytes();
        bytes[2] = 0x03;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedDer { offset: 2, .. }));
    }
}
