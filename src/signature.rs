//! Signature data types and the r-value collision index.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::der::{self, DerDefect};
use crate::error::{CryptoError, Result};
use crate::field::FieldElement;

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

/// One raw per-input record as supplied by the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInput {
    /// DER bytes as hex, optionally with the Bitcoin sighash byte appended.
    pub der: String,
    /// 32-byte message digest as hex, when the preimage was reconstructable.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub z: Option<String>,
    /// Signer's public key as hex (compressed or uncompressed), if known.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub pubkey: Option<String>,
    /// Explicit sighash type; overrides any byte found trailing the DER.
    #[serde(default)]
    pub sighash: Option<u8>,
}

/// A decoded signature, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// r lifted into the scalar field.
    pub r: FieldElement,
    /// s lifted into the scalar field.
    pub s: FieldElement,
    /// DER bytes with any appended sighash byte stripped.
    pub der: Vec<u8>,
    pub sighash: u8,
    pub pubkey: Option<Vec<u8>>,
    /// Message digest in the scalar field, when available.
    pub z: Option<FieldElement>,
    /// Canonicality defects found while decoding the DER bytes.
    pub defects: Vec<DerDefect>,
}

pub const SIGHASH_ALL: u8 = 0x01;

fn normalize_hex(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

impl Signature {
    /// Decode one input record against a curve context.
    ///
    /// A lone trailing byte after well-formed DER is taken as the appended
    /// Bitcoin sighash unless the record carries an explicit one.
    pub fn from_input(curve: &Curve, input: &SignatureInput) -> Result<Signature> {
        let raw = hex::decode(normalize_hex(&input.der))?;
        let decoded = der::decode(&raw)?;

        let trailing = raw.len() - decoded.consumed;
        let (body, sighash, defects) = if input.sighash.is_none() && trailing == 1 {
            let defects = decoded
                .defects
                .iter()
                .filter(|d| !matches!(d, DerDefect::TrailingBytes(_)))
                .cloned()
                .collect();
            (raw[..decoded.consumed].to_vec(), raw[decoded.consumed], defects)
        } else {
            (raw.clone(), input.sighash.unwrap_or(SIGHASH_ALL), decoded.defects.clone())
        };

        let pubkey = match &input.pubkey {
            Some(pk) => Some(hex::decode(normalize_hex(pk).to_lowercase())?),
            None => None,
        };
        let z = match &input.z {
            Some(z) => {
                let bytes = hex::decode(normalize_hex(z))?;
                if bytes.len() != 32 {
                    return Err(CryptoError::UnsupportedEncoding(format!(
                        "digest must be 32 bytes, got {}",
                        bytes.len()
                    )));
                }
                Some(curve.scalar_from_bytes(&bytes))
            }
            None => None,
        };

        Ok(Signature {
            r: curve.scalar(decoded.r_value()),
            s: curve.scalar(decoded.s_value()),
            der: body,
            sighash,
            pubkey,
            z,
            defects,
        })
    }

    /// s above n/2, i.e. the non-normalized malleability twin.
    pub fn is_high_s(&self) -> bool {
        let half = self.s.context().modulus() >> 1;
        *self.s.value() > half
    }

    /// Strict DER plus the low-S convention.
    pub fn is_canonical(&self) -> bool {
        self.defects.is_empty() && !self.is_high_s()
    }

    /// Fixed-width r bytes, the grouping key for collision detection.
    pub fn r_key(&self) -> Vec<u8> {
        self.r.to_bytes_be()
    }
}

/// Insert-only index from r-value to signature positions.
///
/// Safe to share across concurrent scans: entries are only ever appended, so
/// a coarse lock around the map is all the synchronization needed, and the
/// index can grow incrementally as new signatures arrive without
/// reprocessing prior entries.
#[derive(Debug, Default)]
pub struct RValueIndex {
    entries: Mutex<HashMap<Vec<u8>, Vec<usize>>>,
}

impl RValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature position; returns the group size after insertion.
    pub fn insert(&self, signature: &Signature, position: usize) -> usize {
        let mut entries = self.entries.lock().expect("r-value index lock");
        let group = entries.entry(signature.r_key()).or_default();
        group.push(position);
        group.len()
    }

    /// Groups with at least two members, ordered by first occurrence.
    pub fn collisions(&self) -> Vec<(Vec<u8>, Vec<usize>)> {
        let entries = self.entries.lock().expect("r-value index lock");
        let mut groups: Vec<(Vec<u8>, Vec<usize>)> = entries
            .iter()
            .filter(|(_, positions)| positions.len() >= 2)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        groups.sort_by_key(|(_, positions)| positions[0]);
        groups
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("r-value index lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
