//! Batch vulnerability scanner.
//!
//! Pure function over an ordered batch of signature records. Detections are
//! independent and composable; a record that cannot be decoded becomes its
//! own could-not-analyze entry and never aborts the rest of the batch.

use crate::curve::Curve;
use crate::ecdsa::{self, NonceReuseRecovery};
use crate::field::FieldElement;
use crate::signature::{RValueIndex, Signature, SignatureInput, SIGHASH_ALL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    NonceReuse,
    HighS,
    NonCanonicalDer,
    AbnormalSighash,
    SharedPubkey,
    Unanalyzable,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::NonceReuse => "nonce-reuse",
            FindingKind::HighS => "high-s",
            FindingKind::NonCanonicalDer => "non-canonical-der",
            FindingKind::AbnormalSighash => "abnormal-sighash",
            FindingKind::SharedPubkey => "shared-pubkey",
            FindingKind::Unanalyzable => "could-not-analyze",
        }
    }

    /// Whether this kind counts as an actual vulnerability.
    pub fn is_vulnerability(&self) -> bool {
        !matches!(self, FindingKind::Unanalyzable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// High when the independent cross-check (and the known pubkey, if any)
/// corroborates the recovered key; Low when evidence disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    pub nonce: FieldElement,
    pub private_key: FieldElement,
    pub confidence: Confidence,
}

/// One independently-actionable detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    /// Batch positions of the affected signatures.
    pub indices: Vec<usize>,
    pub detail: String,
    pub recovered_key: Option<RecoveredKey>,
}

/// Scan output, partitioned into analyzed and could-not-analyze sets.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub analyzed: Vec<usize>,
    pub unanalyzable: Vec<(usize, String)>,
    pub total: usize,
}

impl ScanReport {
    pub fn vulnerability_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.kind.is_vulnerability())
            .count()
    }

    pub fn keys_recovered(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.recovered_key.is_some())
            .count()
    }
}

/// Run every detection over the batch.
pub fn scan_for_vulnerabilities(curve: &Curve, inputs: &[SignatureInput]) -> ScanReport {
    let mut decoded: Vec<Option<Signature>> = Vec::with_capacity(inputs.len());
    let mut analyzed = Vec::new();
    let mut unanalyzable = Vec::new();

    let index = RValueIndex::new();
    for (i, input) in inputs.iter().enumerate() {
        match Signature::from_input(curve, input) {
            Ok(sig) => {
                index.insert(&sig, i);
                analyzed.push(i);
                decoded.push(Some(sig));
            }
            Err(e) => {
                unanalyzable.push((i, e.to_string()));
                decoded.push(None);
            }
        }
    }

    let mut findings = Vec::new();

    for (_, positions) in index.collisions() {
        findings.push(nonce_reuse_finding(curve, &decoded, &positions));
    }

    findings.extend(shared_pubkey_findings(&decoded));

    for (i, sig) in decoded.iter().enumerate() {
        let Some(sig) = sig else { continue };
        if sig.is_high_s() {
            findings.push(Finding {
                kind: FindingKind::HighS,
                severity: Severity::Low,
                indices: vec![i],
                detail: "s exceeds n/2; not the low-S malleability-normalized form".to_string(),
                recovered_key: None,
            });
        }
        if !sig.defects.is_empty() {
            let listed: Vec<String> = sig.defects.iter().map(|d| d.to_string()).collect();
            findings.push(Finding {
                kind: FindingKind::NonCanonicalDer,
                severity: Severity::Low,
                indices: vec![i],
                detail: listed.join("; "),
                recovered_key: None,
            });
        }
        if sig.sighash != SIGHASH_ALL {
            findings.push(Finding {
                kind: FindingKind::AbnormalSighash,
                severity: Severity::Medium,
                indices: vec![i],
                detail: format!(
                    "sighash 0x{:02x} does not commit to the whole transaction",
                    sig.sighash
                ),
                recovered_key: None,
            });
        }
    }

    for (i, reason) in &unanalyzable {
        findings.push(Finding {
            kind: FindingKind::Unanalyzable,
            severity: Severity::Info,
            indices: vec![*i],
            detail: reason.clone(),
            recovered_key: None,
        });
    }

    ScanReport {
        findings,
        analyzed,
        unanalyzable,
        total: inputs.len(),
    }
}

fn nonce_reuse_finding(
    curve: &Curve,
    decoded: &[Option<Signature>],
    positions: &[usize],
) -> Finding {
    let sigs: Vec<&Signature> = positions
        .iter()
        .filter_map(|&i| decoded[i].as_ref())
        .collect();

    // Try every pair carrying digests; the first recoverable one wins.
    for (a_pos, a) in sigs.iter().enumerate() {
        let Some(z1) = &a.z else { continue };
        for b in sigs.iter().skip(a_pos + 1) {
            let Some(z2) = &b.z else { continue };
            if let Ok(recovery) =
                ecdsa::recover_from_nonce_reuse(curve, &a.r, &a.s, &b.s, z1, z2)
            {
                let confidence = confidence_for(curve, &sigs, &recovery);
                let detail = if recovery.corroborated {
                    format!(
                        "{} signatures share r = {}",
                        positions.len(),
                        hex::encode(a.r_key())
                    )
                } else {
                    format!(
                        "{} signatures share r = {}; recovered key does not verify \
                         both members, likely a bare r collision",
                        positions.len(),
                        hex::encode(a.r_key())
                    )
                };
                return Finding {
                    kind: FindingKind::NonceReuse,
                    severity: Severity::Critical,
                    indices: positions.to_vec(),
                    detail,
                    recovered_key: Some(RecoveredKey {
                        nonce: recovery.nonce,
                        private_key: recovery.private_key,
                        confidence,
                    }),
                };
            }
        }
    }

    let detail = if sigs.iter().filter(|s| s.z.is_some()).count() < 2 {
        "r-value collision; key recovery needs message digests for at least two members"
            .to_string()
    } else {
        "r-value collision; no recoverable pair (all candidate pairs share s)".to_string()
    };

    Finding {
        kind: FindingKind::NonceReuse,
        severity: Severity::High,
        indices: positions.to_vec(),
        detail,
        recovered_key: None,
    }
}

/// High only when the recovered key verifies both members and no supplied
/// public key (compressed or uncompressed) contradicts it.
fn confidence_for(curve: &Curve, sigs: &[&Signature], recovery: &NonceReuseRecovery) -> Confidence {
    if !recovery.corroborated {
        return Confidence::Low;
    }
    let Ok(derived) = ecdsa::public_key(curve, &recovery.private_key) else {
        return Confidence::Low;
    };
    let (Ok(compressed), Ok(uncompressed)) = (
        curve.compress(&derived),
        curve.serialize_uncompressed(&derived),
    ) else {
        return Confidence::Low;
    };
    for sig in sigs {
        if let Some(expected) = &sig.pubkey {
            if *expected != compressed && *expected != uncompressed {
                return Confidence::Low;
            }
        }
    }
    Confidence::High
}

/// One key signing multiple inputs raises reuse risk even without a
/// collision in the batch.
fn shared_pubkey_findings(decoded: &[Option<Signature>]) -> Vec<Finding> {
    let mut by_pubkey: Vec<(Vec<u8>, Vec<usize>)> = Vec::new();
    for (i, sig) in decoded.iter().enumerate() {
        let Some(sig) = sig else { continue };
        let Some(pubkey) = &sig.pubkey else { continue };
        match by_pubkey.iter_mut().find(|(k, _)| k == pubkey) {
            Some((_, positions)) => positions.push(i),
            None => by_pubkey.push((pubkey.clone(), vec![i])),
        }
    }

    by_pubkey
        .into_iter()
        .filter(|(_, positions)| positions.len() >= 2)
        .map(|(pubkey, indices)| Finding {
            kind: FindingKind::SharedPubkey,
            severity: Severity::Medium,
            indices,
            detail: format!("public key {} signs multiple inputs", hex::encode(pubkey)),
            recovered_key: None,
        })
        .collect()
}
