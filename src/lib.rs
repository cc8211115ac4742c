//! Forensic analysis of ECDSA signatures in Bitcoin-style transactions.
//!
//! This library detects exploitable weaknesses in signature corpora: reused
//! signing nonces (which leak the private key), non-canonical DER encodings,
//! semantically-malleable variants, and abnormal sighash usage. The
//! cryptographic engine underneath is built from scratch: modular
//! arithmetic, two tagged prime fields, the secp256k1 group law, and the
//! ECDSA recovery algebra.

pub mod curve;
pub mod der;
pub mod ecdsa;
pub mod error;
pub mod field;
pub mod math;
pub mod provider;
pub mod scanner;
pub mod signature;
pub mod variants;

pub use curve::{Curve, Point};
pub use error::CryptoError;
pub use field::{FieldContext, FieldElement};
pub use scanner::{scan_for_vulnerabilities, Finding, ScanReport};
pub use signature::{Signature, SignatureInput};
pub use variants::{generate_variants, DerVariant};
