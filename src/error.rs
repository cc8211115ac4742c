//! Error types for the signature analysis core.
//!
//! Every variant is a recoverable condition: a bad signature in a batch
//! degrades to a reported failure for that item while the rest of the scan
//! proceeds.

/// Errors produced by the field, curve, ECDSA and DER layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The DER structure itself could not be parsed.
    #[error("malformed DER at offset {offset}: {reason}")]
    MalformedDer { offset: usize, reason: String },

    /// Input bytes use an encoding this toolkit does not handle.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Arithmetic attempted across values from different moduli.
    #[error("field context mismatch: operands reduced modulo different primes")]
    FieldContextMismatch,

    /// Coordinates do not satisfy the curve equation.
    #[error("point is not on the curve")]
    PointNotOnCurve,

    /// The requested x coordinate has no corresponding y (non-residue).
    #[error("no square root exists for the given value")]
    NoSquareRoot,

    /// Division by a zero scalar during signing, verification or recovery.
    #[error("division by zero scalar")]
    DivisionByZeroScalar,

    /// The element has no modular inverse (gcd with the modulus is not 1).
    #[error("value is not invertible modulo the field prime")]
    NotInvertible,

    /// Hex decoding of an input field failed.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
