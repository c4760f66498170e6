//! Error types for the primitive provider.

use thiserror::Error;

/// Errors surfaced by the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material has the wrong shape (length, curve, missing component).
    #[error("invalid key material: {0}")]
    Key(&'static str),

    /// AEAD or key-wrap encryption failed.
    #[error("encryption failed")]
    Encrypt,

    /// Tag mismatch, signature mismatch, or unwrap failure.
    #[error("decryption or verification failed")]
    Decrypt,

    /// The algorithm has no primitive of the requested kind.
    #[error("operation not supported for this algorithm")]
    Unsupported,
}

/// Result type for primitive operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

impl From<CryptoError> for cachet_core::Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Key(msg) => cachet_core::Error::InvalidParameter(msg),
            CryptoError::Unsupported => cachet_core::Error::UnknownAlgorithm,
            CryptoError::Encrypt | CryptoError::Decrypt => cachet_core::Error::CryptoFail,
        }
    }
}
