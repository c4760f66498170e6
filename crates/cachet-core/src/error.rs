//! Error types shared across the Cachet workspace.

use thiserror::Error;

/// Errors that can occur while building or processing a COSE message.
///
/// The taxonomy is two-level: structural errors ([`Error::InvalidParameter`],
/// [`Error::UnknownAlgorithm`], [`Error::Cbor`], [`Error::NoRecipientFound`])
/// are deterministic for a given input and not worth retrying; operational
/// errors ([`Error::CryptoFail`]) depend on the key material presented.
/// `CryptoFail` deliberately carries no detail: a tag mismatch, a bad
/// signature, and malformed key material are indistinguishable to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("unknown or unsupported algorithm")]
    UnknownAlgorithm,

    #[error("no recipient was able to produce the content key")]
    NoRecipientFound,

    #[error("CBOR error: {0}")]
    Cbor(String),

    #[error("cryptographic operation failed")]
    CryptoFail,
}

/// Result type for Cachet operations.
pub type Result<T> = std::result::Result<T, Error>;
