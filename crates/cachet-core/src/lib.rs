//! # Cachet Core
//!
//! Pure primitives for the Cachet COSE engine: the algorithm registry,
//! header buckets, canonical CBOR encoding, and the `COSE_Key` model.
//!
//! This crate contains no cryptography and no I/O. It is pure computation
//! over CBOR data structures.
//!
//! ## Key Types
//!
//! - [`Algorithm`] - IANA numeric algorithm identifiers and their parameters
//! - [`Headers`] - the protected / unprotected / do-not-send bucket triple
//! - [`CoseKey`] - the integer-labeled key map
//! - [`Error`] - the engine-wide error taxonomy
//!
//! ## Canonicalization
//!
//! Protected headers and KDF contexts are encoded with RFC 8949 Core
//! Deterministic Encoding. See the [`cbor`] module.

pub mod alg;
pub mod cbor;
pub mod error;
pub mod header;
pub mod key;

pub use alg::{Algorithm, Family};
pub use error::{Error, Result};
pub use header::{label, Bucket, Headers, Search};
pub use key::{crv, kty, CoseKey};
