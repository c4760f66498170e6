//! # Cachet Crypto
//!
//! The cryptographic primitive provider behind the Cachet COSE engine.
//!
//! Each module wraps one family of primitives behind slice-based functions
//! keyed by [`cachet_core::Algorithm`]:
//!
//! - [`aead`] - AES-GCM, AES-CCM, ChaCha20-Poly1305 content encryption
//! - [`mac`] - HMAC-SHA2 tags, AES-CBC-MAC tags, and AES-CMAC
//! - [`kw`] - RFC 3394 AES key wrap
//! - [`sign`] - ECDSA (P-256/384/521) and Ed25519 signatures
//! - [`ecdh`] - key agreement and ephemeral key generation
//! - [`kdf`] - HKDF and the AES-CMAC expand
//! - [`rng`] - CSPRNG access
//!
//! Secret outputs are returned as [`zeroize::Zeroizing`] buffers so they
//! are overwritten when dropped, on success and failure paths alike.

pub mod aead;
pub mod ecdh;
pub mod error;
pub mod kdf;
pub mod kw;
pub mod mac;
pub mod rng;
pub mod sign;

pub use error::{CryptoError, Result};
