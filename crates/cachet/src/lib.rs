//! # Cachet
//!
//! A CBOR Object Signing and Encryption (COSE, RFC 8152) message engine:
//! construction, parsing, and cryptographic processing of
//! authenticated-encrypted, MAC'd, and signed messages.
//!
//! ## Message Variants
//!
//! - [`CoseEncrypt`] / [`CoseEncrypt0`] - AEAD content encryption, with and
//!   without a recipient tree
//! - [`CoseMac`] / [`CoseMac0`] - authenticated payloads
//! - [`CoseSign`] / [`CoseSign1`] - signed payloads, multi- and
//!   single-signer
//! - [`Recipient`] / [`Signer`] - the nested sub-messages
//!
//! ## Header Discipline
//!
//! Every layer carries three header buckets: protected (integrity
//! covered), unprotected (plaintext on the wire), and do-not-send
//! (available to AAD/KDF computation only). See [`cachet_core::Headers`].
//!
//! ## Key Resolution
//!
//! Enveloped and MAC messages resolve their content key through the
//! recipient tree: direct recipients supply or derive the key (Direct,
//! Direct+HKDF, ECDH-ES/SS+HKDF), wrap recipients carry it AES-KW-wrapped
//! (A128/192/256KW, ECDH-ES/SS+KW), and recipients may nest.
//!
//! ## Example
//!
//! ```rust
//! use cachet::CoseEncrypt0;
//! use cachet_core::{label, Bucket};
//! use ciborium::value::Value;
//!
//! let key = [0u8; 16];
//! let mut msg = CoseEncrypt0::new();
//! msg.put_header(label::ALG, Value::Integer(1.into()), Bucket::Protected).unwrap();
//! msg.put_header(label::IV, Value::Bytes(vec![0x24; 12]), Bucket::Unprotected).unwrap();
//! msg.set_content(b"attack at dawn").unwrap();
//! msg.encrypt(&key).unwrap();
//! let wire = msg.to_bytes().unwrap();
//!
//! let mut received = CoseEncrypt0::from_bytes(&wire).unwrap();
//! assert_eq!(received.decrypt(&key).unwrap(), b"attack at dawn");
//! ```

pub mod aad;
mod encrypt;
pub mod kdf_context;
mod mac;
mod message;
mod recipient;
mod sign;

pub use cachet_core::{label, Algorithm, Bucket, CoseKey, Error, Family, Headers, Result, Search};
pub use encrypt::{CoseEncrypt, CoseEncrypt0};
pub use mac::{CoseMac, CoseMac0};
pub use message::tag;
pub use recipient::Recipient;
pub use sign::{CoseSign, CoseSign1, Signer};
