//! The algorithm registry: IANA COSE algorithm identifiers and the
//! per-algorithm parameter records the engine dispatches on.
//!
//! Identifiers are small signed integers assigned by the IANA COSE
//! Algorithms registry. Text-valued identifiers exist in the registry but
//! are rejected by this engine as unknown.

use ciborium::value::Value;

use crate::error::{Error, Result};

/// A COSE algorithm supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    // AEAD content encryption
    A128Gcm,
    A192Gcm,
    A256Gcm,
    ChaCha20Poly1305,
    AesCcm16_64_128,
    AesCcm16_64_256,
    AesCcm64_64_128,
    AesCcm64_64_256,
    AesCcm16_128_128,
    AesCcm16_128_256,
    AesCcm64_128_128,
    AesCcm64_128_256,

    // MAC
    Hmac256_64,
    Hmac256_256,
    Hmac384_384,
    Hmac512_512,
    AesMac128_64,
    AesMac256_64,
    AesMac128_128,
    AesMac256_128,

    // Signature
    Es256,
    Es384,
    Es512,
    EdDsa,

    // Recipient / key management
    Direct,
    A128Kw,
    A192Kw,
    A256Kw,
    DirectHkdfSha256,
    DirectHkdfSha512,
    DirectHkdfAes128,
    DirectHkdfAes256,
    EcdhEsHkdf256,
    EcdhEsHkdf512,
    EcdhSsHkdf256,
    EcdhSsHkdf512,
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
    EcdhSsA128Kw,
    EcdhSsA192Kw,
    EcdhSsA256Kw,
}

/// Coarse dispatch family for an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    AesGcm,
    AesCcm,
    ChaChaPoly,
    Hmac,
    AesCbcMac,
    Ecdsa,
    EdDsa,
    Direct,
    DirectHkdfHmac,
    DirectHkdfAes,
    EcdhEsHkdf,
    EcdhSsHkdf,
    EcdhEsKw,
    EcdhSsKw,
    AesKw,
}

impl Algorithm {
    /// Look up an algorithm by its IANA numeric identifier.
    pub fn from_id(id: i64) -> Result<Self> {
        use Algorithm::*;
        Ok(match id {
            1 => A128Gcm,
            2 => A192Gcm,
            3 => A256Gcm,
            24 => ChaCha20Poly1305,
            10 => AesCcm16_64_128,
            11 => AesCcm16_64_256,
            12 => AesCcm64_64_128,
            13 => AesCcm64_64_256,
            30 => AesCcm16_128_128,
            31 => AesCcm16_128_256,
            32 => AesCcm64_128_128,
            33 => AesCcm64_128_256,
            4 => Hmac256_64,
            5 => Hmac256_256,
            6 => Hmac384_384,
            7 => Hmac512_512,
            14 => AesMac128_64,
            15 => AesMac256_64,
            25 => AesMac128_128,
            26 => AesMac256_128,
            -7 => Es256,
            -35 => Es384,
            -36 => Es512,
            -8 => EdDsa,
            -6 => Direct,
            -3 => A128Kw,
            -4 => A192Kw,
            -5 => A256Kw,
            -10 => DirectHkdfSha256,
            -11 => DirectHkdfSha512,
            -12 => DirectHkdfAes128,
            -13 => DirectHkdfAes256,
            -25 => EcdhEsHkdf256,
            -26 => EcdhEsHkdf512,
            -27 => EcdhSsHkdf256,
            -28 => EcdhSsHkdf512,
            -29 => EcdhEsA128Kw,
            -30 => EcdhEsA192Kw,
            -31 => EcdhEsA256Kw,
            -32 => EcdhSsA128Kw,
            -33 => EcdhSsA192Kw,
            -34 => EcdhSsA256Kw,
            _ => return Err(Error::UnknownAlgorithm),
        })
    }

    /// The IANA numeric identifier.
    pub fn id(self) -> i64 {
        use Algorithm::*;
        match self {
            A128Gcm => 1,
            A192Gcm => 2,
            A256Gcm => 3,
            ChaCha20Poly1305 => 24,
            AesCcm16_64_128 => 10,
            AesCcm16_64_256 => 11,
            AesCcm64_64_128 => 12,
            AesCcm64_64_256 => 13,
            AesCcm16_128_128 => 30,
            AesCcm16_128_256 => 31,
            AesCcm64_128_128 => 32,
            AesCcm64_128_256 => 33,
            Hmac256_64 => 4,
            Hmac256_256 => 5,
            Hmac384_384 => 6,
            Hmac512_512 => 7,
            AesMac128_64 => 14,
            AesMac256_64 => 15,
            AesMac128_128 => 25,
            AesMac256_128 => 26,
            Es256 => -7,
            Es384 => -35,
            Es512 => -36,
            EdDsa => -8,
            Direct => -6,
            A128Kw => -3,
            A192Kw => -4,
            A256Kw => -5,
            DirectHkdfSha256 => -10,
            DirectHkdfSha512 => -11,
            DirectHkdfAes128 => -12,
            DirectHkdfAes256 => -13,
            EcdhEsHkdf256 => -25,
            EcdhEsHkdf512 => -26,
            EcdhSsHkdf256 => -27,
            EcdhSsHkdf512 => -28,
            EcdhEsA128Kw => -29,
            EcdhEsA192Kw => -30,
            EcdhEsA256Kw => -31,
            EcdhSsA128Kw => -32,
            EcdhSsA192Kw => -33,
            EcdhSsA256Kw => -34,
        }
    }

    /// Read an algorithm out of a header value. Text identifiers and
    /// anything that is not a small integer are unknown to this engine.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => {
                let id = i64::try_from(i128::from(*i)).map_err(|_| Error::UnknownAlgorithm)?;
                Self::from_id(id)
            }
            _ => Err(Error::UnknownAlgorithm),
        }
    }

    pub fn family(self) -> Family {
        use Algorithm::*;
        match self {
            A128Gcm | A192Gcm | A256Gcm => Family::AesGcm,
            ChaCha20Poly1305 => Family::ChaChaPoly,
            AesCcm16_64_128 | AesCcm16_64_256 | AesCcm64_64_128 | AesCcm64_64_256
            | AesCcm16_128_128 | AesCcm16_128_256 | AesCcm64_128_128 | AesCcm64_128_256 => {
                Family::AesCcm
            }
            Hmac256_64 | Hmac256_256 | Hmac384_384 | Hmac512_512 => Family::Hmac,
            AesMac128_64 | AesMac256_64 | AesMac128_128 | AesMac256_128 => Family::AesCbcMac,
            Es256 | Es384 | Es512 => Family::Ecdsa,
            EdDsa => Family::EdDsa,
            Direct => Family::Direct,
            A128Kw | A192Kw | A256Kw => Family::AesKw,
            DirectHkdfSha256 | DirectHkdfSha512 => Family::DirectHkdfHmac,
            DirectHkdfAes128 | DirectHkdfAes256 => Family::DirectHkdfAes,
            EcdhEsHkdf256 | EcdhEsHkdf512 => Family::EcdhEsHkdf,
            EcdhSsHkdf256 | EcdhSsHkdf512 => Family::EcdhSsHkdf,
            EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => Family::EcdhEsKw,
            EcdhSsA128Kw | EcdhSsA192Kw | EcdhSsA256Kw => Family::EcdhSsKw,
        }
    }

    /// True for algorithms whose recipient carries no wrapped key: the CEK
    /// is the recipient key itself or a KDF output of it.
    pub fn is_direct_like(self) -> bool {
        matches!(
            self.family(),
            Family::Direct | Family::DirectHkdfHmac | Family::DirectHkdfAes
                | Family::EcdhEsHkdf | Family::EcdhSsHkdf
        )
    }

    /// Key size in bits for symmetric algorithms; for key-wrap recipients
    /// this is the KEK size.
    pub fn key_bits(self) -> Option<usize> {
        use Algorithm::*;
        Some(match self {
            A128Gcm => 128,
            A192Gcm => 192,
            A256Gcm => 256,
            ChaCha20Poly1305 => 256,
            AesCcm16_64_128 | AesCcm64_64_128 | AesCcm16_128_128 | AesCcm64_128_128 => 128,
            AesCcm16_64_256 | AesCcm64_64_256 | AesCcm16_128_256 | AesCcm64_128_256 => 256,
            // HMAC keys match the hash output size
            Hmac256_64 | Hmac256_256 => 256,
            Hmac384_384 => 384,
            Hmac512_512 => 512,
            AesMac128_64 | AesMac128_128 => 128,
            AesMac256_64 | AesMac256_128 => 256,
            A128Kw | EcdhEsA128Kw | EcdhSsA128Kw => 128,
            A192Kw | EcdhEsA192Kw | EcdhSsA192Kw => 192,
            A256Kw | EcdhEsA256Kw | EcdhSsA256Kw => 256,
            DirectHkdfAes128 => 128,
            DirectHkdfAes256 => 256,
            _ => return None,
        })
    }

    /// Authentication tag size in bits for AEAD and MAC algorithms.
    pub fn tag_bits(self) -> Option<usize> {
        use Algorithm::*;
        Some(match self {
            A128Gcm | A192Gcm | A256Gcm | ChaCha20Poly1305 => 128,
            AesCcm16_64_128 | AesCcm16_64_256 | AesCcm64_64_128 | AesCcm64_64_256 => 64,
            AesCcm16_128_128 | AesCcm16_128_256 | AesCcm64_128_128 | AesCcm64_128_256 => 128,
            Hmac256_64 | AesMac128_64 | AesMac256_64 => 64,
            Hmac256_256 | AesMac128_128 | AesMac256_128 => 128,
            Hmac384_384 => 384,
            Hmac512_512 => 512,
            _ => return None,
        })
    }

    /// Nonce size in bits for AEAD algorithms. The CCM names encode the
    /// message-length field width: the "-16" variants leave 13 nonce bytes,
    /// the "-64" variants leave 7.
    pub fn nonce_bits(self) -> Option<usize> {
        use Algorithm::*;
        Some(match self {
            A128Gcm | A192Gcm | A256Gcm | ChaCha20Poly1305 => 96,
            AesCcm16_64_128 | AesCcm16_64_256 | AesCcm16_128_128 | AesCcm16_128_256 => 104,
            AesCcm64_64_128 | AesCcm64_64_256 | AesCcm64_128_128 | AesCcm64_128_256 => 56,
            _ => return None,
        })
    }

    /// Hash output size in bits for HMAC and HKDF-HMAC algorithms.
    pub fn hash_bits(self) -> Option<usize> {
        use Algorithm::*;
        Some(match self {
            Hmac256_64 | Hmac256_256 | DirectHkdfSha256 | EcdhEsHkdf256 | EcdhSsHkdf256
            | Es256 => 256,
            Hmac384_384 | Es384 => 384,
            Hmac512_512 | DirectHkdfSha512 | EcdhEsHkdf512 | EcdhSsHkdf512 | Es512 => 512,
            // ECDH+KW derives its KEK through HKDF-SHA-256
            EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw | EcdhSsA128Kw | EcdhSsA192Kw
            | EcdhSsA256Kw => 256,
            _ => return None,
        })
    }
}
