//! AEAD content encryption: AES-GCM, AES-CCM, and ChaCha20-Poly1305.
//!
//! The ciphertext produced by [`seal`] carries the authentication tag
//! appended, matching the COSE body layout (`ciphertext || tag`).

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::{U12, U13, U16, U7, U8};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use cachet_core::Algorithm;
use ccm::Ccm;

use crate::error::{CryptoError, Result};

type Aes192Gcm = AesGcm<Aes192, U12>;

// The COSE CCM names carry (length-field bits, tag bits, key bits). A
// 16-bit length field leaves a 13-byte nonce, a 64-bit one leaves 7 bytes.
type Ccm16T8<C> = Ccm<C, U8, U13>;
type Ccm16T16<C> = Ccm<C, U16, U13>;
type Ccm64T8<C> = Ccm<C, U8, U7>;
type Ccm64T16<C> = Ccm<C, U16, U7>;

/// Encrypt `plaintext` with `aad`, returning `ciphertext || tag`.
pub fn seal(
    alg: Algorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    check_nonce(alg, nonce)?;
    use Algorithm::*;
    match alg {
        A128Gcm => seal_with::<Aes128Gcm>(key, nonce, aad, plaintext),
        A192Gcm => seal_with::<Aes192Gcm>(key, nonce, aad, plaintext),
        A256Gcm => seal_with::<Aes256Gcm>(key, nonce, aad, plaintext),
        ChaCha20Poly1305 => seal_with::<chacha20poly1305::ChaCha20Poly1305>(key, nonce, aad, plaintext),
        AesCcm16_64_128 => seal_with::<Ccm16T8<Aes128>>(key, nonce, aad, plaintext),
        AesCcm16_64_256 => seal_with::<Ccm16T8<Aes256>>(key, nonce, aad, plaintext),
        AesCcm64_64_128 => seal_with::<Ccm64T8<Aes128>>(key, nonce, aad, plaintext),
        AesCcm64_64_256 => seal_with::<Ccm64T8<Aes256>>(key, nonce, aad, plaintext),
        AesCcm16_128_128 => seal_with::<Ccm16T16<Aes128>>(key, nonce, aad, plaintext),
        AesCcm16_128_256 => seal_with::<Ccm16T16<Aes256>>(key, nonce, aad, plaintext),
        AesCcm64_128_128 => seal_with::<Ccm64T16<Aes128>>(key, nonce, aad, plaintext),
        AesCcm64_128_256 => seal_with::<Ccm64T16<Aes256>>(key, nonce, aad, plaintext),
        _ => Err(CryptoError::Unsupported),
    }
}

/// Decrypt `ciphertext || tag`, authenticating `aad`.
pub fn open(
    alg: Algorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    check_nonce(alg, nonce)?;
    use Algorithm::*;
    match alg {
        A128Gcm => open_with::<Aes128Gcm>(key, nonce, aad, ciphertext),
        A192Gcm => open_with::<Aes192Gcm>(key, nonce, aad, ciphertext),
        A256Gcm => open_with::<Aes256Gcm>(key, nonce, aad, ciphertext),
        ChaCha20Poly1305 => open_with::<chacha20poly1305::ChaCha20Poly1305>(key, nonce, aad, ciphertext),
        AesCcm16_64_128 => open_with::<Ccm16T8<Aes128>>(key, nonce, aad, ciphertext),
        AesCcm16_64_256 => open_with::<Ccm16T8<Aes256>>(key, nonce, aad, ciphertext),
        AesCcm64_64_128 => open_with::<Ccm64T8<Aes128>>(key, nonce, aad, ciphertext),
        AesCcm64_64_256 => open_with::<Ccm64T8<Aes256>>(key, nonce, aad, ciphertext),
        AesCcm16_128_128 => open_with::<Ccm16T16<Aes128>>(key, nonce, aad, ciphertext),
        AesCcm16_128_256 => open_with::<Ccm16T16<Aes256>>(key, nonce, aad, ciphertext),
        AesCcm64_128_128 => open_with::<Ccm64T16<Aes128>>(key, nonce, aad, ciphertext),
        AesCcm64_128_256 => open_with::<Ccm64T16<Aes256>>(key, nonce, aad, ciphertext),
        _ => Err(CryptoError::Unsupported),
    }
}

fn check_nonce(alg: Algorithm, nonce: &[u8]) -> Result<()> {
    let expected = alg.nonce_bits().ok_or(CryptoError::Unsupported)? / 8;
    if nonce.len() != expected {
        return Err(CryptoError::Key("IV has the wrong length for the algorithm"));
    }
    Ok(())
}

fn seal_with<A: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|_| CryptoError::Key("bad AEAD key length"))?;
    cipher
        .encrypt(nonce.into(), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Encrypt)
}

fn open_with<A: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|_| CryptoError::Key("bad AEAD key length"))?;
    cipher
        .decrypt(nonce.into(), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Decrypt)
}
