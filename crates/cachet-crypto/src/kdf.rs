//! Key derivation: HKDF (RFC 5869) and the AES-CMAC expand used by the
//! COSE Direct+HKDF-AES algorithms.

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::mac;

/// HKDF-Extract then HKDF-Expand with the hash selected by `hash_bits`.
///
/// `salt = None` uses the RFC 5869 default (a zero-filled hash block).
pub fn hkdf(
    hash_bits: usize,
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut okm = Zeroizing::new(vec![0u8; out_len]);
    match hash_bits {
        256 => Hkdf::<Sha256>::new(salt, ikm)
            .expand(info, &mut okm)
            .map_err(|_| CryptoError::Key("HKDF output length out of range"))?,
        512 => Hkdf::<Sha512>::new(salt, ikm)
            .expand(info, &mut okm)
            .map_err(|_| CryptoError::Key("HKDF output length out of range"))?,
        _ => return Err(CryptoError::Unsupported),
    }
    Ok(okm)
}

/// The HKDF-Expand loop with AES-CMAC as the PRF (RFC 8152 11.1).
///
/// There is no extract step: the key is used as the PRK directly, and must
/// be 128 or 256 bits. Each round is a single CMAC block over
/// `T(i-1) | info | i`.
pub fn hkdf_aes_expand(key: &[u8], info: &[u8], out_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    if key.len() != 16 && key.len() != 32 {
        return Err(CryptoError::Key("HKDF-AES key must be 128 or 256 bits"));
    }
    // T(i) = PRF(key, T(i-1) | info | i), output = T(1) | T(2) | ...
    let mut okm = Zeroizing::new(Vec::with_capacity(out_len + 16));
    let mut t = Zeroizing::new(Vec::new());
    let mut counter = 1u8;
    while okm.len() < out_len {
        let mut block = Zeroizing::new(Vec::with_capacity(t.len() + info.len() + 1));
        block.extend_from_slice(&t);
        block.extend_from_slice(info);
        block.push(counter);
        *t = mac::aes_cmac(key, &block)?;
        okm.extend_from_slice(&t);
        counter = counter.checked_add(1).ok_or(CryptoError::Key("HKDF output too long"))?;
    }
    okm.truncate(out_len);
    Ok(okm)
}
