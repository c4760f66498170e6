//! MAC primitives: HMAC-SHA2 and AES-CBC-MAC tags, plus AES-CMAC as the
//! PRF behind the AES-based key derivation.
//!
//! Tags are truncated from the most significant byte down to the length the
//! algorithm declares; verification is constant-time.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use cachet_core::Algorithm;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Result};

const AES_BLOCK: usize = 16;

/// Compute the tag for a MAC algorithm, truncated to its declared length.
pub fn tag(alg: Algorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let key_len = alg.key_bits().ok_or(CryptoError::Unsupported)? / 8;
    if key.len() != key_len {
        return Err(CryptoError::Key("MAC key has the wrong length for the algorithm"));
    }
    let tag_len = alg.tag_bits().ok_or(CryptoError::Unsupported)? / 8;

    macro_rules! hmac_full {
        ($digest:ty) => {{
            let mut mac = <Hmac<$digest> as Mac>::new_from_slice(key)
                .map_err(|_| CryptoError::Key("bad HMAC key"))?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }};
    }

    use Algorithm::*;
    let mut full = match alg {
        Hmac256_64 | Hmac256_256 => hmac_full!(Sha256),
        Hmac384_384 => hmac_full!(Sha384),
        Hmac512_512 => hmac_full!(Sha512),
        AesMac128_64 | AesMac128_128 | AesMac256_64 | AesMac256_128 => cbc_mac(key, data)?,
        _ => return Err(CryptoError::Unsupported),
    };
    full.truncate(tag_len);
    Ok(full)
}

/// Constant-time tag comparison.
pub fn verify(alg: Algorithm, key: &[u8], data: &[u8], expected: &[u8]) -> Result<()> {
    let computed = tag(alg, key, data)?;
    if computed.len() == expected.len() && bool::from(computed.ct_eq(expected)) {
        Ok(())
    } else {
        Err(CryptoError::Decrypt)
    }
}

/// CBC-MAC with a zero IV and zero padding to the block boundary, per the
/// COSE AES-MAC definition (RFC 8152 9.2).
pub fn cbc_mac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => {
            let cipher =
                Aes128::new_from_slice(key).map_err(|_| CryptoError::Key("bad AES key"))?;
            Ok(cbc_mac_blocks(&cipher, data))
        }
        32 => {
            let cipher =
                Aes256::new_from_slice(key).map_err(|_| CryptoError::Key("bad AES key"))?;
            Ok(cbc_mac_blocks(&cipher, data))
        }
        _ => Err(CryptoError::Key("AES-CBC-MAC key must be 128 or 256 bits")),
    }
}

fn cbc_mac_blocks<C: BlockEncrypt>(cipher: &C, data: &[u8]) -> Vec<u8> {
    let mut state = [0u8; AES_BLOCK];
    let mut chunks = data.chunks(AES_BLOCK).peekable();
    if chunks.peek().is_none() {
        // An empty message still authenticates one zero block.
        let mut block = GenericArray::clone_from_slice(&state);
        cipher.encrypt_block(&mut block);
        return block.to_vec();
    }
    for chunk in chunks {
        for (s, b) in state.iter_mut().zip(chunk) {
            *s ^= b;
        }
        let mut block = GenericArray::clone_from_slice(&state);
        cipher.encrypt_block(&mut block);
        state.copy_from_slice(&block);
    }
    state.to_vec()
}

/// AES-CMAC (RFC 4493 / NIST SP 800-38B). Distinct from [`cbc_mac`]: the
/// final block is XORed with a derived subkey, K1 when the message ends on
/// a block boundary, K2 over the 0x80-padded tail otherwise.
pub fn aes_cmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => {
            let cipher =
                Aes128::new_from_slice(key).map_err(|_| CryptoError::Key("bad AES key"))?;
            Ok(cmac_blocks(&cipher, data))
        }
        32 => {
            let cipher =
                Aes256::new_from_slice(key).map_err(|_| CryptoError::Key("bad AES key"))?;
            Ok(cmac_blocks(&cipher, data))
        }
        _ => Err(CryptoError::Key("AES-CMAC key must be 128 or 256 bits")),
    }
}

fn cmac_blocks<C: BlockEncrypt>(cipher: &C, data: &[u8]) -> Vec<u8> {
    let (k1, k2) = cmac_subkeys(cipher);

    // Blocks before the final one; the final block always exists, padded
    // from an empty message if need be.
    let full = if data.is_empty() { 0 } else { (data.len() - 1) / AES_BLOCK };
    let tail = &data[full * AES_BLOCK..];

    let mut last = [0u8; AES_BLOCK];
    if tail.len() == AES_BLOCK {
        for (l, (t, k)) in last.iter_mut().zip(tail.iter().zip(&k1)) {
            *l = t ^ k;
        }
    } else {
        last[..tail.len()].copy_from_slice(tail);
        last[tail.len()] = 0x80;
        for (l, k) in last.iter_mut().zip(&k2) {
            *l ^= k;
        }
    }

    let mut state = [0u8; AES_BLOCK];
    for chunk in data[..full * AES_BLOCK].chunks(AES_BLOCK) {
        for (s, b) in state.iter_mut().zip(chunk) {
            *s ^= b;
        }
        let mut block = GenericArray::clone_from_slice(&state);
        cipher.encrypt_block(&mut block);
        state.copy_from_slice(&block);
    }
    for (s, b) in state.iter_mut().zip(&last) {
        *s ^= b;
    }
    let mut block = GenericArray::clone_from_slice(&state);
    cipher.encrypt_block(&mut block);
    block.to_vec()
}

/// K1/K2 per SP 800-38B 6.1: encrypt the zero block, then double twice in
/// GF(2^128).
fn cmac_subkeys<C: BlockEncrypt>(cipher: &C) -> ([u8; AES_BLOCK], [u8; AES_BLOCK]) {
    let mut l = GenericArray::clone_from_slice(&[0u8; AES_BLOCK]);
    cipher.encrypt_block(&mut l);
    let mut l_bytes = [0u8; AES_BLOCK];
    l_bytes.copy_from_slice(&l);
    let k1 = gf128_double(&l_bytes);
    let k2 = gf128_double(&k1);
    (k1, k2)
}

/// Left shift by one bit, folding in the field constant 0x87 when the top
/// bit was set.
fn gf128_double(block: &[u8; AES_BLOCK]) -> [u8; AES_BLOCK] {
    let mut out = [0u8; AES_BLOCK];
    let mut carry = 0u8;
    for i in (0..AES_BLOCK).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = block[i] >> 7;
    }
    if block[0] & 0x80 != 0 {
        out[AES_BLOCK - 1] ^= 0x87;
    }
    out
}
