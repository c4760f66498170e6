//! RFC 3394 AES key wrap.

use aes_kw::{KekAes128, KekAes192, KekAes256};

use crate::error::{CryptoError, Result};

const SEMIBLOCK: usize = 8;

/// Wrap `cek` under a 128/192/256-bit KEK. Output is 8 bytes longer than
/// the input.
pub fn wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    if cek.len() < SEMIBLOCK * 2 || cek.len() % SEMIBLOCK != 0 {
        return Err(CryptoError::Key("key-wrap input must be a multiple of 8 bytes, min 16"));
    }
    let mut out = vec![0u8; cek.len() + SEMIBLOCK];
    match kek.len() {
        16 => KekAes128::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .wrap(cek, &mut out)
            .map_err(|_| CryptoError::Encrypt)?,
        24 => KekAes192::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .wrap(cek, &mut out)
            .map_err(|_| CryptoError::Encrypt)?,
        32 => KekAes256::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .wrap(cek, &mut out)
            .map_err(|_| CryptoError::Encrypt)?,
        _ => return Err(CryptoError::Key("KEK must be 128, 192 or 256 bits")),
    }
    Ok(out)
}

/// Unwrap a wrapped key. Fails on integrity-check mismatch.
pub fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    if wrapped.len() < SEMIBLOCK * 3 || wrapped.len() % SEMIBLOCK != 0 {
        return Err(CryptoError::Decrypt);
    }
    let mut out = vec![0u8; wrapped.len() - SEMIBLOCK];
    match kek.len() {
        16 => KekAes128::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .unwrap(wrapped, &mut out)
            .map_err(|_| CryptoError::Decrypt)?,
        24 => KekAes192::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .unwrap(wrapped, &mut out)
            .map_err(|_| CryptoError::Decrypt)?,
        32 => KekAes256::try_from(kek)
            .map_err(|_| CryptoError::Key("bad KEK"))?
            .unwrap(wrapped, &mut out)
            .map_err(|_| CryptoError::Decrypt)?,
        _ => return Err(CryptoError::Key("KEK must be 128, 192 or 256 bits")),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3394_vector() {
        // RFC 3394 4.1: wrap 128 bits of key data with a 128-bit KEK
        let kek = hex::decode("000102030405060708090A0B0C0D0E0F").unwrap();
        let cek = hex::decode("00112233445566778899AABBCCDDEEFF").unwrap();
        let expected =
            hex::decode("1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5").unwrap();

        let wrapped = wrap(&kek, &cek).unwrap();
        assert_eq!(wrapped, expected);
        assert_eq!(unwrap(&kek, &wrapped).unwrap(), cek);
    }

    #[test]
    fn test_unwrap_wrong_kek_fails() {
        let kek = [0x01u8; 16];
        let wrapped = wrap(&kek, &[0x42; 16]).unwrap();
        assert!(matches!(unwrap(&[0x02u8; 16], &wrapped), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_bad_kek_length() {
        assert!(matches!(wrap(&[0u8; 20], &[0u8; 16]), Err(CryptoError::Key(_))));
    }

    #[test]
    fn test_bad_wrapped_length() {
        assert!(unwrap(&[0u8; 16], &[0u8; 17]).is_err());
    }
}
