//! Signature primitives: ECDSA over the NIST curves and Ed25519.
//!
//! ECDSA signatures are the fixed-width `r || s` concatenation the COSE
//! wire format requires; the message is hashed with the curve's paired
//! digest (ES256 → SHA-256, ES384 → SHA-384, ES512 → SHA-512).

use cachet_core::key::{crv, kty};
use cachet_core::{Algorithm, CoseKey};
use p256::ecdsa::signature::{Signer, Verifier};

use crate::error::{CryptoError, Result};

/// Sign `data` with the private key in `key`, returning the raw signature.
pub fn sign(alg: Algorithm, key: &CoseKey, data: &[u8]) -> Result<Vec<u8>> {
    let d = key.d().ok_or(CryptoError::Key("signing key has no private component"))?;

    macro_rules! ecdsa_sign {
        ($curve:ident) => {{
            let sk = $curve::ecdsa::SigningKey::from_slice(d)
                .map_err(|_| CryptoError::Key("bad ECDSA private key"))?;
            let sig: $curve::ecdsa::Signature = sk.sign(data);
            sig.to_bytes().to_vec()
        }};
    }

    match alg {
        Algorithm::Es256 => {
            check_curve(key, kty::EC2, crv::P256)?;
            Ok(ecdsa_sign!(p256))
        }
        Algorithm::Es384 => {
            check_curve(key, kty::EC2, crv::P384)?;
            Ok(ecdsa_sign!(p384))
        }
        Algorithm::Es512 => {
            check_curve(key, kty::EC2, crv::P521)?;
            Ok(ecdsa_sign!(p521))
        }
        Algorithm::EdDsa => {
            check_curve(key, kty::OKP, crv::ED25519)?;
            let seed: &[u8; 32] = d
                .try_into()
                .map_err(|_| CryptoError::Key("Ed25519 private key must be 32 bytes"))?;
            let sk = ed25519_dalek::SigningKey::from_bytes(seed);
            Ok(sk.sign(data).to_bytes().to_vec())
        }
        _ => Err(CryptoError::Unsupported),
    }
}

/// Verify a raw signature over `data` with the public key in `key`.
pub fn verify(alg: Algorithm, key: &CoseKey, data: &[u8], signature: &[u8]) -> Result<()> {
    macro_rules! ecdsa_verify {
        ($curve:ident, $field:expr) => {{
            let x = key.x().ok_or(CryptoError::Key("EC2 key has no x coordinate"))?;
            let y = key.y().ok_or(CryptoError::Key("EC2 key has no y coordinate"))?;
            if x.len() != $field || y.len() != $field {
                return Err(CryptoError::Key("EC2 coordinate has the wrong length"));
            }
            let point = $curve::EncodedPoint::from_affine_coordinates(
                $curve::FieldBytes::from_slice(x),
                $curve::FieldBytes::from_slice(y),
                false,
            );
            let vk = $curve::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| CryptoError::Key("point is not on the curve"))?;
            let sig = $curve::ecdsa::Signature::from_slice(signature)
                .map_err(|_| CryptoError::Decrypt)?;
            vk.verify(data, &sig).map_err(|_| CryptoError::Decrypt)
        }};
    }

    match alg {
        Algorithm::Es256 => {
            check_curve(key, kty::EC2, crv::P256)?;
            ecdsa_verify!(p256, 32)
        }
        Algorithm::Es384 => {
            check_curve(key, kty::EC2, crv::P384)?;
            ecdsa_verify!(p384, 48)
        }
        Algorithm::Es512 => {
            check_curve(key, kty::EC2, crv::P521)?;
            ecdsa_verify!(p521, 66)
        }
        Algorithm::EdDsa => {
            check_curve(key, kty::OKP, crv::ED25519)?;
            let x = key.x().ok_or(CryptoError::Key("OKP key has no public component"))?;
            let pk: &[u8; 32] = x
                .try_into()
                .map_err(|_| CryptoError::Key("Ed25519 public key must be 32 bytes"))?;
            let vk = ed25519_dalek::VerifyingKey::from_bytes(pk)
                .map_err(|_| CryptoError::Key("bad Ed25519 public key"))?;
            let sig = ed25519_dalek::Signature::try_from(signature)
                .map_err(|_| CryptoError::Decrypt)?;
            vk.verify(data, &sig).map_err(|_| CryptoError::Decrypt)
        }
        _ => Err(CryptoError::Unsupported),
    }
}

fn check_curve(key: &CoseKey, want_kty: i64, want_crv: i64) -> Result<()> {
    if key.kty() != Some(want_kty) || key.crv() != Some(want_crv) {
        return Err(CryptoError::Key("key type does not match the signature algorithm"));
    }
    Ok(())
}

/// Derive the public COSE_Key for a private signing key, used by tests and
/// callers that only hold the private scalar.
pub fn public_key(alg: Algorithm, key: &CoseKey) -> Result<CoseKey> {
    let d = key.d().ok_or(CryptoError::Key("no private component"))?;

    macro_rules! ecdsa_public {
        ($curve:ident, $crv_id:expr) => {{
            let sk = $curve::ecdsa::SigningKey::from_slice(d)
                .map_err(|_| CryptoError::Key("bad ECDSA private key"))?;
            let vk = $curve::ecdsa::VerifyingKey::from(&sk);
            let point = vk.to_encoded_point(false);
            let x = point.x().ok_or(CryptoError::Key("identity point"))?.to_vec();
            let y = point.y().ok_or(CryptoError::Key("identity point"))?.to_vec();
            Ok(CoseKey::ec2($crv_id, x, y))
        }};
    }

    match alg {
        Algorithm::Es256 => ecdsa_public!(p256, crv::P256),
        Algorithm::Es384 => ecdsa_public!(p384, crv::P384),
        Algorithm::Es512 => ecdsa_public!(p521, crv::P521),
        Algorithm::EdDsa => {
            let seed: &[u8; 32] = d
                .try_into()
                .map_err(|_| CryptoError::Key("Ed25519 private key must be 32 bytes"))?;
            let sk = ed25519_dalek::SigningKey::from_bytes(seed);
            Ok(CoseKey::okp(crv::ED25519, sk.verifying_key().to_bytes().to_vec()))
        }
        _ => Err(CryptoError::Unsupported),
    }
}
