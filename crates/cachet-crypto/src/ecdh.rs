//! ECDH key agreement over the NIST curves and X25519.
//!
//! The shared secret is the raw x-coordinate (NIST curves) or the raw
//! Montgomery output (X25519); key derivation from it is the KDF's job.

use cachet_core::key::{crv, kty};
use cachet_core::CoseKey;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::rng;

/// Compute the ECDH shared secret between a private key (`d` present) and
/// a peer public key on the same curve.
pub fn shared_secret(private: &CoseKey, public: &CoseKey) -> Result<Zeroizing<Vec<u8>>> {
    let curve = private.crv().ok_or(CryptoError::Key("private key has no curve"))?;
    if public.crv() != Some(curve) {
        return Err(CryptoError::Key("key agreement curves do not match"));
    }
    let d = private.d().ok_or(CryptoError::Key("private key has no d component"))?;

    macro_rules! nist_dh {
        ($curve:ident, $field:expr) => {{
            let sk = $curve::SecretKey::from_slice(d)
                .map_err(|_| CryptoError::Key("bad ECDH private key"))?;
            let x = public.x().ok_or(CryptoError::Key("public key has no x coordinate"))?;
            let y = public.y().ok_or(CryptoError::Key("public key has no y coordinate"))?;
            if x.len() != $field || y.len() != $field {
                return Err(CryptoError::Key("EC2 coordinate has the wrong length"));
            }
            let point = $curve::EncodedPoint::from_affine_coordinates(
                $curve::FieldBytes::from_slice(x),
                $curve::FieldBytes::from_slice(y),
                false,
            );
            let pk = $curve::PublicKey::from_encoded_point(&point);
            let pk = Option::<$curve::PublicKey>::from(pk)
                .ok_or(CryptoError::Key("point is not on the curve"))?;
            let shared =
                $curve::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
            Zeroizing::new(shared.raw_secret_bytes().to_vec())
        }};
    }

    let secret = match (private.kty(), curve) {
        (Some(kty::EC2), crv::P256) => nist_dh!(p256, 32),
        (Some(kty::EC2), crv::P384) => nist_dh!(p384, 48),
        (Some(kty::EC2), crv::P521) => nist_dh!(p521, 66),
        (Some(kty::OKP), crv::X25519) => {
            let d: [u8; 32] = d
                .try_into()
                .map_err(|_| CryptoError::Key("X25519 private key must be 32 bytes"))?;
            let x = public.x().ok_or(CryptoError::Key("public key has no x component"))?;
            let x: [u8; 32] = x
                .try_into()
                .map_err(|_| CryptoError::Key("X25519 public key must be 32 bytes"))?;
            let sk = x25519_dalek::StaticSecret::from(d);
            let pk = x25519_dalek::PublicKey::from(x);
            Zeroizing::new(sk.diffie_hellman(&pk).as_bytes().to_vec())
        }
        _ => return Err(CryptoError::Key("unsupported key agreement curve")),
    };
    Ok(secret)
}

/// Generate an ephemeral key pair on the given curve. The returned key
/// carries the private component; strip it with
/// [`CoseKey::public_part`] before putting it on the wire.
pub fn generate_ephemeral(curve: i64) -> Result<CoseKey> {
    macro_rules! nist_generate {
        ($curve:ident, $crv_id:expr) => {{
            let sk = $curve::SecretKey::random(&mut rand::thread_rng());
            let point = sk.public_key().to_encoded_point(false);
            let x = point.x().ok_or(CryptoError::Key("identity point"))?.to_vec();
            let y = point.y().ok_or(CryptoError::Key("identity point"))?.to_vec();
            Ok(CoseKey::ec2($crv_id, x, y).with_d(sk.to_bytes().to_vec()))
        }};
    }

    match curve {
        crv::P256 => nist_generate!(p256, crv::P256),
        crv::P384 => nist_generate!(p384, crv::P384),
        crv::P521 => nist_generate!(p521, crv::P521),
        crv::X25519 => {
            let mut seed = Zeroizing::new([0u8; 32]);
            rng::fill(&mut *seed);
            let sk = x25519_dalek::StaticSecret::from(*seed);
            let pk = x25519_dalek::PublicKey::from(&sk);
            Ok(CoseKey::okp(crv::X25519, pk.as_bytes().to_vec()).with_d(seed.to_vec()))
        }
        _ => Err(CryptoError::Key("unsupported key agreement curve")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p256_agreement_symmetric() {
        let alice = generate_ephemeral(crv::P256).unwrap();
        let bob = generate_ephemeral(crv::P256).unwrap();

        let ab = shared_secret(&alice, &bob.public_part()).unwrap();
        let ba = shared_secret(&bob, &alice.public_part()).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_p521_agreement_symmetric() {
        let alice = generate_ephemeral(crv::P521).unwrap();
        let bob = generate_ephemeral(crv::P521).unwrap();
        let ab = shared_secret(&alice, &bob.public_part()).unwrap();
        let ba = shared_secret(&bob, &alice.public_part()).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab.len(), 66);
    }

    #[test]
    fn test_x25519_agreement_symmetric() {
        let alice = generate_ephemeral(crv::X25519).unwrap();
        let bob = generate_ephemeral(crv::X25519).unwrap();
        let ab = shared_secret(&alice, &bob.public_part()).unwrap();
        let ba = shared_secret(&bob, &alice.public_part()).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_curve_mismatch_rejected() {
        let alice = generate_ephemeral(crv::P256).unwrap();
        let bob = generate_ephemeral(crv::P384).unwrap();
        assert!(matches!(
            shared_secret(&alice, &bob.public_part()),
            Err(CryptoError::Key(_))
        ));
    }

    #[test]
    fn test_missing_private_component_rejected() {
        let alice = generate_ephemeral(crv::P256).unwrap();
        let bob = generate_ephemeral(crv::P256).unwrap();
        assert!(matches!(
            shared_secret(&alice.public_part(), &bob.public_part()),
            Err(CryptoError::Key(_))
        ));
    }
}
