//! The COSE_Key object model.
//!
//! A key is a CBOR map keyed by small integers. The engine reads the
//! registered positions directly: `kty` at 1, and for symmetric keys `k` at
//! −1; for EC2 keys `crv` −1, `x` −2, `y` −3, private `d` −4; for OKP keys
//! `crv` −1, `x` −2, `d` −4.

use std::collections::BTreeMap;
use std::fmt;

use ciborium::value::Value;

use crate::cbor;
use crate::error::{Error, Result};

/// Key map labels and registered values.
pub mod kty {
    pub const OKP: i64 = 1;
    pub const EC2: i64 = 2;
    pub const SYMMETRIC: i64 = 4;
}

/// Elliptic curve identifiers from the IANA COSE Elliptic Curves registry.
pub mod crv {
    pub const P256: i64 = 1;
    pub const P384: i64 = 2;
    pub const P521: i64 = 3;
    pub const X25519: i64 = 4;
    pub const ED25519: i64 = 6;
}

pub const LABEL_KTY: i64 = 1;
pub const LABEL_KID: i64 = 2;
pub const LABEL_ALG: i64 = 3;
pub const LABEL_CRV: i64 = -1;
pub const LABEL_K: i64 = -1;
pub const LABEL_X: i64 = -2;
pub const LABEL_Y: i64 = -3;
pub const LABEL_D: i64 = -4;

/// A COSE_Key: an integer-labeled CBOR map with typed accessors.
#[derive(Clone, Default, PartialEq)]
pub struct CoseKey {
    map: BTreeMap<i64, Value>,
}

impl CoseKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// A symmetric key holding raw key bytes.
    pub fn symmetric(k: &[u8]) -> Self {
        let mut key = Self::new();
        key.insert(LABEL_KTY, Value::Integer(kty::SYMMETRIC.into()));
        key.insert(LABEL_K, Value::Bytes(k.to_vec()));
        key
    }

    /// An EC2 public key on the given curve.
    pub fn ec2(curve: i64, x: Vec<u8>, y: Vec<u8>) -> Self {
        let mut key = Self::new();
        key.insert(LABEL_KTY, Value::Integer(kty::EC2.into()));
        key.insert(LABEL_CRV, Value::Integer(curve.into()));
        key.insert(LABEL_X, Value::Bytes(x));
        key.insert(LABEL_Y, Value::Bytes(y));
        key
    }

    /// An OKP public key (X25519 or Ed25519).
    pub fn okp(curve: i64, x: Vec<u8>) -> Self {
        let mut key = Self::new();
        key.insert(LABEL_KTY, Value::Integer(kty::OKP.into()));
        key.insert(LABEL_CRV, Value::Integer(curve.into()));
        key.insert(LABEL_X, Value::Bytes(x));
        key
    }

    /// Attach the private component.
    pub fn with_d(mut self, d: Vec<u8>) -> Self {
        self.insert(LABEL_D, Value::Bytes(d));
        self
    }

    /// Attach a key identifier.
    pub fn with_kid(mut self, kid: Vec<u8>) -> Self {
        self.insert(LABEL_KID, Value::Bytes(kid));
        self
    }

    pub fn insert(&mut self, label: i64, value: Value) {
        self.map.insert(label, value);
    }

    pub fn get(&self, label: i64) -> Option<&Value> {
        self.map.get(&label)
    }

    pub fn kty(&self) -> Option<i64> {
        self.map.get(&LABEL_KTY).and_then(|v| cbor::as_int(v).ok())
    }

    pub fn crv(&self) -> Option<i64> {
        match self.kty()? {
            k if k == kty::EC2 || k == kty::OKP => {
                self.map.get(&LABEL_CRV).and_then(|v| cbor::as_int(v).ok())
            }
            _ => None,
        }
    }

    fn bytes(&self, label: i64) -> Option<&[u8]> {
        match self.map.get(&label) {
            Some(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    /// Symmetric key bytes (`k`, label −1). Only meaningful when
    /// `kty == Symmetric`; label −1 is `crv` for EC2/OKP keys.
    pub fn k(&self) -> Option<&[u8]> {
        if self.kty() == Some(kty::SYMMETRIC) {
            self.bytes(LABEL_K)
        } else {
            None
        }
    }

    pub fn x(&self) -> Option<&[u8]> {
        self.bytes(LABEL_X)
    }

    pub fn y(&self) -> Option<&[u8]> {
        self.bytes(LABEL_Y)
    }

    pub fn d(&self) -> Option<&[u8]> {
        self.bytes(LABEL_D)
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.bytes(LABEL_KID)
    }

    /// The key as a CBOR map value.
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.map
                .iter()
                .map(|(k, v)| (Value::Integer((*k).into()), v.clone()))
                .collect(),
        )
    }

    /// Parse a key from a CBOR map value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => return Err(Error::Cbor("COSE_Key must be a CBOR map".into())),
        };
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            map.insert(cbor::as_int(k)?, v.clone());
        }
        Ok(Self { map })
    }

    /// A copy with the private components (`d`, and `k` for symmetric
    /// keys) stripped, suitable for transmission.
    pub fn public_part(&self) -> Self {
        let mut map = self.map.clone();
        map.remove(&LABEL_D);
        if self.kty() == Some(kty::SYMMETRIC) {
            map.remove(&LABEL_K);
        }
        Self { map }
    }
}

impl fmt::Debug for CoseKey {
    // Key material stays out of logs; show type, curve, and kid only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoseKey")
            .field("kty", &self.kty())
            .field("crv", &self.crv())
            .field("kid", &self.kid().map(hex::encode))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_key_accessors() {
        let key = CoseKey::symmetric(&[0x42; 16]);
        assert_eq!(key.kty(), Some(kty::SYMMETRIC));
        assert_eq!(key.k(), Some(&[0x42u8; 16][..]));
        assert_eq!(key.crv(), None);
    }

    #[test]
    fn test_ec2_key_accessors() {
        let key = CoseKey::ec2(crv::P256, vec![1; 32], vec![2; 32]).with_d(vec![3; 32]);
        assert_eq!(key.kty(), Some(kty::EC2));
        assert_eq!(key.crv(), Some(crv::P256));
        assert_eq!(key.x().unwrap().len(), 32);
        assert_eq!(key.y().unwrap().len(), 32);
        assert_eq!(key.d().unwrap().len(), 32);
        // label -1 is crv here, not k
        assert_eq!(key.k(), None);
    }

    #[test]
    fn test_public_part_strips_private() {
        let key = CoseKey::ec2(crv::P256, vec![1; 32], vec![2; 32]).with_d(vec![3; 32]);
        let public = key.public_part();
        assert!(public.d().is_none());
        assert_eq!(public.x(), key.x());

        let sym = CoseKey::symmetric(&[7; 32]);
        assert!(sym.public_part().k().is_none());
    }

    #[test]
    fn test_value_roundtrip() {
        let key = CoseKey::okp(crv::X25519, vec![9; 32]).with_kid(b"peer-1".to_vec());
        let value = key.to_value();
        let back = CoseKey::from_value(&value).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.kid(), Some(&b"peer-1"[..]));
    }

    #[test]
    fn test_from_value_rejects_non_map() {
        assert!(CoseKey::from_value(&Value::Array(vec![])).is_err());
    }
}
