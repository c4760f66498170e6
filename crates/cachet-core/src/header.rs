//! The three-bucket header discipline.
//!
//! Every COSE message layer carries a protected map (integrity-covered,
//! serialized once to a byte string), an unprotected map (plaintext on the
//! wire), and a do-not-send map (never serialized, but visible to the AAD
//! and KDF calculations). A given label lives in at most one bucket.

use std::collections::BTreeMap;

use ciborium::value::Value;

use crate::cbor;
use crate::error::{Error, Result};

/// Standard COSE header labels (integer keys for compact encoding).
pub mod label {
    pub const ALG: i64 = 1;
    pub const CRIT: i64 = 2;
    pub const CONTENT_TYPE: i64 = 3;
    pub const KID: i64 = 4;
    pub const IV: i64 = 5;
    pub const PARTIAL_IV: i64 = 6;
    pub const COUNTER_SIGNATURE: i64 = 7;

    // ECDH key agreement parameters
    pub const ECDH_EPHEMERAL_KEY: i64 = -1;
    pub const ECDH_STATIC_KEY: i64 = -2;
    pub const ECDH_STATIC_KEY_ID: i64 = -3;

    // HKDF parameters
    pub const HKDF_SALT: i64 = -20;
    pub const PARTY_U_IDENTITY: i64 = -21;
    pub const PARTY_U_NONCE: i64 = -22;
    pub const PARTY_U_OTHER: i64 = -23;
    pub const PARTY_V_IDENTITY: i64 = -24;
    pub const PARTY_V_NONCE: i64 = -25;
    pub const PARTY_V_OTHER: i64 = -26;

    // Private-use labels consumed by the KDF context builder only.
    pub const SUPP_PUB_OTHER: i64 = -999;
    pub const SUPP_PRIV_INFO: i64 = -998;
}

/// Which bucket a header is placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Protected,
    Unprotected,
    /// Available to AAD/KDF calculations but never serialized.
    DontSend,
}

/// Which buckets a lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    Protected,
    Unprotected,
    DontSend,
    /// Protected then unprotected: the buckets that reach the wire.
    Wire,
    /// All three buckets.
    Any,
}

/// A message layer's header maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    protected: BTreeMap<i64, Value>,
    unprotected: BTreeMap<i64, Value>,
    dont_send: BTreeMap<i64, Value>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header value. Replaces an existing value under the same
    /// label in the same bucket; fails if the label already lives in a
    /// different bucket.
    pub fn put(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        let occupied = |map: &BTreeMap<i64, Value>| map.contains_key(&label);
        let clash = match bucket {
            Bucket::Protected => occupied(&self.unprotected) || occupied(&self.dont_send),
            Bucket::Unprotected => occupied(&self.protected) || occupied(&self.dont_send),
            Bucket::DontSend => occupied(&self.protected) || occupied(&self.unprotected),
        };
        if clash {
            return Err(Error::InvalidParameter("header label already in another bucket"));
        }
        self.bucket_mut(bucket).insert(label, value);
        Ok(())
    }

    /// Remove a label from whichever bucket holds it.
    pub fn remove(&mut self, label: i64) -> Option<Value> {
        self.protected
            .remove(&label)
            .or_else(|| self.unprotected.remove(&label))
            .or_else(|| self.dont_send.remove(&label))
    }

    /// Look a label up in the buckets selected by `search`.
    pub fn get(&self, label: i64, search: Search) -> Option<&Value> {
        match search {
            Search::Protected => self.protected.get(&label),
            Search::Unprotected => self.unprotected.get(&label),
            Search::DontSend => self.dont_send.get(&label),
            Search::Wire => self
                .protected
                .get(&label)
                .or_else(|| self.unprotected.get(&label)),
            Search::Any => self
                .protected
                .get(&label)
                .or_else(|| self.unprotected.get(&label))
                .or_else(|| self.dont_send.get(&label)),
        }
    }

    /// Serialize the protected bucket to canonical CBOR. The empty map
    /// encodes as the zero-length byte string per the COSE convention.
    pub fn encode_protected(&self) -> Result<Vec<u8>> {
        if self.protected.is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<(Value, Value)> = self
            .protected
            .iter()
            .map(|(k, v)| (Value::Integer((*k).into()), v.clone()))
            .collect();
        cbor::to_vec(&Value::Map(entries))
    }

    /// The unprotected bucket as a CBOR map value for the wire.
    pub fn unprotected_value(&self) -> Value {
        Value::Map(
            self.unprotected
                .iter()
                .map(|(k, v)| (Value::Integer((*k).into()), v.clone()))
                .collect(),
        )
    }

    /// Populate the protected bucket from received protected bytes.
    pub fn decode_protected(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let value = cbor::from_slice(bytes)?;
        self.absorb_map(value, Bucket::Protected)
    }

    /// Populate the unprotected bucket from a received map value.
    pub fn decode_unprotected(&mut self, value: Value) -> Result<()> {
        self.absorb_map(value, Bucket::Unprotected)
    }

    fn absorb_map(&mut self, value: Value, bucket: Bucket) -> Result<()> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => return Err(Error::Cbor("expected a CBOR map of headers".into())),
        };
        for (k, v) in entries {
            let label = cbor::as_int(&k)?;
            self.put(label, v, bucket)?;
        }
        Ok(())
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut BTreeMap<i64, Value> {
        match bucket {
            Bucket::Protected => &mut self.protected,
            Bucket::Unprotected => &mut self.unprotected,
            Bucket::DontSend => &mut self.dont_send,
        }
    }

    pub fn protected_is_empty(&self) -> bool {
        self.protected.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.protected.is_empty() && self.unprotected.is_empty() && self.dont_send.is_empty()
    }
}
