//! The common message skeleton shared by every COSE variant.
//!
//! A message on the wire is a CBOR array `[protected_bstr, unprotected_map,
//! body, extras…]`, optionally wrapped in the variant's CBOR tag. The
//! skeleton owns the header buckets, the content/payload, the external AAD
//! bytes, and the received protected bytes (kept verbatim so authenticated
//! data is rebuilt over exactly what the peer sent).

use cachet_core::{cbor, Bucket, Error, Headers, Result, Search};
use ciborium::value::Value;

/// CBOR tag numbers for the COSE message variants.
pub mod tag {
    pub const ENCRYPT0: u64 = 16;
    pub const MAC0: u64 = 17;
    pub const SIGN1: u64 = 18;
    pub const ENCRYPT: u64 = 96;
    pub const MAC: u64 = 97;
    pub const SIGN: u64 = 98;
}

/// Shared state of one message layer.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageCore {
    pub headers: Headers,
    /// Plaintext content (encrypt variants) or payload (MAC/sign variants).
    pub content: Option<Vec<u8>>,
    /// Externally supplied AAD, empty by default.
    pub external: Vec<u8>,
    /// Protected bytes as received from the wire, or as last computed.
    protected_raw: Option<Vec<u8>>,
    /// Set once the variant operation has run; mutations are rejected after.
    pub finalized: bool,
}

impl MessageCore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_mutable(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidParameter("message is finalized"));
        }
        Ok(())
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.check_mutable()?;
        self.headers.put(label, value, bucket)?;
        if bucket == Bucket::Protected {
            // The cached serialization no longer matches the bucket.
            self.protected_raw = None;
        }
        Ok(())
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.headers.get(label, search)
    }

    pub fn set_content(&mut self, content: &[u8]) -> Result<()> {
        self.check_mutable()?;
        self.content = Some(content.to_vec());
        Ok(())
    }

    pub fn set_external(&mut self, external: &[u8]) -> Result<()> {
        self.check_mutable()?;
        self.external = external.to_vec();
        Ok(())
    }

    /// The protected byte string: received bytes when decoding, otherwise
    /// computed canonically from the bucket and cached.
    pub fn protected_bytes(&mut self) -> Result<Vec<u8>> {
        if let Some(raw) = &self.protected_raw {
            return Ok(raw.clone());
        }
        let bytes = self.headers.encode_protected()?;
        self.protected_raw = Some(bytes.clone());
        Ok(bytes)
    }

    /// Fill headers from the first two slots of a decoded array.
    pub fn absorb_slots(&mut self, protected: &Value, unprotected: &Value) -> Result<()> {
        let protected = cbor::as_bytes(protected)?;
        self.headers.decode_protected(protected)?;
        self.protected_raw = Some(protected.to_vec());
        self.headers.decode_unprotected(unprotected.clone())?;
        Ok(())
    }

    /// The first two wire slots: protected bytes and the unprotected map.
    pub fn header_slots(&mut self) -> Result<(Value, Value)> {
        let protected = self.protected_bytes()?;
        Ok((Value::Bytes(protected), self.headers.unprotected_value()))
    }
}

/// Decode a message envelope: accept the variant's tag or an untagged
/// array, and require exactly `slots` elements.
pub(crate) fn decode_envelope(bytes: &[u8], expected_tag: u64, slots: usize) -> Result<Vec<Value>> {
    let value = cbor::from_slice(bytes)?;
    let items = cbor::untag_array(value, expected_tag)?;
    if items.len() != slots {
        return Err(Error::Cbor(format!(
            "expected a {slots}-element array, got {}",
            items.len()
        )));
    }
    Ok(items)
}

/// Read a body slot that is either a byte string or nil (detached content).
pub(crate) fn body_slot(value: &Value) -> Result<Option<Vec<u8>>> {
    match value {
        Value::Bytes(b) => Ok(Some(b.clone())),
        Value::Null => Ok(None),
        _ => Err(Error::Cbor("body slot must be a byte string or nil".into())),
    }
}

/// Serialize an encoded message, optionally wrapped in its CBOR tag.
pub(crate) fn encode_envelope(items: Vec<Value>, tag: Option<u64>) -> Result<Vec<u8>> {
    let array = Value::Array(items);
    match tag {
        Some(n) => cbor::to_vec(&Value::Tag(n, Box::new(array))),
        None => cbor::to_vec(&array),
    }
}
