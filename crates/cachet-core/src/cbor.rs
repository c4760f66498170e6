//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! Determinism matters here because protected-header bytes and KDF context
//! bytes feed authenticated-data constructions: the same header set must
//! produce identical bytes on every encode.

use ciborium::value::Value;

use crate::error::{Error, Result};

/// Encode a CBOR value to canonical bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value)?;
    Ok(buf)
}

/// Decode a single CBOR value from a byte slice.
pub fn from_slice(bytes: &[u8]) -> Result<Value> {
    ciborium::from_reader(bytes).map_err(|e| Error::Cbor(e.to_string()))
}

/// Recursively encode a CBOR value.
fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, (*i).into()),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value(buf, inner)?;
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => return Err(Error::Cbor("unsupported value type in canonical encoding".into())),
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, n: i128) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type, smallest width.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically: keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value)?;
    }
    Ok(())
}

/// Extract the array behind an optionally tagged value, checking the tag
/// number when one is present.
pub fn untag_array(value: Value, expected_tag: u64) -> Result<Vec<Value>> {
    let inner = match value {
        Value::Tag(tag, inner) => {
            if tag != expected_tag {
                return Err(Error::Cbor(format!(
                    "unexpected CBOR tag {tag}, expected {expected_tag}"
                )));
            }
            *inner
        }
        other => other,
    };
    match inner {
        Value::Array(items) => Ok(items),
        _ => Err(Error::Cbor("expected a CBOR array".into())),
    }
}

/// Byte-string accessor with a structural error on type mismatch.
pub fn as_bytes(value: &Value) -> Result<&[u8]> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(Error::Cbor("expected a CBOR byte string".into())),
    }
}

/// Array accessor with a structural error on type mismatch.
pub fn as_array(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(Error::Cbor("expected a CBOR array".into())),
    }
}

/// Integer accessor with a structural error on type mismatch.
pub fn as_int(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => {
            i64::try_from(i128::from(*i)).map_err(|_| Error::Cbor("integer out of range".into()))
        }
        _ => Err(Error::Cbor("expected a CBOR integer".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding_smallest_width() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_negative_integers() {
        // -6 (the Direct algorithm id) encodes as major type 1, value 5
        let bytes = to_vec(&Value::Integer((-6).into())).unwrap();
        assert_eq!(bytes, vec![0x25]);

        let bytes = to_vec(&Value::Integer((-25).into())).unwrap();
        assert_eq!(bytes, vec![0x38, 24]);
    }

    #[test]
    fn test_map_key_ordering() {
        let entries = vec![
            (Value::Integer(8.into()), Value::Integer(80.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(5.into()), Value::Integer(50.into())),
        ];
        let mut buf = Vec::new();
        encode_map_canonical(&mut buf, &entries).unwrap();

        assert_eq!(buf[0], 0xa3);
        assert_eq!(buf[1], 0x00); // key 0
        assert_eq!(buf[3], 0x05); // key 5
        assert_eq!(buf[6], 0x08); // key 8
    }

    #[test]
    fn test_tagged_roundtrip() {
        let tagged = Value::Tag(16, Box::new(Value::Array(vec![Value::Bytes(vec![])])));
        let bytes = to_vec(&tagged).unwrap();
        assert_eq!(bytes[0], 0xd0); // tag(16)
        let back = from_slice(&bytes).unwrap();
        let items = untag_array(back, 16).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_untag_rejects_wrong_tag() {
        let tagged = Value::Tag(97, Box::new(Value::Array(vec![])));
        assert!(untag_array(tagged, 16).is_err());
    }

    #[test]
    fn test_encode_decode_identity() {
        let value = Value::Array(vec![
            Value::Text("Encrypt0".into()),
            Value::Bytes(vec![0xa1, 0x01, 0x0a]),
            Value::Bytes(vec![]),
        ]);
        let bytes = to_vec(&value).unwrap();
        let back = from_slice(&bytes).unwrap();
        assert_eq!(to_vec(&back).unwrap(), bytes);
    }
}
