//! Authenticated-data structures: `Enc_structure`, `MAC_structure`, and
//! `Sig_structure` (RFC 8152 4.4, 5.3, 6.3).
//!
//! Each is a short CBOR array over a context string, the protected bytes,
//! the external AAD, and (for MAC and signature) the payload. The arrays
//! are serialized canonically into a growable buffer; the output bytes are
//! exact.

use cachet_core::{cbor, Result};
use ciborium::value::Value;

/// Context strings for the authenticated-data structures.
pub mod context {
    pub const ENCRYPT: &str = "Encrypt";
    pub const ENCRYPT0: &str = "Encrypt0";
    pub const MAC: &str = "MAC";
    pub const MAC0: &str = "MAC0";
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNATURE1: &str = "Signature1";
    pub const ENC_RECIPIENT: &str = "Enc_Recipient";
    pub const MAC_RECIPIENT: &str = "Mac_Recipient";
    pub const REC_RECIPIENT: &str = "Rec_Recipient";
}

/// `Enc_structure = [context, protected, external_aad]`
pub fn enc_structure(ctx: &str, protected: &[u8], external: &[u8]) -> Result<Vec<u8>> {
    cbor::to_vec(&Value::Array(vec![
        Value::Text(ctx.into()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external.to_vec()),
    ]))
}

/// `MAC_structure = [context, protected, external_aad, payload]`
pub fn mac_structure(
    ctx: &str,
    protected: &[u8],
    external: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>> {
    cbor::to_vec(&Value::Array(vec![
        Value::Text(ctx.into()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external.to_vec()),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// `Sig_structure = [context, body_protected, ?sign_protected,
/// external_aad, payload]`; the signer slot is present only in the
/// multi-signer "Signature" context.
pub fn sig_structure(
    ctx: &str,
    body_protected: &[u8],
    sign_protected: Option<&[u8]>,
    external: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut items = vec![Value::Text(ctx.into()), Value::Bytes(body_protected.to_vec())];
    if let Some(sp) = sign_protected {
        items.push(Value::Bytes(sp.to_vec()));
    }
    items.push(Value::Bytes(external.to_vec()));
    items.push(Value::Bytes(payload.to_vec()));
    cbor::to_vec(&Value::Array(items))
}
