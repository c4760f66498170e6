//! The `COSE_KDF_Context` structure (RFC 8152 11.2) consumed as the info
//! input by HKDF-based recipients.
//!
//! ```text
//! [ AlgorithmID,
//!   [ PartyU identity?, nonce?, other? ],
//!   [ PartyV identity?, nonce?, other? ],
//!   [ keyDataLength, protected_bstr, SuppPubOther? ],
//!   SuppPrivInfo? ]
//! ```
//!
//! Party fields are cloned out of the header buckets (any bucket,
//! including do-not-send); absent fields collapse so the inner arrays are
//! not padded.

use cachet_core::{cbor, label, Headers, Result, Search};
use ciborium::value::Value;

/// Build the serialized context binding `alg_id` and `key_bits` to the
/// party data in `headers` and the protected bytes.
pub fn build(
    alg_id: i64,
    key_bits: usize,
    headers: &Headers,
    protected: &[u8],
) -> Result<Vec<u8>> {
    let party = |identity: i64, nonce: i64, other: i64| -> Value {
        let mut items = Vec::with_capacity(3);
        for l in [identity, nonce, other] {
            if let Some(v) = headers.get(l, Search::Any) {
                items.push(v.clone());
            }
        }
        Value::Array(items)
    };

    let mut supp_pub = vec![
        Value::Integer((key_bits as u64).into()),
        Value::Bytes(protected.to_vec()),
    ];
    if let Some(v) = headers.get(label::SUPP_PUB_OTHER, Search::Any) {
        supp_pub.push(v.clone());
    }

    let mut items = vec![
        Value::Integer(alg_id.into()),
        party(label::PARTY_U_IDENTITY, label::PARTY_U_NONCE, label::PARTY_U_OTHER),
        party(label::PARTY_V_IDENTITY, label::PARTY_V_NONCE, label::PARTY_V_OTHER),
        Value::Array(supp_pub),
    ];
    if let Some(v) = headers.get(label::SUPP_PRIV_INFO, Search::Any) {
        items.push(v.clone());
    }

    cbor::to_vec(&Value::Array(items))
}
