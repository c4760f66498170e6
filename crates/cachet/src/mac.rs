//! The MAC message variants: `COSE_Mac` (with recipients) and `COSE_Mac0`
//! (a pre-shared key).
//!
//! The tag is computed over `MAC_structure = [context, protected,
//! external_aad, payload]` and truncated per the algorithm; verification
//! is constant-time.

use cachet_core::{label, Algorithm, Bucket, Error, Family, Result, Search};
use cachet_crypto::mac;
use ciborium::value::Value;
use zeroize::Zeroizing;

use crate::aad::{self, context};
use crate::message::{self, tag, MessageCore};
use crate::recipient::{self, Recipient};

fn mac_alg(core: &MessageCore) -> Result<Algorithm> {
    let alg = match core.headers.get(label::ALG, Search::Wire) {
        Some(v) => Algorithm::from_value(v)?,
        None => return Err(Error::UnknownAlgorithm),
    };
    match alg.family() {
        Family::Hmac | Family::AesCbcMac => Ok(alg),
        _ => Err(Error::UnknownAlgorithm),
    }
}

fn mac_input(core: &mut MessageCore, ctx: &str) -> Result<Vec<u8>> {
    let payload = core
        .content
        .clone()
        .ok_or(Error::InvalidParameter("message has no payload"))?;
    let protected = core.protected_bytes()?;
    aad::mac_structure(ctx, &protected, &core.external, &payload)
}

/// A `COSE_Mac0` message.
///
/// Wire layout: `[protected, unprotected, payload, tag]`, tag 17.
#[derive(Default)]
pub struct CoseMac0 {
    core: MessageCore,
    tag: Option<Vec<u8>>,
}

impl CoseMac0 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::MAC0, 4)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        core.content = message::body_slot(&items[2])?;
        let tag_bytes = message::body_slot(&items[3])?;
        Ok(Self { core, tag: tag_bytes })
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.core.set_content(payload)
    }

    pub fn set_external(&mut self, external: &[u8]) -> Result<()> {
        self.core.set_external(external)
    }

    /// Compute and store the tag.
    pub fn create_tag(&mut self, key: &[u8]) -> Result<()> {
        let alg = mac_alg(&self.core)?;
        tracing::debug!(alg = alg.id(), "computing MAC0 tag");
        let input = mac_input(&mut self.core, context::MAC0)?;
        self.tag = Some(mac::tag(alg, key, &input)?);
        self.core.finalized = true;
        Ok(())
    }

    /// Verify the stored tag against the payload.
    pub fn verify_tag(&mut self, key: &[u8]) -> Result<()> {
        let alg = mac_alg(&self.core)?;
        let expected = self
            .tag
            .clone()
            .ok_or(Error::InvalidParameter("message has no tag"))?;
        let input = mac_input(&mut self.core, context::MAC0)?;
        mac::verify(alg, key, &input, &expected)?;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::MAC0))
    }

    fn encode(&mut self, wire_tag: Option<u64>) -> Result<Vec<u8>> {
        let tag_bytes = self
            .tag
            .clone()
            .ok_or(Error::InvalidParameter("tag has not been computed yet"))?;
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        message::encode_envelope(
            vec![protected, unprotected, Value::Bytes(payload), Value::Bytes(tag_bytes)],
            wire_tag,
        )
    }
}

/// A `COSE_Mac` message: the MAC key is delivered through recipients.
///
/// Wire layout: `[protected, unprotected, payload, tag, recipients]`,
/// tag 97.
#[derive(Default)]
pub struct CoseMac {
    core: MessageCore,
    tag: Option<Vec<u8>>,
    recipients: Vec<Recipient>,
}

impl CoseMac {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::MAC, 5)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        core.content = message::body_slot(&items[2])?;
        let tag_bytes = message::body_slot(&items[3])?;
        let mut recipients = Vec::new();
        for r in cachet_core::cbor::as_array(&items[4])? {
            recipients.push(Recipient::from_value(r)?);
        }
        Ok(Self { core, tag: tag_bytes, recipients })
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.core.set_content(payload)
    }

    pub fn set_external(&mut self, external: &[u8]) -> Result<()> {
        self.core.set_external(external)
    }

    pub fn add_recipient(&mut self, recipient: Recipient) -> Result<()> {
        if self.core.finalized {
            return Err(Error::InvalidParameter("message is finalized"));
        }
        self.recipients.push(recipient);
        Ok(())
    }

    pub fn recipient_mut(&mut self, index: usize) -> Option<&mut Recipient> {
        self.recipients.get_mut(index)
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Resolve the MAC key through the recipients and compute the tag.
    pub fn create_tag(&mut self) -> Result<()> {
        self.create_tag_inner(None)
    }

    /// Compute the tag with a caller-supplied key; recipients still wrap it.
    pub fn create_tag_with_key(&mut self, key: &[u8]) -> Result<()> {
        self.create_tag_inner(Some(key))
    }

    fn create_tag_inner(&mut self, explicit: Option<&[u8]>) -> Result<()> {
        let alg = mac_alg(&self.core)?;
        let key_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        tracing::debug!(alg = alg.id(), recipients = self.recipients.len(),
            "computing MAC tag");
        let key = recipient::resolve_cek(&mut self.recipients, alg, key_bits, explicit)?;
        let input = mac_input(&mut self.core, context::MAC)?;
        self.tag = Some(mac::tag(alg, &key, &input)?);
        self.core.finalized = true;
        Ok(())
    }

    /// Recover the key via the designated recipient and verify the tag.
    pub fn verify_tag(&mut self, recipient_index: usize) -> Result<()> {
        let alg = mac_alg(&self.core)?;
        let key_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        let expected = self
            .tag
            .clone()
            .ok_or(Error::InvalidParameter("message has no tag"))?;
        let recipient = self
            .recipients
            .get_mut(recipient_index)
            .ok_or(Error::InvalidParameter("recipient index out of range"))?;
        let key: Zeroizing<Vec<u8>> = recipient.decrypt(alg, key_bits)?;
        let input = mac_input(&mut self.core, context::MAC)?;
        mac::verify(alg, &key, &input, &expected)?;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::MAC))
    }

    fn encode(&mut self, wire_tag: Option<u64>) -> Result<Vec<u8>> {
        let tag_bytes = self
            .tag
            .clone()
            .ok_or(Error::InvalidParameter("tag has not been computed yet"))?;
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        let mut recipients = Vec::with_capacity(self.recipients.len());
        for r in &mut self.recipients {
            recipients.push(r.to_value()?);
        }
        message::encode_envelope(
            vec![
                protected,
                unprotected,
                Value::Bytes(payload),
                Value::Bytes(tag_bytes),
                Value::Array(recipients),
            ],
            wire_tag,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::CoseKey;

    const PAYLOAD: &[u8] = b"This is the content.";

    fn hmac_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    fn build_mac0(alg_id: i64) -> CoseMac0 {
        let mut msg = CoseMac0::new();
        msg.put_header(label::ALG, Value::Integer(alg_id.into()), Bucket::Protected).unwrap();
        msg.set_payload(PAYLOAD).unwrap();
        msg
    }

    #[test]
    fn test_hmac_256_64_tag_length() {
        let mut msg = build_mac0(4);
        msg.create_tag(&hmac_key()).unwrap();
        assert_eq!(msg.tag.as_ref().unwrap().len(), 8);

        let bytes = msg.to_bytes().unwrap();
        let mut decoded = CoseMac0::from_bytes(&bytes).unwrap();
        decoded.verify_tag(&hmac_key()).unwrap();
    }

    #[test]
    fn test_mac0_payload_flip_fails() {
        let mut msg = build_mac0(4);
        msg.create_tag(&hmac_key()).unwrap();
        let bytes = msg.to_bytes().unwrap();

        let mut decoded = CoseMac0::from_bytes(&bytes).unwrap();
        let mut payload = decoded.core.content.clone().unwrap();
        payload[0] ^= 0x01;
        decoded.core.content = Some(payload);
        assert!(matches!(decoded.verify_tag(&hmac_key()), Err(Error::CryptoFail)));
    }

    #[test]
    fn test_mac0_tag_flip_fails() {
        let mut msg = build_mac0(5);
        msg.create_tag(&hmac_key()).unwrap();
        let mut tag_bytes = msg.tag.clone().unwrap();
        tag_bytes[0] ^= 0x80;
        msg.tag = Some(tag_bytes);
        assert!(matches!(msg.verify_tag(&hmac_key()), Err(Error::CryptoFail)));
    }

    #[test]
    fn test_mac0_deterministic() {
        let mut a = build_mac0(5);
        a.create_tag(&hmac_key()).unwrap();
        let mut b = build_mac0(5);
        b.create_tag(&hmac_key()).unwrap();
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn test_mac0_external_aad_in_tag() {
        let mut a = build_mac0(5);
        a.set_external(b"ext").unwrap();
        a.create_tag(&hmac_key()).unwrap();

        let mut b = build_mac0(5);
        b.create_tag(&hmac_key()).unwrap();
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn test_cbc_mac_tag() {
        let mut msg = build_mac0(14); // AES-MAC 128/64
        msg.create_tag(&[0x2bu8; 16]).unwrap();
        assert_eq!(msg.tag.as_ref().unwrap().len(), 8);
        let bytes = msg.to_bytes().unwrap();
        CoseMac0::from_bytes(&bytes).unwrap().verify_tag(&[0x2bu8; 16]).unwrap();
    }

    #[test]
    fn test_mac0_aead_alg_rejected() {
        let mut msg = build_mac0(1); // A128GCM is not a MAC algorithm
        assert!(matches!(msg.create_tag(&[0u8; 16]), Err(Error::UnknownAlgorithm)));
    }

    #[test]
    fn test_mac_with_direct_recipient() {
        let key = hmac_key();

        let mut msg = CoseMac::new();
        msg.put_header(label::ALG, Value::Integer(5.into()), Bucket::Protected).unwrap();
        msg.set_payload(PAYLOAD).unwrap();

        let mut r = Recipient::new();
        r.put_header(label::ALG, Value::Integer((-6).into()), Bucket::Unprotected).unwrap();
        r.set_key(CoseKey::symmetric(&key)).unwrap();
        msg.add_recipient(r).unwrap();

        msg.create_tag().unwrap();
        let bytes = msg.to_bytes().unwrap();

        let mut decoded = CoseMac::from_bytes(&bytes).unwrap();
        decoded
            .recipient_mut(0)
            .unwrap()
            .set_key(CoseKey::symmetric(&key))
            .unwrap();
        decoded.verify_tag(0).unwrap();
    }

    #[test]
    fn test_mac_with_aes_kw_recipient() {
        let kek = [0x81u8; 24]; // A192KW

        let mut msg = CoseMac::new();
        msg.put_header(label::ALG, Value::Integer(6.into()), Bucket::Protected).unwrap();
        msg.set_payload(PAYLOAD).unwrap();

        let mut r = Recipient::new();
        r.put_header(label::ALG, Value::Integer((-4).into()), Bucket::Unprotected).unwrap();
        r.set_key(CoseKey::symmetric(&kek)).unwrap();
        msg.add_recipient(r).unwrap();

        msg.create_tag().unwrap();
        let bytes = msg.to_bytes().unwrap();

        let mut decoded = CoseMac::from_bytes(&bytes).unwrap();
        decoded
            .recipient_mut(0)
            .unwrap()
            .set_key(CoseKey::symmetric(&kek))
            .unwrap();
        decoded.verify_tag(0).unwrap();
    }
}
