//! The signature message variants: `COSE_Sign` (per-signer loop) and
//! `COSE_Sign1` (a single implicit signer).

use cachet_core::{cbor, label, Algorithm, Bucket, CoseKey, Error, Family, Result, Search};
use cachet_crypto::sign as sig;
use ciborium::value::Value;

use crate::aad::{self, context};
use crate::message::{self, tag, MessageCore};

fn sig_alg(headers_alg: Option<&Value>) -> Result<Algorithm> {
    let alg = match headers_alg {
        Some(v) => Algorithm::from_value(v)?,
        None => return Err(Error::UnknownAlgorithm),
    };
    match alg.family() {
        Family::Ecdsa | Family::EdDsa => Ok(alg),
        _ => Err(Error::UnknownAlgorithm),
    }
}

/// One signer attached to a `COSE_Sign` message: its own header buckets,
/// key, and signature slot.
///
/// Wire layout: `[protected, unprotected, signature]`.
#[derive(Default)]
pub struct Signer {
    pub(crate) core: MessageCore,
    key: Option<CoseKey>,
    signature: Option<Vec<u8>>,
}

impl Signer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the signer's key: private for signing, public for
    /// verification.
    pub fn set_key(&mut self, key: CoseKey) -> Result<()> {
        if self.core.finalized {
            return Err(Error::InvalidParameter("signer is finalized"));
        }
        self.key = Some(key);
        Ok(())
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    fn alg(&self) -> Result<Algorithm> {
        sig_alg(self.core.headers.get(label::ALG, Search::Wire))
    }

    fn key(&self) -> Result<&CoseKey> {
        self.key.as_ref().ok_or(Error::InvalidParameter("signer has no key"))
    }

    fn sign(&mut self, body_protected: &[u8], external: &[u8], payload: &[u8]) -> Result<()> {
        let alg = self.alg()?;
        let own_protected = self.core.protected_bytes()?;
        let input = aad::sig_structure(
            context::SIGNATURE,
            body_protected,
            Some(&own_protected),
            external,
            payload,
        )?;
        self.signature = Some(sig::sign(alg, self.key()?, &input)?);
        self.core.finalized = true;
        Ok(())
    }

    fn verify(&mut self, body_protected: &[u8], external: &[u8], payload: &[u8]) -> Result<()> {
        let alg = self.alg()?;
        let signature = self
            .signature
            .clone()
            .ok_or(Error::InvalidParameter("signer has no signature"))?;
        let own_protected = self.core.protected_bytes()?;
        let input = aad::sig_structure(
            context::SIGNATURE,
            body_protected,
            Some(&own_protected),
            external,
            payload,
        )?;
        sig::verify(alg, self.key()?, &input, &signature)?;
        Ok(())
    }

    fn to_value(&mut self) -> Result<Value> {
        let signature = self
            .signature
            .clone()
            .ok_or(Error::InvalidParameter("signer has not signed yet"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        Ok(Value::Array(vec![protected, unprotected, Value::Bytes(signature)]))
    }

    fn from_value(value: &Value) -> Result<Self> {
        let items = cbor::as_array(value)?;
        if items.len() != 3 {
            return Err(Error::Cbor("signer must be a 3-element array".into()));
        }
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        let signature = message::body_slot(&items[2])?;
        Ok(Self { core, key: None, signature })
    }
}

/// A multi-signer `COSE_Sign` message.
///
/// Wire layout: `[protected, unprotected, payload, signers]`, tag 98.
#[derive(Default)]
pub struct CoseSign {
    core: MessageCore,
    signers: Vec<Signer>,
}

impl CoseSign {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::SIGN, 4)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        core.content = message::body_slot(&items[2])?;
        let mut signers = Vec::new();
        for s in cbor::as_array(&items[3])? {
            signers.push(Signer::from_value(s)?);
        }
        Ok(Self { core, signers })
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

    pub fn add_signer(&mut self, signer: Signer) -> Result<()> {
        if self.core.finalized {
            return Err(Error::InvalidParameter("message is finalized"));
        }
        self.signers.push(signer);
        Ok(())
    }

    pub fn signer_mut(&mut self, index: usize) -> Option<&mut Signer> {
        self.signers.get_mut(index)
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Run every signer over the payload.
    pub fn sign(&mut self) -> Result<()> {
        if self.signers.is_empty() {
            return Err(Error::InvalidParameter("message has no signers"));
        }
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let body_protected = self.core.protected_bytes()?;
        let external = self.core.external.clone();
        tracing::debug!(signers = self.signers.len(), "signing message");
        for signer in &mut self.signers {
            signer.sign(&body_protected, &external, &payload)?;
        }
        self.core.finalized = true;
        Ok(())
    }

    /// Verify the designated signer's signature.
    pub fn verify(&mut self, signer_index: usize) -> Result<()> {
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let body_protected = self.core.protected_bytes()?;
        let external = self.core.external.clone();
        let signer = self
            .signers
            .get_mut(signer_index)
            .ok_or(Error::InvalidParameter("signer index out of range"))?;
        signer.verify(&body_protected, &external, &payload)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::SIGN))
    }

    fn encode(&mut self, wire_tag: Option<u64>) -> Result<Vec<u8>> {
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        let mut signers = Vec::with_capacity(self.signers.len());
        for s in &mut self.signers {
            signers.push(s.to_value()?);
        }
        message::encode_envelope(
            vec![protected, unprotected, Value::Bytes(payload), Value::Array(signers)],
            wire_tag,
        )
    }
}

/// A single-signer `COSE_Sign1` message.
///
/// Wire layout: `[protected, unprotected, payload, signature]`, tag 18.
#[derive(Default)]
pub struct CoseSign1 {
    core: MessageCore,
    signature: Option<Vec<u8>>,
}

impl CoseSign1 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::SIGN1, 4)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        core.content = message::body_slot(&items[2])?;
        let signature = message::body_slot(&items[3])?;
        Ok(Self { core, signature })
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

    /// Sign the payload with the given private key.
    pub fn sign(&mut self, key: &CoseKey) -> Result<()> {
        let alg = sig_alg(self.core.headers.get(label::ALG, Search::Wire))?;
        let input = self.sig_input()?;
        self.signature = Some(sig::sign(alg, key, &input)?);
        self.core.finalized = true;
        Ok(())
    }

    /// Verify the signature with the given public key.
    pub fn verify(&mut self, key: &CoseKey) -> Result<()> {
        let alg = sig_alg(self.core.headers.get(label::ALG, Search::Wire))?;
        let signature = self
            .signature
            .clone()
            .ok_or(Error::InvalidParameter("message has no signature"))?;
        let input = self.sig_input()?;
        sig::verify(alg, key, &input, &signature)?;
        Ok(())
    }

    fn sig_input(&mut self) -> Result<Vec<u8>> {
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let protected = self.core.protected_bytes()?;
        aad::sig_structure(context::SIGNATURE1, &protected, None, &self.core.external, &payload)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::SIGN1))
    }

    fn encode(&mut self, wire_tag: Option<u64>) -> Result<Vec<u8>> {
        let signature = self
            .signature
            .clone()
            .ok_or(Error::InvalidParameter("message is not signed yet"))?;
        let payload = self
            .core
            .content
            .clone()
            .ok_or(Error::InvalidParameter("message has no payload"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        message::encode_envelope(
            vec![protected, unprotected, Value::Bytes(payload), Value::Bytes(signature)],
            wire_tag,
        )
    }
}
