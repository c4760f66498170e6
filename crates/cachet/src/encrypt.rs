//! The AEAD message variants: `COSE_Encrypt` (enveloped, with recipients)
//! and `COSE_Encrypt0` (a pre-shared content key).

use cachet_core::{label, Algorithm, Bucket, Error, Family, Result, Search};
use cachet_crypto::aead;
use ciborium::value::Value;
use zeroize::Zeroizing;

use crate::aad::{self, context};
use crate::message::{self, tag, MessageCore};
use crate::recipient::{self, Recipient};

/// Read the AEAD algorithm out of a message's headers.
fn aead_alg(core: &MessageCore) -> Result<Algorithm> {
    let alg = match core.headers.get(label::ALG, Search::Wire) {
        Some(v) => Algorithm::from_value(v)?,
        None => return Err(Error::UnknownAlgorithm),
    };
    match alg.family() {
        Family::AesGcm | Family::AesCcm | Family::ChaChaPoly => Ok(alg),
        _ => Err(Error::UnknownAlgorithm),
    }
}

/// The message nonce: a full IV header, or a partial IV (label 6) XORed
/// into the context IV held in the do-not-send bucket (RFC 8152 3.1).
fn message_iv(core: &MessageCore, alg: Algorithm) -> Result<Vec<u8>> {
    let nonce_len = alg.nonce_bits().ok_or(Error::UnknownAlgorithm)? / 8;
    let partial = core.headers.get(label::PARTIAL_IV, Search::Any);
    if let Some(Value::Bytes(partial)) = partial {
        let base = match core.headers.get(label::IV, Search::DontSend) {
            Some(Value::Bytes(b)) => b,
            _ => return Err(Error::InvalidParameter("partial IV requires a context IV")),
        };
        if base.len() != nonce_len || partial.len() > nonce_len {
            return Err(Error::InvalidParameter("IV length mismatch"));
        }
        let mut nonce = vec![0u8; nonce_len];
        nonce[nonce_len - partial.len()..].copy_from_slice(partial);
        for (n, b) in nonce.iter_mut().zip(base) {
            *n ^= b;
        }
        return Ok(nonce);
    }
    match core.headers.get(label::IV, Search::Any) {
        Some(Value::Bytes(iv)) => Ok(iv.clone()),
        _ => Err(Error::InvalidParameter("message has no IV")),
    }
}

fn seal_body(
    core: &mut MessageCore,
    ctx: &str,
    alg: Algorithm,
    cek: &[u8],
) -> Result<Vec<u8>> {
    let iv = message_iv(core, alg)?;
    let content = core
        .content
        .clone()
        .ok_or(Error::InvalidParameter("no content to encrypt"))?;
    let protected = core.protected_bytes()?;
    let aad = aad::enc_structure(ctx, &protected, &core.external)?;
    Ok(aead::seal(alg, cek, &iv, &aad, &content)?)
}

fn open_body(
    core: &mut MessageCore,
    ctx: &str,
    alg: Algorithm,
    cek: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let iv = message_iv(core, alg)?;
    let protected = core.protected_bytes()?;
    let aad = aad::enc_structure(ctx, &protected, &core.external)?;
    Ok(aead::open(alg, cek, &iv, &aad, ciphertext)?)
}

/// A `COSE_Encrypt0` message: AEAD with an externally provided key.
///
/// Wire layout: `[protected, unprotected, ciphertext]`, tag 16.
#[derive(Default)]
pub struct CoseEncrypt0 {
    core: MessageCore,
    ciphertext: Option<Vec<u8>>,
}

impl CoseEncrypt0 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::ENCRYPT0, 3)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        let ciphertext = message::body_slot(&items[2])?;
        Ok(Self { core, ciphertext })
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    pub fn set_content(&mut self, content: &[u8]) -> Result<()> {
        self.core.set_content(content)
    }

    pub fn set_external(&mut self, external: &[u8]) -> Result<()> {
        self.core.set_external(external)
    }

    /// Encrypt the content in place with the given CEK.
    pub fn encrypt(&mut self, key: &[u8]) -> Result<()> {
        let alg = aead_alg(&self.core)?;
        check_cek_len(alg, key)?;
        tracing::debug!(alg = alg.id(), "encrypting Encrypt0 message");
        let body = seal_body(&mut self.core, context::ENCRYPT0, alg, key)?;
        self.ciphertext = Some(body);
        self.core.finalized = true;
        Ok(())
    }

    /// Decrypt and return the content.
    pub fn decrypt(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let alg = aead_alg(&self.core)?;
        check_cek_len(alg, key)?;
        let ciphertext = self
            .ciphertext
            .clone()
            .ok_or(Error::InvalidParameter("message has no ciphertext"))?;
        let plaintext = open_body(&mut self.core, context::ENCRYPT0, alg, key, &ciphertext)?;
        self.core.content = Some(plaintext.clone());
        Ok(plaintext)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::ENCRYPT0))
    }

    fn encode(&mut self, tag: Option<u64>) -> Result<Vec<u8>> {
        let ciphertext = self
            .ciphertext
            .clone()
            .ok_or(Error::InvalidParameter("message is not encrypted yet"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        message::encode_envelope(vec![protected, unprotected, Value::Bytes(ciphertext)], tag)
    }
}

/// A `COSE_Encrypt` (enveloped) message: AEAD content with the CEK
/// delivered through a tree of recipients.
///
/// Wire layout: `[protected, unprotected, ciphertext, recipients]`, tag 96.
#[derive(Default)]
pub struct CoseEncrypt {
    core: MessageCore,
    ciphertext: Option<Vec<u8>>,
    recipients: Vec<Recipient>,
}

impl CoseEncrypt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let items = message::decode_envelope(bytes, tag::ENCRYPT, 4)?;
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        let ciphertext = message::body_slot(&items[2])?;
        let mut recipients = Vec::new();
        for r in cachet_core::cbor::as_array(&items[3])? {
            recipients.push(Recipient::from_value(r)?);
        }
        Ok(Self { core, ciphertext, recipients })
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    pub fn set_content(&mut self, content: &[u8]) -> Result<()> {
        self.core.set_content(content)
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

    /// Encrypt the content, resolving the CEK through the recipients per
    /// the random-CEK rule.
    pub fn encrypt(&mut self) -> Result<()> {
        self.encrypt_inner(None)
    }

    /// Encrypt with a caller-supplied CEK; recipients still wrap it.
    pub fn encrypt_with_cek(&mut self, cek: &[u8]) -> Result<()> {
        self.encrypt_inner(Some(cek))
    }

    fn encrypt_inner(&mut self, explicit: Option<&[u8]>) -> Result<()> {
        let alg = aead_alg(&self.core)?;
        let cek_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        tracing::debug!(alg = alg.id(), recipients = self.recipients.len(),
            "encrypting enveloped message");
        let cek = recipient::resolve_cek(&mut self.recipients, alg, cek_bits, explicit)?;
        let body = seal_body(&mut self.core, context::ENCRYPT, alg, &cek)?;
        self.ciphertext = Some(body);
        self.core.finalized = true;
        Ok(())
    }

    /// Decrypt via the designated recipient and return the content.
    pub fn decrypt(&mut self, recipient_index: usize) -> Result<Vec<u8>> {
        let alg = aead_alg(&self.core)?;
        let cek_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        let ciphertext = self
            .ciphertext
            .clone()
            .ok_or(Error::InvalidParameter("message has no ciphertext"))?;
        let recipient = self
            .recipients
            .get_mut(recipient_index)
            .ok_or(Error::InvalidParameter("recipient index out of range"))?;
        let cek: Zeroizing<Vec<u8>> = recipient.decrypt(alg, cek_bits)?;
        let plaintext = open_body(&mut self.core, context::ENCRYPT, alg, &cek, &ciphertext)?;
        self.core.content = Some(plaintext.clone());
        Ok(plaintext)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(None)
    }

    pub fn to_tagged_bytes(&mut self) -> Result<Vec<u8>> {
        self.encode(Some(tag::ENCRYPT))
    }

    fn encode(&mut self, tag: Option<u64>) -> Result<Vec<u8>> {
        let ciphertext = self
            .ciphertext
            .clone()
            .ok_or(Error::InvalidParameter("message is not encrypted yet"))?;
        let (protected, unprotected) = self.core.header_slots()?;
        let mut recipients = Vec::with_capacity(self.recipients.len());
        for r in &mut self.recipients {
            recipients.push(r.to_value()?);
        }
        message::encode_envelope(
            vec![
                protected,
                unprotected,
                Value::Bytes(ciphertext),
                Value::Array(recipients),
            ],
            tag,
        )
    }
}

fn check_cek_len(alg: Algorithm, key: &[u8]) -> Result<()> {
    let expected = alg.key_bits().ok_or(Error::UnknownAlgorithm)? / 8;
    if key.len() != expected {
        return Err(Error::InvalidParameter("content key length mismatch"));
    }
    Ok(())
}
