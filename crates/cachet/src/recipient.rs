//! Recipients and the recursive content-key resolution engine.
//!
//! A recipient is itself a small message: headers plus a body holding the
//! wrapped CEK (empty for the direct family). Resolving the CEK of an
//! outer message walks the recipient tree: direct recipients supply or
//! derive the CEK in place, key-wrap recipients derive a KEK (possibly
//! through nested recipients) and wrap or unwrap the CEK under it.

use cachet_core::{cbor, label, Algorithm, Bucket, CoseKey, Error, Family, Result, Search};
use cachet_crypto::{ecdh, kdf, kw, rng};
use ciborium::value::Value;
use zeroize::Zeroizing;

use crate::kdf_context;
use crate::message::{self, MessageCore};

/// One recipient of an enveloped or MAC'd message.
#[derive(Default)]
pub struct Recipient {
    pub(crate) core: MessageCore,
    /// The attached COSE_Key: peer public key on encrypt, own private key
    /// on decrypt, or a symmetric key for direct/key-wrap algorithms.
    key: Option<CoseKey>,
    /// Sender's static key for the ECDH-SS algorithms.
    sender_key: Option<CoseKey>,
    /// Raw shared secret, an alternative to a symmetric COSE_Key.
    secret: Option<Zeroizing<Vec<u8>>>,
    /// The wrapped CEK (empty for direct-family recipients).
    body: Option<Vec<u8>>,
    recipients: Vec<Recipient>,
}

impl Recipient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a key object. Which components must be present depends on
    /// the recipient algorithm and the direction of the operation.
    pub fn set_key(&mut self, key: CoseKey) -> Result<()> {
        self.check_mutable()?;
        self.key = Some(key);
        Ok(())
    }

    /// Attach a raw shared secret instead of a key object.
    pub fn set_secret(&mut self, secret: &[u8]) -> Result<()> {
        self.check_mutable()?;
        self.secret = Some(Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    /// Attach the sender's static key for ECDH-SS. Must carry the private
    /// component when encrypting.
    pub fn set_sender_key(&mut self, key: CoseKey) -> Result<()> {
        self.check_mutable()?;
        self.sender_key = Some(key);
        Ok(())
    }

    pub fn put_header(&mut self, label: i64, value: Value, bucket: Bucket) -> Result<()> {
        self.core.put_header(label, value, bucket)
    }

    pub fn get_header(&self, label: i64, search: Search) -> Option<&Value> {
        self.core.get_header(label, search)
    }

    /// Nest a recipient; the nested layer wraps this recipient's KEK.
    pub fn add_recipient(&mut self, recipient: Recipient) -> Result<()> {
        self.check_mutable()?;
        self.recipients.push(recipient);
        Ok(())
    }

    pub fn recipient_mut(&mut self, index: usize) -> Option<&mut Recipient> {
        self.recipients.get_mut(index)
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    fn check_mutable(&self) -> Result<()> {
        if self.core.finalized {
            return Err(Error::InvalidParameter("recipient is finalized"));
        }
        Ok(())
    }

    /// The recipient's declared algorithm. The algorithm family, not any
    /// cached flag, is the ground truth for direct-vs-wrap decisions.
    pub(crate) fn alg(&self) -> Result<Algorithm> {
        match self.core.headers.get(label::ALG, Search::Wire) {
            Some(v) => Algorithm::from_value(v),
            None => Err(Error::UnknownAlgorithm),
        }
    }

    // --- decrypt side -----------------------------------------------------

    /// Recover the CEK for a target `(alg, key bits)` pair.
    ///
    /// A failed attempt drops any partially derived key material (the
    /// buffers are zeroized) and leaves the recipient untouched, so the
    /// caller can move on to the next recipient.
    pub(crate) fn decrypt(
        &mut self,
        target_alg: Algorithm,
        cek_bits: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let alg = self.alg()?;
        let cek_len = cek_bits / 8;

        match alg.family() {
            Family::Direct => {
                let key = self.direct_key()?;
                if key.len() != cek_len {
                    return Err(Error::InvalidParameter("direct key length mismatch"));
                }
                Ok(key)
            }
            Family::AesKw => {
                let kek = self.resolve_kek_receive(alg)?;
                let cek = Zeroizing::new(kw::unwrap(&kek, self.wrapped_body()?)?);
                if cek.len() != cek_len {
                    return Err(Error::InvalidParameter("unwrapped key length mismatch"));
                }
                Ok(cek)
            }
            Family::DirectHkdfHmac | Family::DirectHkdfAes | Family::EcdhEsHkdf
            | Family::EcdhSsHkdf => self.derive_kdf_cek(target_alg, cek_bits, false),
            Family::EcdhEsKw | Family::EcdhSsKw => {
                let kek = self.derive_ecdh_kek(alg, false)?;
                let cek = Zeroizing::new(kw::unwrap(&kek, self.wrapped_body()?)?);
                if cek.len() != cek_len {
                    return Err(Error::InvalidParameter("unwrapped key length mismatch"));
                }
                Ok(cek)
            }
            _ => Err(Error::UnknownAlgorithm),
        }
    }

    // --- encrypt side -----------------------------------------------------

    /// Derive the CEK from a direct-family recipient. Called for the first
    /// direct recipient when the outer message has no caller-supplied CEK.
    pub(crate) fn generate_cek(
        &mut self,
        target_alg: Algorithm,
        cek_bits: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let alg = self.alg()?;
        // Serialize protected headers first; the KDF context binds them.
        self.core.protected_bytes()?;
        match alg.family() {
            Family::Direct => {
                let key = self.direct_key()?;
                if key.len() != cek_bits / 8 {
                    return Err(Error::InvalidParameter("direct key length mismatch"));
                }
                Ok(key)
            }
            Family::DirectHkdfHmac | Family::DirectHkdfAes | Family::EcdhEsHkdf
            | Family::EcdhSsHkdf => self.derive_kdf_cek(target_alg, cek_bits, true),
            _ => Err(Error::InvalidParameter("recipient algorithm cannot generate the key")),
        }
    }

    /// Wrap (or, for the direct family, acknowledge) the resolved CEK.
    pub(crate) fn encrypt(&mut self, cek: &[u8]) -> Result<()> {
        let alg = self.alg()?;
        self.core.protected_bytes()?;

        match alg.family() {
            Family::Direct | Family::DirectHkdfHmac | Family::DirectHkdfAes
            | Family::EcdhEsHkdf | Family::EcdhSsHkdf => {
                if !self.recipients.is_empty() {
                    return Err(Error::InvalidParameter(
                        "direct recipients cannot nest recipients",
                    ));
                }
                self.body = Some(Vec::new());
            }
            Family::AesKw => {
                let kek_len = alg.key_bits().ok_or(Error::UnknownAlgorithm)? / 8;
                let kek = match self.local_key_material() {
                    Some(kek) => {
                        if kek.len() != kek_len {
                            return Err(Error::InvalidParameter("KEK length mismatch"));
                        }
                        for r in &mut self.recipients {
                            r.encrypt(&kek)?;
                        }
                        kek
                    }
                    None => {
                        if self.recipients.is_empty() {
                            return Err(Error::InvalidParameter(
                                "key-wrap recipient has no key",
                            ));
                        }
                        resolve_cek(&mut self.recipients, alg, kek_len * 8, None)?
                    }
                };
                self.body = Some(kw::wrap(&kek, cek)?);
            }
            Family::EcdhEsKw | Family::EcdhSsKw => {
                let kek = self.derive_ecdh_kek(alg, true)?;
                self.body = Some(kw::wrap(&kek, cek)?);
            }
            _ => {
                return Err(Error::InvalidParameter(
                    "algorithm is not a recipient algorithm",
                ))
            }
        }
        self.core.finalized = true;
        Ok(())
    }

    // --- key derivation helpers -------------------------------------------

    /// CEK derivation shared by the HKDF-based direct families. `sending`
    /// selects whether ECDH uses (and writes) an ephemeral/static sender
    /// key or reads the peer's from the headers.
    fn derive_kdf_cek(
        &mut self,
        target_alg: Algorithm,
        cek_bits: usize,
        sending: bool,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let alg = self.alg()?;
        match alg.family() {
            Family::DirectHkdfHmac => {
                let ikm = self.direct_key()?;
                let context = self.kdf_context_bytes(target_alg.id(), cek_bits)?;
                let hash = alg.hash_bits().ok_or(Error::UnknownAlgorithm)?;
                Ok(kdf::hkdf(hash, self.salt_bytes().as_deref(), &ikm, &context, cek_bits / 8)?)
            }
            Family::DirectHkdfAes => {
                let ikm = self.direct_key()?;
                let context = self.kdf_context_bytes(target_alg.id(), cek_bits)?;
                Ok(kdf::hkdf_aes_expand(&ikm, &context, cek_bits / 8)?)
            }
            Family::EcdhEsHkdf | Family::EcdhSsHkdf => {
                let secret = if sending {
                    self.ecdh_secret_send(alg)?
                } else {
                    self.ecdh_secret_receive(alg)?
                };
                let context = self.kdf_context_bytes(target_alg.id(), cek_bits)?;
                let hash = alg.hash_bits().ok_or(Error::UnknownAlgorithm)?;
                Ok(kdf::hkdf(hash, self.salt_bytes().as_deref(), &secret, &context, cek_bits / 8)?)
            }
            _ => Err(Error::UnknownAlgorithm),
        }
    }

    /// Derive the KEK for the ECDH+KW families: the KDF context uses the
    /// recipient's own algorithm and the KEK length.
    fn derive_ecdh_kek(&mut self, alg: Algorithm, sending: bool) -> Result<Zeroizing<Vec<u8>>> {
        let kek_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        let secret = if sending {
            self.ecdh_secret_send(alg)?
        } else {
            self.ecdh_secret_receive(alg)?
        };
        let context = self.kdf_context_bytes(alg.id(), kek_bits)?;
        let hash = alg.hash_bits().ok_or(Error::UnknownAlgorithm)?;
        Ok(kdf::hkdf(hash, self.salt_bytes().as_deref(), &secret, &context, kek_bits / 8)?)
    }

    /// ECDH on the receive side: our private key agrees with the peer key
    /// found in the ephemeral (ES) or static (SS) header slot.
    fn ecdh_secret_receive(&mut self, alg: Algorithm) -> Result<Zeroizing<Vec<u8>>> {
        let peer_label = match alg.family() {
            Family::EcdhEsHkdf | Family::EcdhEsKw => label::ECDH_EPHEMERAL_KEY,
            Family::EcdhSsHkdf | Family::EcdhSsKw => label::ECDH_STATIC_KEY,
            _ => return Err(Error::UnknownAlgorithm),
        };
        let peer = self
            .core
            .headers
            .get(peer_label, Search::Wire)
            .ok_or(Error::InvalidParameter("peer key header is missing"))?;
        let peer = CoseKey::from_value(peer)?;
        let own = self
            .key
            .as_ref()
            .ok_or(Error::InvalidParameter("recipient has no private key"))?;
        Ok(ecdh::shared_secret(own, &peer)?)
    }

    /// ECDH on the send side. For ES a fresh ephemeral is generated on the
    /// peer's curve (honoring a caller-staged ephemeral that carries its
    /// private part) and its public half is written to the unprotected
    /// headers. For SS the configured static sender key is used and its
    /// public half is written if absent.
    fn ecdh_secret_send(&mut self, alg: Algorithm) -> Result<Zeroizing<Vec<u8>>> {
        let peer = self
            .key
            .clone()
            .ok_or(Error::InvalidParameter("recipient has no peer key"))?;
        match alg.family() {
            Family::EcdhEsHkdf | Family::EcdhEsKw => {
                let staged = self
                    .core
                    .headers
                    .get(label::ECDH_EPHEMERAL_KEY, Search::Any)
                    .map(CoseKey::from_value)
                    .transpose()?;
                let ephemeral = match staged {
                    Some(k) if k.d().is_some() => k,
                    Some(_) => {
                        return Err(Error::InvalidParameter(
                            "staged ephemeral key has no private part",
                        ))
                    }
                    None => {
                        let curve = peer
                            .crv()
                            .ok_or(Error::InvalidParameter("peer key has no curve"))?;
                        ecdh::generate_ephemeral(curve)?
                    }
                };
                let secret = ecdh::shared_secret(&ephemeral, &peer)?;
                // Only the public half is transmitted.
                self.core.headers.remove(label::ECDH_EPHEMERAL_KEY);
                self.core.headers.put(
                    label::ECDH_EPHEMERAL_KEY,
                    ephemeral.public_part().to_value(),
                    Bucket::Unprotected,
                )?;
                Ok(secret)
            }
            Family::EcdhSsHkdf | Family::EcdhSsKw => {
                let sender = self
                    .sender_key
                    .clone()
                    .ok_or(Error::InvalidParameter("no static sender key configured"))?;
                if sender.d().is_none() {
                    return Err(Error::InvalidParameter("static sender key has no private part"));
                }
                let secret = ecdh::shared_secret(&sender, &peer)?;
                if self.core.headers.get(label::ECDH_STATIC_KEY, Search::Wire).is_none() {
                    self.core.headers.put(
                        label::ECDH_STATIC_KEY,
                        sender.public_part().to_value(),
                        Bucket::Unprotected,
                    )?;
                }
                Ok(secret)
            }
            _ => Err(Error::UnknownAlgorithm),
        }
    }

    /// The KEK for a plain AES-KW recipient on the receive side: local key
    /// material, or a nested recipient that can produce it.
    fn resolve_kek_receive(&mut self, alg: Algorithm) -> Result<Zeroizing<Vec<u8>>> {
        let kek_bits = alg.key_bits().ok_or(Error::UnknownAlgorithm)?;
        if let Some(kek) = self.local_key_material() {
            if kek.len() != kek_bits / 8 {
                return Err(Error::InvalidParameter("KEK length mismatch"));
            }
            return Ok(kek);
        }
        for nested in &mut self.recipients {
            match nested.decrypt(alg, kek_bits) {
                Ok(kek) => return Ok(kek),
                Err(e) => {
                    tracing::warn!(error = %e, "nested recipient could not produce the KEK");
                }
            }
        }
        Err(Error::NoRecipientFound)
    }

    fn direct_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.local_key_material()
            .ok_or(Error::InvalidParameter("recipient has no symmetric key"))
    }

    fn local_key_material(&self) -> Option<Zeroizing<Vec<u8>>> {
        if let Some(k) = self.key.as_ref().and_then(|k| k.k()) {
            return Some(Zeroizing::new(k.to_vec()));
        }
        self.secret.clone()
    }

    fn salt_bytes(&self) -> Option<Vec<u8>> {
        match self.core.headers.get(label::HKDF_SALT, Search::Any) {
            Some(Value::Bytes(b)) => Some(b.clone()),
            _ => None,
        }
    }

    fn kdf_context_bytes(&mut self, alg_id: i64, key_bits: usize) -> Result<Vec<u8>> {
        let protected = self.core.protected_bytes()?;
        kdf_context::build(alg_id, key_bits, &self.core.headers, &protected)
    }

    fn wrapped_body(&self) -> Result<&[u8]> {
        match self.body.as_deref() {
            Some(b) if !b.is_empty() => Ok(b),
            _ => Err(Error::InvalidParameter("recipient carries no wrapped key")),
        }
    }

    // --- wire format ------------------------------------------------------

    /// `[protected, unprotected, body, ?recipients]`
    pub(crate) fn to_value(&mut self) -> Result<Value> {
        let (protected, unprotected) = self.core.header_slots()?;
        let body = Value::Bytes(self.body.clone().unwrap_or_default());
        let mut items = vec![protected, unprotected, body];
        if !self.recipients.is_empty() {
            let mut nested = Vec::with_capacity(self.recipients.len());
            for r in &mut self.recipients {
                nested.push(r.to_value()?);
            }
            items.push(Value::Array(nested));
        }
        Ok(Value::Array(items))
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        let items = cbor::as_array(value)?;
        if items.len() != 3 && items.len() != 4 {
            return Err(Error::Cbor("recipient must be a 3- or 4-element array".into()));
        }
        let mut core = MessageCore::new();
        core.absorb_slots(&items[0], &items[1])?;
        let body = message::body_slot(&items[2])?;
        let mut recipients = Vec::new();
        if items.len() == 4 {
            for nested in cbor::as_array(&items[3])? {
                recipients.push(Recipient::from_value(nested)?);
            }
        }
        Ok(Self {
            core,
            key: None,
            sender_key: None,
            secret: None,
            body,
            recipients,
        })
    }
}

/// Resolve the CEK for an outer message: use the caller-supplied key when
/// present, otherwise apply the random-CEK rule over the recipient set,
/// then let every recipient wrap the result.
pub(crate) fn resolve_cek(
    recipients: &mut [Recipient],
    target_alg: Algorithm,
    cek_bits: usize,
    explicit: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>> {
    let cek = if let Some(key) = explicit {
        if key.len() != cek_bits / 8 {
            return Err(Error::InvalidParameter("content key length mismatch"));
        }
        Zeroizing::new(key.to_vec())
    } else {
        let mut any_direct = false;
        let mut any_wrap = false;
        for r in recipients.iter() {
            if r.alg()?.is_direct_like() {
                any_direct = true;
            } else {
                any_wrap = true;
            }
        }
        if any_direct && any_wrap {
            return Err(Error::InvalidParameter(
                "direct and key-wrap recipients cannot be mixed",
            ));
        }
        if any_direct {
            // The first direct recipient produces the key for everyone.
            let first = recipients
                .iter_mut()
                .find(|r| r.alg().map(Algorithm::is_direct_like).unwrap_or(false))
                .expect("any_direct implies a direct recipient");
            first.generate_cek(target_alg, cek_bits)?
        } else if recipients.is_empty() {
            return Err(Error::InvalidParameter(
                "no recipients and no caller-supplied content key",
            ));
        } else {
            rng::random_key(cek_bits / 8)
        }
    };

    for r in recipients.iter_mut() {
        r.encrypt(&cek)?;
    }
    Ok(cek)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient_with_alg(alg: Algorithm) -> Recipient {
        let mut r = Recipient::new();
        r.put_header(label::ALG, Value::Integer(alg.id().into()), Bucket::Unprotected).unwrap();
        r
    }

    #[test]
    fn test_direct_supplies_cek() {
        let mut r = recipient_with_alg(Algorithm::Direct);
        r.set_key(CoseKey::symmetric(&[0x11; 16])).unwrap();
        let cek = r.decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(&*cek, &[0x11; 16]);
    }

    #[test]
    fn test_direct_wrong_length_is_invalid_parameter() {
        let mut r = recipient_with_alg(Algorithm::Direct);
        r.set_key(CoseKey::symmetric(&[0x11; 24])).unwrap();
        assert!(matches!(
            r.decrypt(Algorithm::A128Gcm, 128),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_aes_kw_roundtrip() {
        let kek = [0x22u8; 16];
        let cek = [0x33u8; 16];

        let mut sender = recipient_with_alg(Algorithm::A128Kw);
        sender.set_key(CoseKey::symmetric(&kek)).unwrap();
        sender.encrypt(&cek).unwrap();
        assert_eq!(sender.body.as_ref().unwrap().len(), 24);

        let mut receiver = Recipient::from_value(&sender.to_value().unwrap()).unwrap();
        receiver.set_key(CoseKey::symmetric(&kek)).unwrap();
        let out = receiver.decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(&*out, &cek);
    }

    #[test]
    fn test_hkdf_direct_same_key_both_sides() {
        let make = || {
            let mut r = recipient_with_alg(Algorithm::DirectHkdfSha256);
            r.set_key(CoseKey::symmetric(b"shared input keying material!!!!")).unwrap();
            r
        };
        let cek_tx = make().generate_cek(Algorithm::A128Gcm, 128).unwrap();
        let cek_rx = make().decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(*cek_tx, *cek_rx);
        assert_eq!(cek_tx.len(), 16);

        // Binding to the outer algorithm: a different target derives a
        // different key.
        let other = make().generate_cek(Algorithm::AesCcm16_64_128, 128).unwrap();
        assert_ne!(*cek_tx, *other);
    }

    #[test]
    fn test_hkdf_aes_expand_both_sides() {
        let make = || {
            let mut r = recipient_with_alg(Algorithm::DirectHkdfAes128);
            r.set_key(CoseKey::symmetric(&[0x44; 16])).unwrap();
            r
        };
        let tx = make().generate_cek(Algorithm::A128Gcm, 128).unwrap();
        let rx = make().decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(*tx, *rx);
    }

    #[test]
    fn test_ecdh_es_hkdf_full_exchange() {
        use cachet_core::key::crv;

        let receiver_key = ecdh::generate_ephemeral(crv::P256).unwrap();

        // Sender sees only the receiver's public key.
        let mut sender = recipient_with_alg(Algorithm::EcdhEsHkdf256);
        sender.set_key(receiver_key.public_part()).unwrap();
        let cek_tx = sender.generate_cek(Algorithm::A128Gcm, 128).unwrap();
        sender.encrypt(&cek_tx).unwrap();

        // The ephemeral public key travels in the unprotected headers.
        let wire = sender.to_value().unwrap();
        let mut receiver = Recipient::from_value(&wire).unwrap();
        let eph = receiver.get_header(label::ECDH_EPHEMERAL_KEY, Search::Unprotected).unwrap();
        assert!(CoseKey::from_value(eph).unwrap().d().is_none());

        receiver.set_key(receiver_key).unwrap();
        let cek_rx = receiver.decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(*cek_tx, *cek_rx);
    }

    #[test]
    fn test_ecdh_ss_kw_full_exchange() {
        use cachet_core::key::crv;

        let receiver_key = ecdh::generate_ephemeral(crv::P256).unwrap();
        let sender_static = ecdh::generate_ephemeral(crv::P256).unwrap();
        let cek = [0x55u8; 16];

        let mut sender = recipient_with_alg(Algorithm::EcdhSsA128Kw);
        sender.set_key(receiver_key.public_part()).unwrap();
        sender.set_sender_key(sender_static.clone()).unwrap();
        sender.encrypt(&cek).unwrap();

        let mut receiver = Recipient::from_value(&sender.to_value().unwrap()).unwrap();
        receiver.set_key(receiver_key).unwrap();
        let out = receiver.decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(&*out, &cek);
    }

    #[test]
    fn test_mixed_direct_and_wrap_rejected() {
        let mut direct = recipient_with_alg(Algorithm::Direct);
        direct.set_key(CoseKey::symmetric(&[0x11; 16])).unwrap();
        let mut wrap = recipient_with_alg(Algorithm::A128Kw);
        wrap.set_key(CoseKey::symmetric(&[0x22; 16])).unwrap();

        let mut recipients = vec![direct, wrap];
        assert!(matches!(
            resolve_cek(&mut recipients, Algorithm::A128Gcm, 128, None),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_all_wrap_generates_random_cek() {
        let mut wrap = recipient_with_alg(Algorithm::A128Kw);
        wrap.set_key(CoseKey::symmetric(&[0x22; 16])).unwrap();
        let mut recipients = vec![wrap];
        let cek = resolve_cek(&mut recipients, Algorithm::A128Gcm, 128, None).unwrap();
        assert_eq!(cek.len(), 16);

        // And the single recipient can unwrap it again.
        let mut rx = Recipient::from_value(&recipients[0].to_value().unwrap()).unwrap();
        rx.set_key(CoseKey::symmetric(&[0x22; 16])).unwrap();
        assert_eq!(*rx.decrypt(Algorithm::A128Gcm, 128).unwrap(), *cek);
    }

    #[test]
    fn test_direct_recipient_cannot_nest() {
        let mut direct = recipient_with_alg(Algorithm::Direct);
        direct.set_key(CoseKey::symmetric(&[0x11; 16])).unwrap();
        direct.add_recipient(recipient_with_alg(Algorithm::A128Kw)).unwrap();
        assert!(matches!(direct.encrypt(&[0x11; 16]), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_missing_alg_is_unknown_algorithm() {
        let mut r = Recipient::new();
        r.set_key(CoseKey::symmetric(&[0x11; 16])).unwrap();
        assert!(matches!(r.decrypt(Algorithm::A128Gcm, 128), Err(Error::UnknownAlgorithm)));
    }

    #[test]
    fn test_text_alg_is_unknown_algorithm() {
        let mut r = Recipient::new();
        r.put_header(label::ALG, Value::Text("direct".into()), Bucket::Unprotected).unwrap();
        assert!(matches!(r.decrypt(Algorithm::A128Gcm, 128), Err(Error::UnknownAlgorithm)));
    }

    #[test]
    fn test_nested_kek_wrapping() {
        // Outer A128KW recipient whose KEK is itself wrapped by a nested
        // A128KW recipient holding a shared key.
        let shared = [0x77u8; 16];
        let cek = [0x88u8; 16];

        let mut nested = recipient_with_alg(Algorithm::A128Kw);
        nested.set_key(CoseKey::symmetric(&shared)).unwrap();

        let mut outer = recipient_with_alg(Algorithm::A128Kw);
        outer.add_recipient(nested).unwrap();
        outer.encrypt(&cek).unwrap();

        let mut rx = Recipient::from_value(&outer.to_value().unwrap()).unwrap();
        rx.recipient_mut(0).unwrap().set_key(CoseKey::symmetric(&shared)).unwrap();
        let out = rx.decrypt(Algorithm::A128Gcm, 128).unwrap();
        assert_eq!(&*out, &cek);
    }
}
