//! End-to-end scenarios across the message variants, exercising the wire
//! format, the recipient engine, and the failure paths together.

use cachet::{
    label, Bucket, CoseEncrypt, CoseEncrypt0, CoseKey, CoseMac0, CoseSign, CoseSign1, Error,
    Recipient, Search, Signer,
};
use cachet_core::key::crv;
use cachet_crypto::ecdh;
use ciborium::value::Value;

const CONTENT: &[u8] = b"This is the content.";

/// AES-CCM-16-64-128 Encrypt0 with the fixed key and IV from the CCM
/// example set: 20 content bytes plus an 8-byte tag.
#[test]
fn encrypt0_aes_ccm_scenario() {
    let key: Vec<u8> = (0u8..0x10).collect();
    let iv = hex::decode("a0a1a2a3a4a5a6a7a8a9aaabac").unwrap();

    let mut msg = CoseEncrypt0::new();
    msg.put_header(label::ALG, Value::Integer(10.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(iv), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();
    msg.encrypt(&key).unwrap();

    let wire = msg.to_bytes().unwrap();
    let mut received = CoseEncrypt0::from_bytes(&wire).unwrap();
    assert_eq!(received.decrypt(&key).unwrap(), CONTENT);

    // Body is ciphertext || tag = 20 + 8 bytes. The body is the third
    // element of the array; check it through a fresh decode.
    let value: Value = ciborium::from_reader(wire.as_slice()).unwrap();
    let items = match value {
        Value::Array(items) => items,
        _ => panic!("expected array"),
    };
    match &items[2] {
        Value::Bytes(body) => assert_eq!(body.len(), 28),
        _ => panic!("expected byte string body"),
    }
}

/// HMAC-256/64 MAC0: 8-byte tag; a single flipped payload bit fails
/// verification with a crypto error.
#[test]
fn mac0_hmac_256_64_scenario() {
    let key: Vec<u8> = (0u8..0x20).collect();

    let mut msg = CoseMac0::new();
    msg.put_header(label::ALG, Value::Integer(4.into()), Bucket::Protected).unwrap();
    msg.set_payload(CONTENT).unwrap();
    msg.create_tag(&key).unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseMac0::from_bytes(&wire).unwrap();
    received.verify_tag(&key).unwrap();

    // Flip payload byte 0 on the wire and re-verify.
    let value: Value = ciborium::from_reader(wire.as_slice()).unwrap();
    let mut items = match value {
        Value::Array(items) => items,
        _ => panic!("expected array"),
    };
    if let Value::Bytes(tag) = &items[3] {
        assert_eq!(tag.len(), 8);
    } else {
        panic!("expected tag bytes");
    }
    if let Value::Bytes(payload) = &mut items[2] {
        payload[0] ^= 0x01;
    }
    let mut tampered = Vec::new();
    ciborium::into_writer(&Value::Array(items), &mut tampered).unwrap();
    let mut received = CoseMac0::from_bytes(&tampered).unwrap();
    assert!(matches!(received.verify_tag(&key), Err(Error::CryptoFail)));
}

/// Enveloped + Direct: the recipient's 128-bit key is the CEK for
/// AES-GCM-128; a wrong-length key is a structural error.
#[test]
fn enveloped_direct_scenario() {
    let cek = [0x42u8; 16];

    let mut msg = CoseEncrypt::new();
    msg.put_header(label::ALG, Value::Integer(1.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(vec![0xc9; 12]), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();

    let mut recipient = Recipient::new();
    recipient
        .put_header(label::ALG, Value::Integer((-6).into()), Bucket::Unprotected)
        .unwrap();
    recipient.set_key(CoseKey::symmetric(&cek)).unwrap();
    msg.add_recipient(recipient).unwrap();
    msg.encrypt().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received
        .recipient_mut(0)
        .unwrap()
        .set_key(CoseKey::symmetric(&cek))
        .unwrap();
    assert_eq!(received.decrypt(0).unwrap(), CONTENT);

    // Wrong-length direct key: INVALID_PARAMETER, not a crypto failure.
    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received
        .recipient_mut(0)
        .unwrap()
        .set_key(CoseKey::symmetric(&[0x42; 24]))
        .unwrap();
    assert!(matches!(received.decrypt(0), Err(Error::InvalidParameter(_))));
}

/// Enveloped + A128KW over AES-CCM-16-64-128 with a random CEK: encode,
/// decode, unwrap, decrypt.
#[test]
fn enveloped_aes_kw_scenario() {
    let kek = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();

    let mut msg = CoseEncrypt::new();
    msg.put_header(label::ALG, Value::Integer(10.into()), Bucket::Protected).unwrap();
    msg.put_header(
        label::IV,
        Value::Bytes(hex::decode("89f52f65a1c580933b5261a72f").unwrap()),
        Bucket::Unprotected,
    )
    .unwrap();
    msg.set_content(CONTENT).unwrap();

    let mut recipient = Recipient::new();
    recipient
        .put_header(label::ALG, Value::Integer((-3).into()), Bucket::Unprotected)
        .unwrap();
    recipient.set_key(CoseKey::symmetric(&kek)).unwrap();
    msg.add_recipient(recipient).unwrap();
    msg.encrypt().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received
        .recipient_mut(0)
        .unwrap()
        .set_key(CoseKey::symmetric(&kek))
        .unwrap();
    assert_eq!(received.decrypt(0).unwrap(), CONTENT);

    // A wrong KEK fails inside the unwrap.
    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received
        .recipient_mut(0)
        .unwrap()
        .set_key(CoseKey::symmetric(&[0xee; 16]))
        .unwrap();
    assert!(received.decrypt(0).is_err());
}

/// Enveloped + ECDH-ES+A128KW over AES-GCM-128: the ephemeral public key
/// rides in the recipient's unprotected map and the peer's static private
/// key recovers the plaintext.
#[test]
fn enveloped_ecdh_es_kw_scenario() {
    let static_key = ecdh::generate_ephemeral(crv::P256).unwrap();

    let mut msg = CoseEncrypt::new();
    msg.put_header(label::ALG, Value::Integer(1.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(vec![0x5a; 12]), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();

    let mut recipient = Recipient::new();
    recipient
        .put_header(label::ALG, Value::Integer((-29).into()), Bucket::Unprotected)
        .unwrap();
    recipient.set_key(static_key.public_part()).unwrap();
    msg.add_recipient(recipient).unwrap();
    msg.encrypt().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    let ephemeral = received
        .recipient_mut(0)
        .unwrap()
        .get_header(label::ECDH_EPHEMERAL_KEY, Search::Unprotected)
        .cloned()
        .expect("ephemeral key must be transmitted");
    let ephemeral = CoseKey::from_value(&ephemeral).unwrap();
    assert_eq!(ephemeral.crv(), Some(crv::P256));
    assert!(ephemeral.d().is_none(), "private part must not be transmitted");

    received.recipient_mut(0).unwrap().set_key(static_key).unwrap();
    assert_eq!(received.decrypt(0).unwrap(), CONTENT);
}

/// Signed with two signers (ES256 and ES512): each verifies; swapping the
/// keys between them fails both.
#[test]
fn multi_signer_scenario() {
    let k256 = ecdh::generate_ephemeral(crv::P256).unwrap();
    let k521 = ecdh::generate_ephemeral(crv::P521).unwrap();

    let mut msg = CoseSign::new();
    msg.set_payload(CONTENT).unwrap();

    let mut s1 = Signer::new();
    s1.put_header(label::ALG, Value::Integer((-7).into()), Bucket::Protected).unwrap();
    s1.set_key(k256.clone()).unwrap();
    msg.add_signer(s1).unwrap();

    let mut s2 = Signer::new();
    s2.put_header(label::ALG, Value::Integer((-36).into()), Bucket::Protected).unwrap();
    s2.set_key(k521.clone()).unwrap();
    msg.add_signer(s2).unwrap();

    msg.sign().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseSign::from_bytes(&wire).unwrap();
    received.signer_mut(0).unwrap().set_key(k256.public_part()).unwrap();
    received.signer_mut(1).unwrap().set_key(k521.public_part()).unwrap();
    received.verify(0).unwrap();
    received.verify(1).unwrap();

    // Crossed keys cannot verify either signature.
    let mut crossed = CoseSign::from_bytes(&wire).unwrap();
    crossed.signer_mut(0).unwrap().set_key(k521.public_part()).unwrap();
    crossed.signer_mut(1).unwrap().set_key(k256.public_part()).unwrap();
    assert!(crossed.verify(0).is_err());
    assert!(crossed.verify(1).is_err());
}

/// ECDH-ES+HKDF-256 as a direct recipient: no wrapped key on the wire,
/// CEK derived on both ends.
#[test]
fn enveloped_ecdh_es_hkdf_direct() {
    let static_key = ecdh::generate_ephemeral(crv::P256).unwrap();

    let mut msg = CoseEncrypt::new();
    msg.put_header(label::ALG, Value::Integer(1.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(vec![0x77; 12]), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();

    let mut recipient = Recipient::new();
    recipient
        .put_header(label::ALG, Value::Integer((-25).into()), Bucket::Unprotected)
        .unwrap();
    recipient.set_key(static_key.public_part()).unwrap();
    msg.add_recipient(recipient).unwrap();
    msg.encrypt().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received.recipient_mut(0).unwrap().set_key(static_key).unwrap();
    assert_eq!(received.decrypt(0).unwrap(), CONTENT);
}

/// X25519 ECDH recipients work the same way as the NIST curves.
#[test]
fn enveloped_ecdh_x25519() {
    let static_key = ecdh::generate_ephemeral(crv::X25519).unwrap();

    let mut msg = CoseEncrypt::new();
    msg.put_header(label::ALG, Value::Integer(3.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(vec![0x13; 12]), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();

    let mut recipient = Recipient::new();
    recipient
        .put_header(label::ALG, Value::Integer((-26).into()), Bucket::Unprotected)
        .unwrap();
    recipient.set_key(static_key.public_part()).unwrap();
    msg.add_recipient(recipient).unwrap();
    msg.encrypt().unwrap();
    let wire = msg.to_bytes().unwrap();

    let mut received = CoseEncrypt::from_bytes(&wire).unwrap();
    received.recipient_mut(0).unwrap().set_key(static_key).unwrap();
    assert_eq!(received.decrypt(0).unwrap(), CONTENT);
}

/// Flipping a protected header bit after encryption breaks the AAD and
/// the decrypt fails.
#[test]
fn protected_header_tamper_fails() {
    let key = [0x09u8; 16];
    let mut msg = CoseEncrypt0::new();
    msg.put_header(label::ALG, Value::Integer(1.into()), Bucket::Protected).unwrap();
    msg.put_header(label::CONTENT_TYPE, Value::Integer(42.into()), Bucket::Protected).unwrap();
    msg.put_header(label::IV, Value::Bytes(vec![0x31; 12]), Bucket::Unprotected).unwrap();
    msg.set_content(CONTENT).unwrap();
    msg.encrypt(&key).unwrap();
    let wire = msg.to_bytes().unwrap();

    let value: Value = ciborium::from_reader(wire.as_slice()).unwrap();
    let mut items = match value {
        Value::Array(items) => items,
        _ => panic!("expected array"),
    };
    if let Value::Bytes(protected) = &mut items[0] {
        // Flip the content-type value inside the protected byte string.
        let last = protected.len() - 1;
        protected[last] ^= 0x01;
    }
    let mut tampered = Vec::new();
    ciborium::into_writer(&Value::Array(items), &mut tampered).unwrap();

    let mut received = CoseEncrypt0::from_bytes(&tampered).unwrap();
    assert!(matches!(received.decrypt(&key), Err(Error::CryptoFail)));
}

/// Sign1 accepts its registered tag on decode and rejects a foreign one.
#[test]
fn sign1_tag_handling() {
    let k256 = ecdh::generate_ephemeral(crv::P256).unwrap();

    let mut msg = CoseSign1::new();
    msg.put_header(label::ALG, Value::Integer((-7).into()), Bucket::Protected).unwrap();
    msg.set_payload(CONTENT).unwrap();
    msg.sign(&k256).unwrap();

    let tagged = msg.to_tagged_bytes().unwrap();
    let mut received = CoseSign1::from_bytes(&tagged).unwrap();
    received.verify(&k256.public_part()).unwrap();

    // Feeding a Sign1 wire blob into the MAC0 decoder must fail on the tag.
    assert!(CoseMac0::from_bytes(&tagged).is_err());
}
