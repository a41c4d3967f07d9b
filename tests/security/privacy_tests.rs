use crate::common;
use saslwrap::SaslErrorKind;
use saslwrap::security::envelope::SUFFIX_SIZE;
use saslwrap::security::{CipherKind, PrivacyContext, SecurityContext};

fn pair(kind: CipherKind) -> (PrivacyContext, PrivacyContext) {
    let secret = common::secret();
    (
        PrivacyContext::new(&secret, true, kind).unwrap(),
        PrivacyContext::new(&secret, false, kind).unwrap(),
    )
}

#[test]
fn every_cipher_round_trips_a_conversation() {
    for kind in CipherKind::ALL {
        let (mut client, mut server) = pair(kind);
        for i in 0..10usize {
            let request = format!("request {i} via {kind}").into_bytes();
            let frame = client.wrap(&request).unwrap();
            assert_eq!(server.unwrap(&frame).unwrap(), request);

            let response = vec![0xa5; i * 7];
            let frame = server.wrap(&response).unwrap();
            assert_eq!(client.unwrap(&frame).unwrap(), response);
        }
        assert_eq!(server.integrity().peer_sequence(), 10);
        assert_eq!(client.integrity().peer_sequence(), 9);
    }
}

#[test]
fn block_ciphers_align_body() {
    for kind in [CipherKind::Des, CipherKind::Des3] {
        let (mut client, _) = pair(kind);
        for len in 1..=24 {
            let frame = client.wrap(&vec![1; len]).unwrap();
            let body = frame.len() - SUFFIX_SIZE;
            assert_eq!(body % 8, 0, "{kind} len {len}");
            assert!(body > len + 10 && body <= len + 10 + 8, "{kind} len {len}");
        }
    }
}

#[test]
fn sides_use_different_sealing_keys() {
    let (mut client, mut server) = pair(CipherKind::Rc4);
    let from_client = client.wrap(b"identical").unwrap();
    let from_server = server.wrap(b"identical").unwrap();
    assert_ne!(from_client, from_server);
}

#[test]
fn reflected_frame_is_dropped() {
    let secret = common::secret();
    let mut client = PrivacyContext::new(&secret, true, CipherKind::Des3).unwrap();
    let mut other_client = PrivacyContext::new(&secret, true, CipherKind::Des3).unwrap();

    let frame = client.wrap(b"reflect me").unwrap();
    assert!(other_client.unwrap(&frame).unwrap().is_empty());
}

#[test]
fn tampered_suffix_is_dropped_or_rejected() {
    let (mut client, mut server) = pair(CipherKind::Des);
    let mut frame = client.wrap(b"suffix").unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 1;

    // The sequence number is authenticated through the encrypted MAC.
    assert!(server.unwrap(&frame).unwrap().is_empty());
}

#[test]
fn wrong_cipher_on_peer_is_dropped() {
    let secret = common::secret();
    let mut client = PrivacyContext::new(&secret, true, CipherKind::Rc4).unwrap();
    let mut server = PrivacyContext::new(&secret, false, CipherKind::Rc4_40).unwrap();

    let frame = client.wrap(b"mismatch").unwrap();
    assert!(server.unwrap(&frame).unwrap().is_empty());
}

#[test]
fn short_frame_is_malformed() {
    let (_, mut server) = pair(CipherKind::Rc4);
    let err = server.unwrap(&[0; 15]).unwrap_err();
    assert_eq!(err.kind(), SaslErrorKind::MalformedMessage);
}
