use crate::common;
use saslwrap::SaslErrorKind;
use saslwrap::security::envelope::TRAILER_SIZE;
use saslwrap::security::key::{CLIENT_INTEGRITY_MAGIC, DerivedKey, SERVER_INTEGRITY_MAGIC};
use saslwrap::security::{ContextState, IntegrityContext, MAC_SIZE, MacTag, SecurityContext};

fn pair() -> (IntegrityContext, IntegrityContext) {
    let secret = common::secret();
    (
        IntegrityContext::new(&secret, true),
        IntegrityContext::new(&secret, false),
    )
}

#[test]
fn keys_follow_rfc_2831_derivation() {
    let secret = common::secret();
    let client = IntegrityContext::new(&secret, true);

    let kic = DerivedKey::derive(secret.as_bytes(), CLIENT_INTEGRITY_MAGIC);
    let kis = DerivedKey::derive(secret.as_bytes(), SERVER_INTEGRITY_MAGIC);
    assert_eq!(client.own_key(), &kic);
    assert_eq!(client.peer_key(), &kis);
}

#[test]
fn opposite_roles_mirror_keys() {
    let (client, server) = pair();
    assert_eq!(client.own_key(), server.peer_key());
    assert_eq!(client.peer_key(), server.own_key());
    assert!(client.is_client());
    assert!(!server.is_client());
}

#[test]
fn round_trip_advances_peer_sequence_by_one() {
    let (mut client, mut server) = pair();
    for expected in 1..=5u32 {
        let frame = client.wrap(b"tick").unwrap();
        assert_eq!(server.unwrap(&frame).unwrap(), b"tick");
        assert_eq!(server.peer_sequence(), expected);
        assert_eq!(client.own_sequence(), expected);
    }
}

#[test]
fn frame_carries_mac_type_and_sequence() {
    let (mut client, _) = pair();
    client.wrap(b"zero").unwrap();
    let frame = client.wrap(b"one").unwrap();

    let (msg, trailer) = frame.split_at(frame.len() - TRAILER_SIZE);
    assert_eq!(msg, b"one");
    let mac = MacTag::compute(client.own_key(), 1, b"one").unwrap();
    assert_eq!(&trailer[..MAC_SIZE], mac.as_bytes());
    assert_eq!(&trailer[MAC_SIZE..], &[0x00, 0x01, 0x00, 0x00, 0x00, 0x01]);
}

#[test]
fn every_mac_bit_flip_is_soft_discarded() {
    let (mut client, mut server) = pair();
    let frame = client.wrap(b"protected").unwrap();
    let mac_start = frame.len() - TRAILER_SIZE;

    for byte in mac_start..mac_start + MAC_SIZE {
        for bit in 0..8 {
            let mut tampered = frame.clone();
            tampered[byte] ^= 1 << bit;
            assert!(server.unwrap(&tampered).unwrap().is_empty());
        }
    }
    assert_eq!(server.stats().discarded, 80);
    assert_eq!(server.peer_sequence(), 0);

    // The genuine frame is still accepted afterwards.
    assert_eq!(server.unwrap(&frame).unwrap(), b"protected");
}

#[test]
fn tampered_sequence_is_discarded_not_reordered() {
    let (mut client, mut server) = pair();
    let mut frame = client.wrap(b"seq").unwrap();
    let last = frame.len() - 1;
    frame[last] = 7;

    // The MAC covers the sequence number, so this fails verification first.
    assert!(server.unwrap(&frame).unwrap().is_empty());
}

#[test]
fn replay_fails_hard() {
    let (mut client, mut server) = pair();
    let frame = client.wrap(b"pay").unwrap();
    server.unwrap(&frame).unwrap();

    let err = server.unwrap(&frame).unwrap_err();
    assert_eq!(err.kind(), SaslErrorKind::ReplayOrReorder);
    assert!(err.is_fatal());
}

#[test]
fn skipped_frame_fails_hard() {
    let (mut client, mut server) = pair();
    let _lost = client.wrap(b"lost").unwrap();
    let next = client.wrap(b"next").unwrap();

    let err = server.unwrap(&next).unwrap_err();
    assert!(err.is_replay_or_reorder());
    assert_eq!(err.context(), Some("got 1, expected 0"));
}

#[test]
fn empty_wrap_does_not_advance() {
    let (mut client, mut server) = pair();
    assert!(client.wrap(&[]).unwrap().is_empty());
    assert_eq!(client.own_sequence(), 0);
    assert_eq!(client.state(), ContextState::Armed);

    let frame = client.wrap(b"first").unwrap();
    assert_eq!(server.unwrap(&frame).unwrap(), b"first");
}

#[test]
fn stats_track_outcomes() {
    let (mut client, mut server) = pair();
    let good = client.wrap(b"a").unwrap();
    let mut bad = client.wrap(b"b").unwrap();
    bad[0] ^= 0xff;

    server.unwrap(&good).unwrap();
    server.unwrap(&bad).unwrap();

    let stats = server.stats();
    assert_eq!(stats.unwrapped, 1);
    assert_eq!(stats.discarded, 1);
    assert_eq!(client.stats().wrapped, 2);
}
