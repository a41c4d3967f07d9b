use crate::common;
use proptest::prelude::*;
use saslwrap::negotiation::{combine_masks, find_preferred_mask, parse_qop, parse_strength};
use saslwrap::security::{
    CipherKind, IntegrityContext, MAC_SIZE, PrivacyContext, SecurityContext, SharedSecret,
};

const QOP_TOKENS: [&str; 3] = ["auth", "auth-int", "auth-conf"];

fn arb_cipher() -> impl Strategy<Value = CipherKind> {
    prop::sample::select(CipherKind::ALL.to_vec())
}

fn arb_secret() -> impl Strategy<Value = SharedSecret> {
    prop::collection::vec(any::<u8>(), 1..48).prop_map(SharedSecret::new)
}

proptest! {
    #[test]
    fn integrity_round_trip(
        secret in arb_secret(),
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..256), 1..8),
    ) {
        let mut client = IntegrityContext::new(&secret, true);
        let mut server = IntegrityContext::new(&secret, false);

        for (i, payload) in payloads.iter().enumerate() {
            let frame = client.wrap(payload).unwrap();
            prop_assert_eq!(&server.unwrap(&frame).unwrap(), payload);
            prop_assert_eq!(server.peer_sequence() as usize, i + 1);
        }
    }

    #[test]
    fn privacy_round_trip(
        cipher in arb_cipher(),
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..128), 1..6),
    ) {
        let secret = common::secret();
        let mut client = PrivacyContext::new(&secret, true, cipher).unwrap();
        let mut server = PrivacyContext::new(&secret, false, cipher).unwrap();

        for payload in &payloads {
            let frame = client.wrap(payload).unwrap();
            prop_assert_eq!(&server.unwrap(&frame).unwrap(), payload);
        }
    }

    #[test]
    fn mac_bit_flip_is_soft(
        payload in prop::collection::vec(any::<u8>(), 1..64),
        bit in 0usize..(MAC_SIZE * 8),
    ) {
        let secret = common::secret();
        let mut client = IntegrityContext::new(&secret, true);
        let mut server = IntegrityContext::new(&secret, false);

        let mut frame = client.wrap(&payload).unwrap();
        let mac_start = payload.len();
        frame[mac_start + bit / 8] ^= 1 << (bit % 8);

        prop_assert!(server.unwrap(&frame).unwrap().is_empty());
        prop_assert_eq!(server.peer_sequence(), 0);
    }

    #[test]
    fn replay_is_always_rejected(
        payload in prop::collection::vec(any::<u8>(), 1..64),
        cipher in arb_cipher(),
    ) {
        let secret = common::secret();
        let mut client = IntegrityContext::new(&secret, true);
        let mut server = IntegrityContext::new(&secret, false);
        let frame = client.wrap(&payload).unwrap();
        server.unwrap(&frame).unwrap();
        prop_assert!(server.unwrap(&frame).unwrap_err().is_replay_or_reorder());

        // Block ciphers keep the replay decryptable only when the CBC chain
        // lines up, so only assert that nothing is accepted twice.
        let mut client = PrivacyContext::new(&secret, true, cipher).unwrap();
        let mut server = PrivacyContext::new(&secret, false, cipher).unwrap();
        let frame = client.wrap(&payload).unwrap();
        server.unwrap(&frame).unwrap();
        match server.unwrap(&frame) {
            Ok(out) => prop_assert!(out.is_empty()),
            Err(e) => prop_assert!(e.is_replay_or_reorder()),
        }
    }

    #[test]
    fn opposite_roles_share_keys(secret in arb_secret()) {
        let client = IntegrityContext::new(&secret, true);
        let server = IntegrityContext::new(&secret, false);
        prop_assert_eq!(client.own_key(), server.peer_key());
        prop_assert_eq!(client.peer_key(), server.own_key());
    }

    #[test]
    fn qop_parse_preserves_order(
        picks in prop::collection::vec(0usize..3, 1..=3),
    ) {
        let raw = picks.iter().map(|&i| QOP_TOKENS[i]).collect::<Vec<_>>().join(",");
        let parsed = parse_qop(&raw).unwrap();

        prop_assert_eq!(parsed.len(), 3);
        for (slot, &i) in picks.iter().enumerate() {
            let expected = 1u8 << i;
            prop_assert_eq!(parsed[slot], expected);
        }
        for &zero in &parsed[picks.len()..] {
            prop_assert_eq!(zero, 0);
        }
    }

    #[test]
    fn preferred_mask_is_first_common_entry(
        picks in prop::collection::vec(0usize..3, 1..=3),
        peer in 0u8..8,
    ) {
        let raw = picks.iter().map(|&i| QOP_TOKENS[i]).collect::<Vec<_>>().join(" ");
        let mine = parse_qop(&raw).unwrap();
        let chosen = find_preferred_mask(peer, &mine);

        if peer & combine_masks(&mine) == 0 {
            prop_assert_eq!(chosen, 0);
        } else {
            let first = mine.iter().copied().find(|m| m & peer != 0).unwrap();
            prop_assert_eq!(chosen, first);
            prop_assert!(chosen & peer != 0);
        }
    }

    #[test]
    fn strength_parse_never_panics(raw in "[a-z ,\\t\\n-]{0,40}") {
        if let Ok(parsed) = parse_strength(&raw) {
            prop_assert_eq!(parsed.len(), 3);
        }
    }
}
