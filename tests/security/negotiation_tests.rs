use saslwrap::config::SaslConfig;
use saslwrap::negotiation::{
    HIGH_STRENGTH, INTEGRITY_ONLY_PROTECTION, LOW_STRENGTH, MEDIUM_STRENGTH, NO_PROTECTION,
    PRIVACY_PROTECTION, QOP_PREFERENCE, SessionRecord, combine_masks, find_preferred_mask,
    negotiate_qop, parse_preference, parse_qop, parse_strength, properties,
};
use saslwrap::security::CipherKind;
use saslwrap::security::cipher::CipherSelector;
use saslwrap::{Qop, SaslErrorKind};
use std::sync::Arc;

#[test]
fn parse_keeps_input_order() {
    assert_eq!(
        parse_qop("auth-int,auth-conf").unwrap(),
        vec![INTEGRITY_ONLY_PROTECTION, PRIVACY_PROTECTION, 0]
    );
}

#[test]
fn parse_empty_yields_default_order() {
    let expected = vec![PRIVACY_PROTECTION, INTEGRITY_ONLY_PROTECTION, NO_PROTECTION];
    assert_eq!(parse_qop("").unwrap(), expected);
    assert_eq!(parse_qop(" ,\t\n").unwrap(), expected);
    assert_eq!(
        parse_strength("").unwrap(),
        vec![HIGH_STRENGTH, MEDIUM_STRENGTH, LOW_STRENGTH]
    );
}

#[test]
fn parse_matches_tokens_regardless_of_position() {
    // "auth" sits in the last canonical slot but is the first input token.
    assert_eq!(parse_qop("auth").unwrap(), vec![NO_PROTECTION, 0, 0]);
    assert_eq!(parse_strength("LOW high").unwrap(), vec![LOW_STRENGTH, HIGH_STRENGTH, 0]);
}

#[test]
fn parse_unknown_token() {
    let err = parse_qop("auth,auth-bogus").unwrap_err();
    assert_eq!(err.kind(), SaslErrorKind::InvalidPreference);
    assert!(err.to_string().contains("auth-bogus"));

    let order = parse_preference(&QOP_PREFERENCE, "auth-bogus,auth", true).unwrap();
    assert_eq!(order, vec![NO_PROTECTION, 0, 0]);
}

#[test]
fn parse_drops_excess_tokens() {
    assert_eq!(
        parse_qop("auth,auth,auth-int,auth-conf").unwrap(),
        vec![NO_PROTECTION, NO_PROTECTION, INTEGRITY_ONLY_PROTECTION]
    );
}

#[test]
fn preferred_mask_honors_own_order() {
    let mine = [PRIVACY_PROTECTION, INTEGRITY_ONLY_PROTECTION, NO_PROTECTION];
    assert_eq!(
        find_preferred_mask(INTEGRITY_ONLY_PROTECTION | NO_PROTECTION, &mine),
        INTEGRITY_ONLY_PROTECTION
    );
    assert_eq!(find_preferred_mask(0, &mine), 0);
    assert_eq!(negotiate_qop(PRIVACY_PROTECTION, &mine), Some(Qop::AuthConf));
    assert_eq!(negotiate_qop(PRIVACY_PROTECTION, &[NO_PROTECTION, 0, 0]), None);
}

#[test]
fn combined_mask_covers_all_entries() {
    assert_eq!(combine_masks(&parse_qop("").unwrap()), 0b111);
    assert_eq!(combine_masks(&parse_qop("auth-int").unwrap()), INTEGRITY_ONLY_PROTECTION);
    assert_eq!(combine_masks(&[]), 0);
}

#[test]
fn medium_cipher_follows_selector_order() {
    let prefs = parse_strength("medium").unwrap();
    let offered = [CipherKind::Des3, CipherKind::Rc4_56];

    let selector = CipherSelector::with_order([CipherKind::Des, CipherKind::Rc4_56]);
    assert_eq!(selector.select(&prefs, &offered).unwrap(), CipherKind::Rc4_56);

    let selector = CipherSelector::with_order([CipherKind::Rc4_56, CipherKind::Des]);
    let offered = [CipherKind::Des, CipherKind::Rc4_56];
    assert_eq!(selector.select(&prefs, &offered).unwrap(), CipherKind::Rc4_56);
}

#[test]
fn properties_require_completion() {
    let mut record = SessionRecord::new(&SaslConfig::default()).unwrap();
    for key in [properties::QOP, properties::MAX_BUFFER, "sasl.unknown"] {
        let err = record.negotiated_property(key).unwrap_err();
        assert_eq!(err.kind(), SaslErrorKind::NotCompleted);
    }
    assert!(record.raw_send_size().is_err());

    record.set_peer_max_buffer(4096).unwrap();
    record.complete(Qop::AuthInt).unwrap();

    let qop = record.negotiated_property(properties::QOP).unwrap().unwrap();
    assert_eq!(qop.as_text(), Some("auth-int"));
    let raw = record.negotiated_property(properties::RAW_SEND_SIZE).unwrap().unwrap();
    assert_eq!(raw.as_size(), Some(4096 - 16));
    let send = record.negotiated_property(properties::SEND_MAX_BUFFER).unwrap().unwrap();
    assert_eq!(send.as_size(), Some(4096));
    assert!(record.negotiated_property("sasl.unknown").unwrap().is_none());
    assert!(record.negotiated_property(properties::BOUND_SERVER_NAME).unwrap().is_none());
}

#[test]
fn completed_record_is_frozen() {
    let mut record = SessionRecord::new(&SaslConfig::default()).unwrap();
    record.set_bound_server_name("imap.example.org").unwrap();
    record.set_credentials(Arc::new(42u32)).unwrap();
    record.complete(Qop::Auth).unwrap();

    assert_eq!(record.complete(Qop::Auth).unwrap_err().kind(), SaslErrorKind::AlreadyCompleted);
    assert_eq!(
        record.set_peer_max_buffer(1).unwrap_err().kind(),
        SaslErrorKind::AlreadyCompleted
    );

    let name = record.negotiated_property(properties::BOUND_SERVER_NAME).unwrap().unwrap();
    assert_eq!(name.as_text(), Some("imap.example.org"));
    let creds = record.negotiated_property(properties::CREDENTIALS).unwrap();
    assert!(creds.is_some());
}

#[test]
fn policy_flags_flow_through() {
    let mut config = SaslConfig::default();
    config.policy.no_anonymous = true;
    config.reuse = true;
    let mut record = SessionRecord::new(&config).unwrap();
    record.complete(Qop::AuthConf).unwrap();

    let flag = |key| record.negotiated_property(key).unwrap().unwrap().as_flag();
    assert_eq!(flag(properties::POLICY_NO_ANONYMOUS), Some(true));
    assert_eq!(flag(properties::POLICY_NO_ACTIVE), Some(false));
    assert_eq!(flag(properties::REUSE), Some(true));
    assert_eq!(
        record.raw_send_size().unwrap(),
        65_536 - 16 - 8,
        "auth-conf reserves trailer and padding"
    );
}

#[test]
fn complete_rejects_unoffered_qop() {
    let config = SaslConfig {
        qop: "auth-conf".into(),
        ..SaslConfig::default()
    };
    let mut record = SessionRecord::new(&config).unwrap();
    let err = record.complete(Qop::Auth).unwrap_err();
    assert_eq!(err.kind(), SaslErrorKind::InvalidPreference);
    assert!(!record.is_complete());
}
