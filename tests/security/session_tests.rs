use crate::common;
use saslwrap::config::SaslConfig;
use saslwrap::negotiation::{SessionRecord, properties};
use saslwrap::security::CipherKind;
use saslwrap::{Qop, SaslErrorKind, SecuredSession};

fn open(qop: Qop, client: bool, config: &SaslConfig) -> SecuredSession {
    let mut record = SessionRecord::new(config).unwrap();
    record.complete(qop).unwrap();
    SecuredSession::establish(record, &common::secret(), client, Some(CipherKind::Des3), config)
        .unwrap()
}

#[test]
fn session_escalates_after_configured_failures() {
    common::init_test_logging();
    test_phase!("session_escalates_after_configured_failures");
    let config = SaslConfig {
        max_integrity_failures: 3,
        ..SaslConfig::default()
    };
    let mut client = open(Qop::AuthConf, true, &config);
    let mut server = open(Qop::AuthConf, false, &config);

    let mut forged = client.wrap(b"forged").unwrap();
    forged[0] ^= 0x10;

    for expected in 1..3 {
        assert!(server.unwrap(&forged).unwrap().is_empty());
        assert_with_log!(
            server.consecutive_failures() == expected,
            "failure count",
            expected,
            server.consecutive_failures()
        );
    }
    let err = server.unwrap(&forged).unwrap_err();
    assert_eq!(err.kind(), SaslErrorKind::IntegrityFailure);
    assert!(server.is_torn_down());
    test_complete!("session_escalates_after_configured_failures");
}

#[test]
fn session_teardown_is_permanent() {
    let config = SaslConfig::default();
    let mut client = open(Qop::AuthInt, true, &config);
    let mut server = open(Qop::AuthInt, false, &config);

    let frame = client.wrap(b"x").unwrap();
    server.unwrap(&frame).unwrap();
    assert_eq!(
        server.unwrap(&frame).unwrap_err().kind(),
        SaslErrorKind::ReplayOrReorder
    );

    let next = client.wrap(b"y").unwrap();
    assert_eq!(server.unwrap(&next).unwrap_err().kind(), SaslErrorKind::Disposed);
    assert_eq!(server.wrap(b"z").unwrap_err().kind(), SaslErrorKind::Disposed);
}

#[test]
fn session_exposes_record_properties() {
    let config = SaslConfig::default();
    let session = open(Qop::AuthConf, true, &config);
    let qop = session.negotiated_property(properties::QOP).unwrap().unwrap();
    assert_eq!(qop.as_text(), Some("auth-conf"));
    assert_eq!(session.qop().unwrap(), Qop::AuthConf);
    assert_eq!(session.layer().unwrap().cipher(), Some(CipherKind::Des3));
    assert!(session.record().is_complete());
}

#[test]
fn auth_only_session_refuses_to_wrap() {
    let config = SaslConfig::default();
    let mut session = open(Qop::Auth, true, &config);
    assert_eq!(
        session.wrap(b"plain").unwrap_err().kind(),
        SaslErrorKind::NoSecurityLayer
    );
    assert!(!session.is_torn_down());
}

#[test]
fn dispose_drops_the_layer() {
    let config = SaslConfig::default();
    let mut session = open(Qop::AuthInt, true, &config);
    assert!(session.layer().is_some());
    session.dispose();
    assert!(session.layer().is_none());
    assert_eq!(session.unwrap(b"x").unwrap_err().kind(), SaslErrorKind::Disposed);
}
