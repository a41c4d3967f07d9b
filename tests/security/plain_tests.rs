use saslwrap::negotiation::properties;
use saslwrap::{PlainClient, SaslClient, SaslErrorKind};

#[test]
fn plain_is_a_one_shot_initial_response() {
    let mut client = PlainClient::new("ops", "tim", b"tanstaaftanstaaf".to_vec()).unwrap();
    assert_eq!(client.mechanism_name(), "PLAIN");
    assert!(client.has_initial_response());
    assert!(!client.is_complete());

    let response = client.evaluate_challenge(&[]).unwrap();
    let fields: Vec<&[u8]> = response.split(|&b| b == 0).collect();
    assert_eq!(fields, vec![&b"ops"[..], &b"tim"[..], &b"tanstaaftanstaaf"[..]]);
    assert!(client.is_complete());

    assert_eq!(
        client.evaluate_challenge(&[]).unwrap_err().kind(),
        SaslErrorKind::AlreadyCompleted
    );
}

#[test]
fn plain_has_no_security_layer() {
    let mut client = PlainClient::new("", "tim", b"pw".to_vec()).unwrap();
    assert_eq!(
        client.negotiated_property(properties::QOP).unwrap_err().kind(),
        SaslErrorKind::NotCompleted
    );

    client.evaluate_challenge(&[]).unwrap();
    let qop = client.negotiated_property(properties::QOP).unwrap().unwrap();
    assert_eq!(qop.as_text(), Some("auth"));
    assert_eq!(
        client.wrap(b"data").unwrap_err().kind(),
        SaslErrorKind::NoSecurityLayer
    );
}

#[test]
fn plain_via_trait_object() {
    let mut client: Box<dyn SaslClient> =
        Box::new(PlainClient::new("", "tim", b"pw".to_vec()).unwrap());
    let response = client.evaluate_challenge(&[]).unwrap();
    assert_eq!(response, b"\0tim\0pw");
    client.dispose();
    assert!(client.is_complete());
}
