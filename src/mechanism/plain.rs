//! The PLAIN mechanism (RFC 4616).
//!
//! PLAIN sends a single initial response,
//! `authzid NUL authcid NUL password`, and never negotiates a security
//! layer. The password is wiped as soon as it has been sent.

use crate::error::{SaslError, SaslErrorKind, SaslResult};
use crate::mechanism::SaslClient;
use crate::negotiation::Qop;
use crate::negotiation::record::{PropertyValue, properties};
use crate::tracing_compat::debug;
use core::fmt;
use zeroize::Zeroizing;

/// Field separator in the PLAIN response.
const SEP: u8 = 0;

/// PLAIN client.
///
/// ```
/// use saslwrap::mechanism::{PlainClient, SaslClient};
///
/// let mut client = PlainClient::new("", "alice", b"wonderland".to_vec()).unwrap();
/// assert!(client.has_initial_response());
///
/// let response = client.evaluate_challenge(&[]).unwrap();
/// assert_eq!(response, b"\0alice\0wonderland");
/// assert!(client.is_complete());
/// ```
pub struct PlainClient {
    authorization_id: String,
    authentication_id: String,
    password: Option<Zeroizing<Vec<u8>>>,
    completed: bool,
}

impl PlainClient {
    /// Creates a client. `authorization_id` may be empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if `authentication_id` is empty.
    pub fn new(
        authorization_id: impl Into<String>,
        authentication_id: impl Into<String>,
        password: Vec<u8>,
    ) -> SaslResult<Self> {
        let authentication_id = authentication_id.into();
        if authentication_id.is_empty() {
            return Err(SaslError::new(SaslErrorKind::InvalidCredentials)
                .with_context("PLAIN requires an authentication id"));
        }

        Ok(Self {
            authorization_id: authorization_id.into(),
            authentication_id,
            password: Some(Zeroizing::new(password)),
            completed: false,
        })
    }

    fn clear_password(&mut self) {
        // Zeroizing wipes the buffer on drop.
        self.password = None;
    }

    fn no_layer(&self) -> SaslError {
        if self.completed {
            SaslError::no_security_layer()
                .with_context("PLAIN supports neither integrity nor privacy")
        } else {
            SaslError::not_completed().with_context("PLAIN")
        }
    }
}

impl SaslClient for PlainClient {
    fn mechanism_name(&self) -> &'static str {
        "PLAIN"
    }

    fn has_initial_response(&self) -> bool {
        true
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> SaslResult<Vec<u8>> {
        if self.completed {
            return Err(SaslError::already_completed().with_context("PLAIN"));
        }
        let password = self.password.take().ok_or_else(|| {
            SaslError::new(SaslErrorKind::InvalidCredentials).with_context("password was disposed")
        })?;
        self.completed = true;

        let mut response = Vec::with_capacity(
            self.authorization_id.len() + self.authentication_id.len() + password.len() + 2,
        );
        response.extend_from_slice(self.authorization_id.as_bytes());
        response.push(SEP);
        response.extend_from_slice(self.authentication_id.as_bytes());
        response.push(SEP);
        response.extend_from_slice(&password);

        debug!(
            authcid = %self.authentication_id,
            has_authzid = !self.authorization_id.is_empty(),
            "PLAIN initial response built"
        );
        Ok(response)
    }

    fn is_complete(&self) -> bool {
        self.completed
    }

    fn wrap(&mut self, _outgoing: &[u8]) -> SaslResult<Vec<u8>> {
        Err(self.no_layer())
    }

    fn unwrap(&mut self, _incoming: &[u8]) -> SaslResult<Vec<u8>> {
        Err(self.no_layer())
    }

    fn negotiated_property(&self, key: &str) -> SaslResult<Option<PropertyValue>> {
        if !self.completed {
            return Err(SaslError::not_completed().with_context(format!("property {key}")));
        }
        Ok((key == properties::QOP).then(|| PropertyValue::Text(Qop::Auth.token().into())))
    }

    fn dispose(&mut self) {
        self.clear_password();
    }
}

impl fmt::Debug for PlainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainClient")
            .field("authorization_id", &self.authorization_id)
            .field("authentication_id", &self.authentication_id)
            .field("has_password", &self.password.is_some())
            .field("completed", &self.completed)
            .finish()
    }
}

impl Drop for PlainClient {
    fn drop(&mut self) {
        self.clear_password();
    }
}
