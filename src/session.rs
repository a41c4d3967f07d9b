//! A completed negotiation bound to its security layer.
//!
//! [`SecuredSession`] is what an application holds after authentication. It
//! owns the frozen [`SessionRecord`] and, unless `auth` was negotiated, the
//! security layer that wraps and unwraps messages.
//!
//! The layer itself drops forged frames silently. The session turns that
//! into a policy: after `max_integrity_failures` consecutive drops it fails
//! with `IntegrityFailure` and tears the layer down. A sequence violation
//! tears it down immediately. Once torn down, every further wrap or unwrap
//! fails with `Disposed`.

use crate::config::SaslConfig;
use crate::error::{SaslError, SaslResult};
use crate::negotiation::record::PropertyValue;
use crate::negotiation::{Qop, SessionRecord};
use crate::security::{CipherKind, SecurityContext, SecurityLayer, SharedSecret};
use crate::tracing_compat::{error, info, warn};

/// Application-facing handle for a negotiated session.
///
/// # Example
///
/// ```
/// use saslwrap::config::SaslConfig;
/// use saslwrap::negotiation::{SessionRecord, INTEGRITY_ONLY_PROTECTION};
/// use saslwrap::security::SharedSecret;
/// use saslwrap::session::SecuredSession;
///
/// let config = SaslConfig::default();
/// let secret = SharedSecret::new(vec![0x42; 16]);
///
/// let open = |client| {
///     let mut record = SessionRecord::new(&config).unwrap();
///     let qop = record.negotiate(INTEGRITY_ONLY_PROTECTION).unwrap();
///     record.complete(qop).unwrap();
///     SecuredSession::establish(record, &secret, client, None, &config).unwrap()
/// };
///
/// let mut client = open(true);
/// let mut server = open(false);
///
/// let frame = client.wrap(b"ping").unwrap();
/// assert_eq!(server.unwrap(&frame).unwrap(), b"ping");
/// ```
#[derive(Debug)]
pub struct SecuredSession {
    record: SessionRecord,
    layer: Option<SecurityLayer>,
    consecutive_failures: u32,
    max_integrity_failures: u32,
    torn_down: bool,
}

impl SecuredSession {
    /// Builds the security layer matching the record's negotiated QOP.
    ///
    /// `cipher` is only consulted for `auth-conf`.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` if the record is not frozen yet, and the
    /// errors of [`SecurityLayer::for_qop`].
    pub fn establish(
        record: SessionRecord,
        secret: &SharedSecret,
        client_mode: bool,
        cipher: Option<CipherKind>,
        config: &SaslConfig,
    ) -> SaslResult<Self> {
        let qop = record.negotiated_qop()?;
        let layer = SecurityLayer::for_qop(qop, secret, client_mode, cipher)?;
        info!(
            qop = qop.token(),
            client_mode,
            cipher = layer.as_ref().and_then(SecurityLayer::cipher).map(CipherKind::token),
            "secured session established"
        );

        Ok(Self {
            record,
            layer,
            consecutive_failures: 0,
            max_integrity_failures: config.max_integrity_failures.max(1),
            torn_down: false,
        })
    }

    /// The frozen negotiation record.
    #[must_use]
    pub const fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Negotiated QOP.
    ///
    /// # Errors
    ///
    /// Never fails for an established session; the record is frozen.
    pub fn qop(&self) -> SaslResult<Qop> {
        self.record.negotiated_qop()
    }

    /// The active layer, if any and not torn down.
    #[must_use]
    pub const fn layer(&self) -> Option<&SecurityLayer> {
        self.layer.as_ref()
    }

    /// Whether the session has been torn down or disposed.
    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// MAC failures seen since the last accepted frame.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Looks up a negotiated property.
    ///
    /// # Errors
    ///
    /// Returns `Disposed` after teardown.
    pub fn negotiated_property(&self, key: &str) -> SaslResult<Option<PropertyValue>> {
        if self.torn_down {
            return Err(SaslError::disposed());
        }
        self.record.negotiated_property(key)
    }

    fn active_layer(&mut self) -> SaslResult<&mut SecurityLayer> {
        if self.torn_down {
            return Err(SaslError::disposed());
        }
        self.layer.as_mut().ok_or_else(|| {
            SaslError::no_security_layer().with_context("negotiated quality of protection is auth")
        })
    }

    /// Wraps an outgoing message.
    ///
    /// # Errors
    ///
    /// Returns `NoSecurityLayer` for `auth` sessions, `Disposed` after
    /// teardown, or the layer's error.
    pub fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>> {
        let result = self.active_layer()?.wrap(outgoing);
        if let Err(e) = &result {
            if e.is_fatal() {
                self.tear_down();
            }
        }
        result
    }

    /// Unwraps an incoming message.
    ///
    /// A dropped frame returns an empty buffer until the failure threshold
    /// is reached.
    ///
    /// # Errors
    ///
    /// Returns `ReplayOrReorder` (and tears down) on a sequence violation,
    /// `IntegrityFailure` (and tears down) once the threshold is reached,
    /// `MalformedMessage` for structurally invalid frames, and
    /// `NoSecurityLayer` or `Disposed` as for [`wrap`](Self::wrap).
    pub fn unwrap(&mut self, incoming: &[u8]) -> SaslResult<Vec<u8>> {
        let layer = self.active_layer()?;
        let discarded_before = layer.stats().discarded;
        let result = layer.unwrap(incoming);
        let dropped = layer.stats().discarded > discarded_before;

        match result {
            Err(e) => {
                if e.is_fatal() {
                    error!(error = %e, "tearing down secured session");
                    self.tear_down();
                }
                Err(e)
            }
            Ok(message) if dropped => {
                self.consecutive_failures += 1;
                warn!(
                    consecutive = self.consecutive_failures,
                    limit = self.max_integrity_failures,
                    "integrity check failed"
                );
                if self.consecutive_failures >= self.max_integrity_failures {
                    let failures = self.consecutive_failures;
                    error!(failures, "integrity failure threshold reached");
                    self.tear_down();
                    return Err(SaslError::integrity_failure().with_context(format!(
                        "{failures} consecutive frames failed verification"
                    )));
                }
                Ok(message)
            }
            Ok(message) => {
                if !incoming.is_empty() {
                    self.consecutive_failures = 0;
                }
                Ok(message)
            }
        }
    }

    fn tear_down(&mut self) {
        self.layer = None;
        self.torn_down = true;
    }

    /// Drops the security layer and its keys. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.torn_down {
            info!("secured session disposed");
        }
        self.tear_down();
    }
}
