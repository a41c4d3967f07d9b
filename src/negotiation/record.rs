//! Per-attempt negotiation record and the negotiated-property surface.

use super::{Qop, combine_masks, find_preferred_mask, parse_preference};
use super::{QOP_PREFERENCE, STRENGTH_PREFERENCE};
use crate::config::{PolicyFlags, SaslConfig};
use crate::error::{SaslError, SaslResult};
use crate::security::{INTEGRITY_OVERHEAD, MAX_PADDING};
use crate::tracing_compat::debug;
use core::fmt;
use std::any::Any;
use std::sync::Arc;

/// Property keys understood by [`SessionRecord::negotiated_property`] and
/// [`SaslConfig::from_properties`](crate::config::SaslConfig::from_properties).
pub mod properties {
    /// Ordered list of acceptable QOP tokens; negotiated QOP once complete.
    pub const QOP: &str = "sasl.qop";
    /// Ordered list of acceptable cipher strengths.
    pub const STRENGTH: &str = "sasl.strength";
    /// Maximum receive buffer size.
    pub const MAX_BUFFER: &str = "sasl.maxbuffer";
    /// Largest plaintext that fits the peer's buffer after wrapping.
    pub const RAW_SEND_SIZE: &str = "sasl.rawsendsize";
    /// Peer's maximum receive buffer, i.e. our maximum send buffer.
    pub const SEND_MAX_BUFFER: &str = "sasl.sendmaxbuffer";
    /// Host name a server was bound to during the exchange.
    pub const BOUND_SERVER_NAME: &str = "sasl.bound.server.name";
    /// Hint that previously authenticated state may be reused.
    pub const REUSE: &str = "sasl.reuse";
    /// Whether the server must authenticate to the client.
    pub const SERVER_AUTH: &str = "sasl.server.authentication";
    /// Disallow mechanisms open to passive plaintext attacks.
    pub const POLICY_NO_PLAINTEXT: &str = "sasl.policy.noplaintext";
    /// Disallow mechanisms open to active attacks.
    pub const POLICY_NO_ACTIVE: &str = "sasl.policy.noactive";
    /// Disallow mechanisms open to dictionary attacks.
    pub const POLICY_NO_DICTIONARY: &str = "sasl.policy.nodictionary";
    /// Disallow mechanisms accepting anonymous login.
    pub const POLICY_NO_ANONYMOUS: &str = "sasl.policy.noanonymous";
    /// Require forward secrecy between sessions.
    pub const POLICY_FORWARD_SECRECY: &str = "sasl.policy.forward";
    /// Require mechanisms that pass client credentials.
    pub const POLICY_PASS_CREDENTIALS: &str = "sasl.policy.credentials";
    /// Delegated credential object.
    pub const CREDENTIALS: &str = "sasl.credentials";
}

/// Default buffer size when neither side specifies one.
pub const DEFAULT_MAXBUF: usize = 65_536;

/// A negotiated property value.
#[derive(Clone)]
pub enum PropertyValue {
    /// A token or name.
    Text(String),
    /// A buffer size in bytes.
    Size(usize),
    /// A boolean policy flag.
    Flag(bool),
    /// An opaque delegated credential.
    Credentials(Arc<dyn Any + Send + Sync>),
}

impl PropertyValue {
    /// Returns the text value, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the size value, if this is one.
    #[must_use]
    pub const fn as_size(&self) -> Option<usize> {
        match self {
            Self::Size(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag value, if this is one.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Size(n) => f.debug_tuple("Size").field(n).finish(),
            Self::Flag(b) => f.debug_tuple("Flag").field(b).finish(),
            Self::Credentials(_) => f.write_str("Credentials(..)"),
        }
    }
}

/// State of one authentication attempt.
///
/// Created from configuration, mutated while the exchange runs, frozen by
/// [`complete`](Self::complete). Negotiated values are only readable once
/// frozen.
///
/// # Example
///
/// ```
/// use saslwrap::config::SaslConfig;
/// use saslwrap::negotiation::{properties, Qop, SessionRecord, NO_PROTECTION,
///     INTEGRITY_ONLY_PROTECTION};
///
/// let config = SaslConfig::default();
/// let mut record = SessionRecord::new(&config).unwrap();
/// assert!(record.negotiated_property(properties::QOP).is_err());
///
/// let qop = record.negotiate(NO_PROTECTION | INTEGRITY_ONLY_PROTECTION).unwrap();
/// record.complete(qop).unwrap();
///
/// let value = record.negotiated_property(properties::QOP).unwrap().unwrap();
/// assert_eq!(value.as_text(), Some("auth-int"));
/// ```
#[derive(Clone)]
pub struct SessionRecord {
    completed: bool,
    privacy: bool,
    integrity: bool,
    qop: Vec<u8>,
    all_qop: u8,
    strength: Vec<u8>,
    send_max_buf_size: usize,
    recv_max_buf_size: usize,
    raw_send_size: usize,
    bound_server_name: Option<String>,
    reuse: bool,
    server_auth: bool,
    policy: PolicyFlags,
    credentials: Option<Arc<dyn Any + Send + Sync>>,
}

impl SessionRecord {
    /// Builds a fresh record from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPreference` if the configured QOP or strength lists
    /// contain unknown tokens (and unmatched tokens are not ignored).
    pub fn new(config: &SaslConfig) -> SaslResult<Self> {
        let qop = parse_preference(&QOP_PREFERENCE, &config.qop, config.ignore_unmatched)?;
        let strength =
            parse_preference(&STRENGTH_PREFERENCE, &config.strength, config.ignore_unmatched)?;
        let all_qop = combine_masks(&qop);

        Ok(Self {
            completed: false,
            privacy: false,
            integrity: false,
            qop,
            all_qop,
            strength,
            send_max_buf_size: DEFAULT_MAXBUF,
            recv_max_buf_size: config.max_buffer,
            raw_send_size: DEFAULT_MAXBUF,
            bound_server_name: None,
            reuse: config.reuse,
            server_auth: config.server_auth,
            policy: config.policy,
            credentials: None,
        })
    }

    fn ensure_open(&self) -> SaslResult<()> {
        if self.completed {
            return Err(SaslError::already_completed().with_context("negotiation record is frozen"));
        }
        Ok(())
    }

    /// Returns `true` once the exchange has completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed
    }

    /// Own QOP preference order, most preferred first.
    #[must_use]
    pub fn qop_preferences(&self) -> &[u8] {
        &self.qop
    }

    /// Every QOP bit this side accepts.
    #[must_use]
    pub const fn allowed_qop(&self) -> u8 {
        self.all_qop
    }

    /// Own strength preference order, most preferred first.
    #[must_use]
    pub fn strength_preferences(&self) -> &[u8] {
        &self.strength
    }

    /// Records the peer's maximum receive buffer.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` once the record is frozen.
    pub fn set_peer_max_buffer(&mut self, size: usize) -> SaslResult<()> {
        self.ensure_open()?;
        self.send_max_buf_size = size;
        Ok(())
    }

    /// Records the host name a server bound to.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` once the record is frozen.
    pub fn set_bound_server_name(&mut self, name: impl Into<String>) -> SaslResult<()> {
        self.ensure_open()?;
        self.bound_server_name = Some(name.into());
        Ok(())
    }

    /// Attaches a delegated credential object.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` once the record is frozen.
    pub fn set_credentials(&mut self, creds: Arc<dyn Any + Send + Sync>) -> SaslResult<()> {
        self.ensure_open()?;
        self.credentials = Some(creds);
        Ok(())
    }

    /// Picks the QOP from this side's order that the peer accepts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPreference` when the two sides share no level.
    pub fn negotiate(&self, peer_allowed: u8) -> SaslResult<Qop> {
        let mask = find_preferred_mask(peer_allowed, &self.qop);
        Qop::from_mask(mask).ok_or_else(|| {
            SaslError::invalid_preference().with_context(format!(
                "no common quality of protection (mine {:#04x}, peer {peer_allowed:#04x})",
                self.all_qop
            ))
        })
    }

    /// Freezes the record with the negotiated QOP.
    ///
    /// The raw send size is derived from the peer's buffer minus the worst
    /// case wrapping overhead for `qop`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` if already frozen, or `InvalidPreference`
    /// if `qop` is not one this side accepts.
    pub fn complete(&mut self, qop: Qop) -> SaslResult<()> {
        self.ensure_open()?;
        if self.all_qop & qop.mask() == 0 {
            return Err(SaslError::invalid_preference()
                .with_context(format!("{qop} was not offered by this side")));
        }

        self.integrity = qop.has_integrity();
        self.privacy = qop.has_privacy();
        let overhead = match qop {
            Qop::Auth => 0,
            Qop::AuthInt => INTEGRITY_OVERHEAD,
            Qop::AuthConf => INTEGRITY_OVERHEAD + MAX_PADDING,
        };
        self.raw_send_size = self.send_max_buf_size.saturating_sub(overhead);
        self.completed = true;

        debug!(
            qop = qop.token(),
            send_max = self.send_max_buf_size,
            raw_send = self.raw_send_size,
            "negotiation completed"
        );
        Ok(())
    }

    /// Returns the negotiated QOP.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` before [`complete`](Self::complete).
    pub fn negotiated_qop(&self) -> SaslResult<Qop> {
        if !self.completed {
            return Err(SaslError::not_completed());
        }
        Ok(if self.privacy {
            Qop::AuthConf
        } else if self.integrity {
            Qop::AuthInt
        } else {
            Qop::Auth
        })
    }

    /// Plaintext size that still fits the peer's buffer after wrapping.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` before completion.
    pub fn raw_send_size(&self) -> SaslResult<usize> {
        if !self.completed {
            return Err(SaslError::not_completed());
        }
        Ok(self.raw_send_size)
    }

    /// Looks up a negotiated property by key.
    ///
    /// Unknown keys yield `Ok(None)`; the bound server name is only present
    /// on a server that recorded one.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` before completion.
    pub fn negotiated_property(&self, key: &str) -> SaslResult<Option<PropertyValue>> {
        if !self.completed {
            return Err(SaslError::not_completed().with_context(format!("property {key}")));
        }

        let value = match key {
            properties::QOP => Some(PropertyValue::Text(self.negotiated_qop()?.token().into())),
            properties::MAX_BUFFER => Some(PropertyValue::Size(self.recv_max_buf_size)),
            properties::RAW_SEND_SIZE => Some(PropertyValue::Size(self.raw_send_size)),
            properties::SEND_MAX_BUFFER => Some(PropertyValue::Size(self.send_max_buf_size)),
            properties::BOUND_SERVER_NAME => {
                self.bound_server_name.clone().map(PropertyValue::Text)
            }
            properties::REUSE => Some(PropertyValue::Flag(self.reuse)),
            properties::SERVER_AUTH => Some(PropertyValue::Flag(self.server_auth)),
            properties::POLICY_NO_PLAINTEXT => Some(PropertyValue::Flag(self.policy.no_plaintext)),
            properties::POLICY_NO_ACTIVE => Some(PropertyValue::Flag(self.policy.no_active)),
            properties::POLICY_NO_DICTIONARY => {
                Some(PropertyValue::Flag(self.policy.no_dictionary))
            }
            properties::POLICY_NO_ANONYMOUS => Some(PropertyValue::Flag(self.policy.no_anonymous)),
            properties::POLICY_FORWARD_SECRECY => {
                Some(PropertyValue::Flag(self.policy.forward_secrecy))
            }
            properties::POLICY_PASS_CREDENTIALS => {
                Some(PropertyValue::Flag(self.policy.pass_credentials))
            }
            properties::CREDENTIALS => self.credentials.clone().map(PropertyValue::Credentials),
            _ => None,
        };
        Ok(value)
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("completed", &self.completed)
            .field("privacy", &self.privacy)
            .field("integrity", &self.integrity)
            .field("qop", &self.qop)
            .field("all_qop", &self.all_qop)
            .field("strength", &self.strength)
            .field("send_max_buf_size", &self.send_max_buf_size)
            .field("recv_max_buf_size", &self.recv_max_buf_size)
            .field("raw_send_size", &self.raw_send_size)
            .finish_non_exhaustive()
    }
}
