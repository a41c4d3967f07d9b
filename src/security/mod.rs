//! Security layers applied after authentication.
//!
//! Once the exchange has negotiated `auth-int` or `auth-conf`, every
//! application message passes through a [`SecurityContext`]: `wrap` before
//! sending and `unwrap` after receipt. `auth` negotiates no layer at all.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       SecurityLayer                        │
//! │  ┌──────────────────────────┐  ┌─────────────────────────┐ │
//! │  │     IntegrityContext     │  │     PrivacyContext      │ │
//! │  │  • Kic / Kis (KeyPair)   │  │  • IntegrityContext     │ │
//! │  │  • own / peer seq        │  │  • Kcc / Kcs ciphers    │ │
//! │  └────────────┬─────────────┘  └────────────┬────────────┘ │
//! │               │                             │              │
//! │               ▼                             ▼              │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  MacTag (HMAC-MD5[0..10])  +  Trailer (type, seq)    │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! 1. **No retained secrets**: the shared secret is borrowed only while
//!    deriving keys; derived keys are zeroized on drop.
//! 2. **Fail closed on ordering**: a sequence mismatch is always an error.
//! 3. **Soft on forgery**: a MAC mismatch drops the frame and returns empty,
//!    leaving escalation to the session.

pub mod cipher;
pub mod envelope;
pub mod integrity;
pub mod key;
pub mod privacy;
pub mod tag;

pub use cipher::{CipherKind, CipherSelector};
pub use integrity::{ContextState, ContextStats, IntegrityContext};
pub use key::{DerivedKey, KEY_SIZE, KeyPair, SharedSecret};
pub use privacy::PrivacyContext;
pub use tag::{MAC_SIZE, MacTag};

use crate::error::{SaslError, SaslResult};
use crate::negotiation::Qop;

/// Bytes `auth-int` adds to every message.
pub const INTEGRITY_OVERHEAD: usize = envelope::TRAILER_SIZE;

/// Largest padding `auth-conf` adds on top of [`INTEGRITY_OVERHEAD`].
pub const MAX_PADDING: usize = cipher::DES_BLOCK_SIZE;

/// Per-message protection after authentication.
///
/// Zero-length input yields zero-length output in both directions and
/// leaves the sequence numbers untouched.
pub trait SecurityContext {
    /// Protects an outgoing message.
    ///
    /// # Errors
    ///
    /// Returns `CipherFailure` if the underlying primitive fails.
    fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>>;

    /// Verifies and strips protection from an incoming message.
    ///
    /// Returns an empty buffer when the frame fails its MAC check.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` for structurally invalid frames and
    /// `ReplayOrReorder` when the sequence number is not the expected one.
    fn unwrap(&mut self, incoming: &[u8]) -> SaslResult<Vec<u8>>;
}

/// The layer negotiated for a session.
#[derive(Debug)]
pub enum SecurityLayer {
    /// `auth-int`.
    Integrity(IntegrityContext),
    /// `auth-conf`.
    Privacy(PrivacyContext),
}

impl SecurityLayer {
    /// Builds the layer for a negotiated QOP; `auth` yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCipher` when `auth-conf` is requested without a
    /// cipher, or `CipherFailure` if the cipher cannot be keyed.
    ///
    /// # Example
    ///
    /// ```
    /// use saslwrap::negotiation::Qop;
    /// use saslwrap::security::{SecurityLayer, SharedSecret};
    ///
    /// let secret = SharedSecret::new(vec![7; 16]);
    /// assert!(SecurityLayer::for_qop(Qop::Auth, &secret, true, None).unwrap().is_none());
    ///
    /// let layer = SecurityLayer::for_qop(Qop::AuthInt, &secret, true, None).unwrap();
    /// assert_eq!(layer.unwrap().qop(), Qop::AuthInt);
    /// ```
    pub fn for_qop(
        qop: Qop,
        secret: &SharedSecret,
        client_mode: bool,
        cipher: Option<CipherKind>,
    ) -> SaslResult<Option<Self>> {
        match qop {
            Qop::Auth => Ok(None),
            Qop::AuthInt => Ok(Some(Self::Integrity(IntegrityContext::new(
                secret,
                client_mode,
            )))),
            Qop::AuthConf => {
                let cipher = cipher.ok_or_else(|| {
                    SaslError::unsupported_cipher().with_context("auth-conf without a cipher")
                })?;
                Ok(Some(Self::Privacy(PrivacyContext::new(
                    secret,
                    client_mode,
                    cipher,
                )?)))
            }
        }
    }

    /// QOP this layer implements.
    #[must_use]
    pub const fn qop(&self) -> Qop {
        match self {
            Self::Integrity(_) => Qop::AuthInt,
            Self::Privacy(_) => Qop::AuthConf,
        }
    }

    /// Cipher in use, for `auth-conf`.
    #[must_use]
    pub const fn cipher(&self) -> Option<CipherKind> {
        match self {
            Self::Integrity(_) => None,
            Self::Privacy(ctx) => Some(ctx.cipher()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        match self {
            Self::Integrity(ctx) => ctx.state(),
            Self::Privacy(ctx) => ctx.state(),
        }
    }

    /// Frame counters.
    #[must_use]
    pub const fn stats(&self) -> ContextStats {
        match self {
            Self::Integrity(ctx) => ctx.stats(),
            Self::Privacy(ctx) => ctx.stats(),
        }
    }
}

impl SecurityContext for SecurityLayer {
    fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>> {
        match self {
            Self::Integrity(ctx) => ctx.wrap(outgoing),
            Self::Privacy(ctx) => ctx.wrap(outgoing),
        }
    }

    fn unwrap(&mut self, incoming: &[u8]) -> SaslResult<Vec<u8>> {
        match self {
            Self::Integrity(ctx) => ctx.unwrap(incoming),
            Self::Privacy(ctx) => ctx.unwrap(incoming),
        }
    }
}
