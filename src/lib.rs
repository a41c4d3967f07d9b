//! saslwrap: DIGEST-MD5 style SASL negotiation policy and security layers.
//!
//! # Overview
//!
//! After a SASL authentication exchange both sides share a secret, H(A1),
//! and have agreed on a quality of protection (QOP). This crate implements
//! the policy that reaches that agreement and the per-message security
//! layers that follow from it:
//!
//! - `auth`: authentication only, messages pass unchanged
//! - `auth-int`: every message carries a truncated HMAC-MD5 and a sequence
//!   number
//! - `auth-conf`: messages are additionally encrypted with a negotiated
//!   cipher (3DES, DES or one of three RC4 variants)
//!
//! # Core Guarantees
//!
//! - **Frozen negotiation**: negotiated properties are unreadable until the
//!   exchange completes, and immutable afterwards
//! - **Strict ordering**: a frame whose MAC verifies but whose sequence number
//!   is not the next expected one is always an error
//! - **Soft forgery handling**: a frame that fails its MAC is dropped, and a
//!   [`session::SecuredSession`] escalates repeated drops to a teardown
//! - **No lingering secrets**: derived keys, cipher state and passwords are
//!   zeroized when dropped
//!
//! # Module Structure
//!
//! - [`negotiation`]: preference parsing, mask combination and the session
//!   negotiation record with its property surface
//! - [`security`]: key derivation, MAC trailer, integrity and privacy
//!   contexts, cipher selection
//! - [`session`]: a completed negotiation bound to its security layer
//! - [`mechanism`]: the client mechanism contract and the PLAIN mechanism
//! - [`config`]: negotiation configuration from property maps or TOML
//! - [`util`]: network byte order helpers
//! - [`error`](mod@error): error types
//! - [`tracing_compat`]: optional tracing integration (requires the
//!   `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use saslwrap::config::SaslConfig;
//! use saslwrap::negotiation::{SessionRecord, PRIVACY_PROTECTION};
//! use saslwrap::security::{CipherKind, SharedSecret};
//! use saslwrap::session::SecuredSession;
//!
//! let config = SaslConfig::default();
//! let secret = SharedSecret::new(vec![0x5a; 16]);
//!
//! let mut record = SessionRecord::new(&config).unwrap();
//! let qop = record.negotiate(PRIVACY_PROTECTION).unwrap();
//! record.complete(qop).unwrap();
//!
//! let mut client =
//!     SecuredSession::establish(record.clone(), &secret, true, Some(CipherKind::Rc4), &config)
//!         .unwrap();
//! let mut server =
//!     SecuredSession::establish(record, &secret, false, Some(CipherKind::Rc4), &config).unwrap();
//!
//! let frame = client.wrap(b"hello").unwrap();
//! assert_eq!(server.unwrap(&frame).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
// Logging macros expand to nothing without the feature, leaving some
// arguments unread.
#![cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]

pub mod config;
pub mod error;
pub mod mechanism;
pub mod negotiation;
pub mod security;
pub mod session;
pub mod tracing_compat;
pub mod util;

pub use config::{ConfigError, SaslConfig};
pub use error::{SaslError, SaslErrorKind, SaslResult};
pub use mechanism::{PlainClient, SaslClient};
pub use negotiation::{Qop, SessionRecord, Strength};
pub use security::{SecurityContext, SecurityLayer, SharedSecret};
pub use session::SecuredSession;
