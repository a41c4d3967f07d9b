//! Error types for negotiation and security-layer operations.
//!
//! Every fallible operation in this crate returns [`SaslResult`]. The error
//! carries a [`SaslErrorKind`] for programmatic matching plus an optional
//! free-form context string for diagnostics.

use core::fmt;

/// The kind of SASL error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaslErrorKind {
    /// A negotiated property or wrap/unwrap was requested before the
    /// authentication exchange finished.
    NotCompleted,
    /// A one-shot exchange step was invoked a second time, or a frozen
    /// negotiation record was mutated.
    AlreadyCompleted,
    /// A QOP or strength token did not resolve against the canonical tokens.
    InvalidPreference,
    /// The negotiated cipher is not in the selector's supported set.
    UnsupportedCipher,
    /// A received sequence number did not equal the expected next value.
    ReplayOrReorder,
    /// Repeated MAC mismatches on a secured session.
    IntegrityFailure,
    /// A wrapped frame is structurally invalid (short trailer, bad type,
    /// bad padding).
    MalformedMessage,
    /// A byte-order helper was asked for an unsupported width.
    InvalidLength,
    /// Mechanism credentials are missing or unusable.
    InvalidCredentials,
    /// The session or mechanism has been disposed or torn down.
    Disposed,
    /// The underlying cipher rejected its key material.
    CipherFailure,
    /// Neither integrity nor privacy was negotiated, so there is nothing to
    /// wrap or unwrap with.
    NoSecurityLayer,
}

impl SaslErrorKind {
    const fn message(self) -> &'static str {
        match self {
            Self::NotCompleted => "authentication exchange not completed",
            Self::AlreadyCompleted => "authentication exchange already completed",
            Self::InvalidPreference => "invalid preference token",
            Self::UnsupportedCipher => "unsupported cipher",
            Self::ReplayOrReorder => "out of order sequencing of messages",
            Self::IntegrityFailure => "message integrity check failed",
            Self::MalformedMessage => "malformed wrapped message",
            Self::InvalidLength => "invalid integer width",
            Self::InvalidCredentials => "invalid credentials",
            Self::Disposed => "security context disposed",
            Self::CipherFailure => "cipher initialization failed",
            Self::NoSecurityLayer => "neither integrity nor privacy was negotiated",
        }
    }
}

/// An error from negotiation or security-layer operations.
///
/// # Example
///
/// ```
/// use saslwrap::{SaslError, SaslErrorKind};
///
/// let err = SaslError::replay_or_reorder().with_context("got 3, expected 2");
///
/// assert!(err.is_replay_or_reorder());
/// assert_eq!(err.kind(), SaslErrorKind::ReplayOrReorder);
/// assert!(err.to_string().contains("expected 2"));
/// ```
#[derive(Debug, Clone)]
pub struct SaslError {
    kind: SaslErrorKind,
    context: Option<String>,
}

impl SaslError {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: SaslErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Creates a not-completed error.
    #[must_use]
    pub const fn not_completed() -> Self {
        Self::new(SaslErrorKind::NotCompleted)
    }

    /// Creates an already-completed error.
    #[must_use]
    pub const fn already_completed() -> Self {
        Self::new(SaslErrorKind::AlreadyCompleted)
    }

    /// Creates an invalid-preference error.
    #[must_use]
    pub const fn invalid_preference() -> Self {
        Self::new(SaslErrorKind::InvalidPreference)
    }

    /// Creates an unsupported-cipher error.
    #[must_use]
    pub const fn unsupported_cipher() -> Self {
        Self::new(SaslErrorKind::UnsupportedCipher)
    }

    /// Creates a replay/reorder error.
    #[must_use]
    pub const fn replay_or_reorder() -> Self {
        Self::new(SaslErrorKind::ReplayOrReorder)
    }

    /// Creates an integrity-failure error.
    #[must_use]
    pub const fn integrity_failure() -> Self {
        Self::new(SaslErrorKind::IntegrityFailure)
    }

    /// Creates a malformed-message error.
    #[must_use]
    pub const fn malformed_message() -> Self {
        Self::new(SaslErrorKind::MalformedMessage)
    }

    /// Creates an invalid-length error.
    #[must_use]
    pub const fn invalid_length() -> Self {
        Self::new(SaslErrorKind::InvalidLength)
    }

    /// Creates a disposed error.
    #[must_use]
    pub const fn disposed() -> Self {
        Self::new(SaslErrorKind::Disposed)
    }

    /// Creates a no-security-layer error.
    #[must_use]
    pub const fn no_security_layer() -> Self {
        Self::new(SaslErrorKind::NoSecurityLayer)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> SaslErrorKind {
        self.kind
    }

    /// Returns `true` if the exchange had not completed.
    #[must_use]
    pub const fn is_not_completed(&self) -> bool {
        matches!(self.kind, SaslErrorKind::NotCompleted)
    }

    /// Returns `true` for sequence-number violations.
    #[must_use]
    pub const fn is_replay_or_reorder(&self) -> bool {
        matches!(self.kind, SaslErrorKind::ReplayOrReorder)
    }

    /// Returns `true` if the error ends the secured session.
    ///
    /// Sequence violations and escalated integrity failures must tear the
    /// channel down rather than resynchronize it.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SaslErrorKind::ReplayOrReorder | SaslErrorKind::IntegrityFailure
        )
    }

    /// Adds context to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Returns the error context, if any.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for SaslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())?;

        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }

        Ok(())
    }
}

impl std::error::Error for SaslError {}

impl From<SaslErrorKind> for SaslError {
    fn from(kind: SaslErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result type for SASL operations.
pub type SaslResult<T> = Result<T, SaslError>;
