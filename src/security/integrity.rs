//! The `auth-int` security context.
//!
//! Each wrapped message carries a truncated HMAC over its sequence number and
//! payload. The receiver recomputes the MAC with the peer key and then
//! requires the sequence number to be exactly the next expected value.
//!
//! A MAC mismatch is not an error: the frame is discarded and `unwrap`
//! returns an empty buffer. A sequence mismatch on a frame whose MAC
//! verified is a hard [`ReplayOrReorder`](crate::SaslErrorKind::ReplayOrReorder)
//! error.

use crate::error::{SaslError, SaslResult};
use crate::security::SecurityContext;
use crate::security::envelope::{TRAILER_SIZE, Trailer, split_tag};
use crate::security::key::{DerivedKey, KeyPair, SharedSecret};
use crate::security::tag::MacTag;
use crate::tracing_compat::{debug, error, trace, warn};
use core::fmt;

/// Lifecycle of a security context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Keys derived, no frame processed yet.
    Armed,
    /// At least one frame wrapped or unwrapped.
    Active,
}

/// Frame counters for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Frames produced by `wrap`.
    pub wrapped: u64,
    /// Frames accepted by `unwrap`.
    pub unwrapped: u64,
    /// Frames silently discarded by `unwrap` (MAC mismatch or bad padding).
    pub discarded: u64,
}

/// Integrity protection for one side of a session.
///
/// # Example
///
/// ```
/// use saslwrap::security::{IntegrityContext, SecurityContext, SharedSecret};
///
/// let secret = SharedSecret::new(*b"0123456789abcdef");
/// let mut client = IntegrityContext::new(&secret, true);
/// let mut server = IntegrityContext::new(&secret, false);
///
/// let frame = client.wrap(b"hello").unwrap();
/// assert_eq!(frame.len(), 5 + 16);
/// assert_eq!(server.unwrap(&frame).unwrap(), b"hello");
/// ```
pub struct IntegrityContext {
    keys: KeyPair,
    my_seq: u32,
    peer_seq: u32,
    client_mode: bool,
    state: ContextState,
    stats: ContextStats,
}

impl IntegrityContext {
    /// Derives the integrity keys for the given role.
    ///
    /// The secret is only borrowed for derivation and is not retained.
    #[must_use]
    pub fn new(secret: &SharedSecret, client_mode: bool) -> Self {
        let keys = KeyPair::integrity(secret, client_mode);
        debug!(client_mode, "derived integrity keys");
        Self {
            keys,
            my_seq: 0,
            peer_seq: 0,
            client_mode,
            state: ContextState::Armed,
            stats: ContextStats::default(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.state
    }

    /// Whether this context was built for the client side.
    #[must_use]
    pub const fn is_client(&self) -> bool {
        self.client_mode
    }

    /// Key protecting frames this side sends.
    #[must_use]
    pub const fn own_key(&self) -> &DerivedKey {
        self.keys.own()
    }

    /// Key protecting frames the peer sends.
    #[must_use]
    pub const fn peer_key(&self) -> &DerivedKey {
        self.keys.peer()
    }

    /// Sequence number the next wrapped frame will carry.
    #[must_use]
    pub const fn own_sequence(&self) -> u32 {
        self.my_seq
    }

    /// Sequence number expected on the next peer frame.
    #[must_use]
    pub const fn peer_sequence(&self) -> u32 {
        self.peer_seq
    }

    /// Frame counters.
    #[must_use]
    pub const fn stats(&self) -> ContextStats {
        self.stats
    }

    /// Computes the MAC for an outgoing message and consumes a sequence
    /// number.
    pub(crate) fn seal_outbound(&mut self, message: &[u8]) -> SaslResult<(Trailer, MacTag)> {
        let seq = self.my_seq;
        let tag = MacTag::compute(self.keys.own(), seq, message)?;
        self.my_seq = self.my_seq.wrapping_add(1);
        self.stats.wrapped += 1;
        self.state = ContextState::Active;
        Ok((Trailer::new(seq), tag))
    }

    /// Verifies an incoming message against its MAC and sequence number.
    ///
    /// Returns `Ok(false)` when the MAC does not verify; the frame must then
    /// be dropped without advancing the peer sequence.
    pub(crate) fn accept_inbound(
        &mut self,
        trailer: Trailer,
        message: &[u8],
        tag: &MacTag,
    ) -> SaslResult<bool> {
        self.state = ContextState::Active;

        if !tag.verify(self.keys.peer(), trailer.seq(), message)? {
            self.record_discard("mac mismatch", trailer.seq());
            return Ok(false);
        }

        if trailer.seq() != self.peer_seq {
            error!(
                got = trailer.seq(),
                expected = self.peer_seq,
                "out of order sequencing of messages"
            );
            return Err(SaslError::replay_or_reorder().with_context(format!(
                "got {}, expected {}",
                trailer.seq(),
                self.peer_seq
            )));
        }

        self.peer_seq = self.peer_seq.wrapping_add(1);
        self.stats.unwrapped += 1;
        Ok(true)
    }

    pub(crate) fn record_discard(&mut self, reason: &str, seq: u32) {
        self.state = ContextState::Active;
        self.stats.discarded += 1;
        warn!(reason, seq, discarded = self.stats.discarded, "discarding frame");
    }
}

impl SecurityContext for IntegrityContext {
    fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>> {
        if outgoing.is_empty() {
            return Ok(Vec::new());
        }

        let (trailer, tag) = self.seal_outbound(outgoing)?;

        let mut frame = Vec::with_capacity(outgoing.len() + TRAILER_SIZE);
        frame.extend_from_slice(outgoing);
        frame.extend_from_slice(tag.as_bytes());
        trailer.encode_into(&mut frame)?;

        trace!(
            seq = trailer.seq(),
            frame = %crate::tracing_compat::hex_preview(&frame, 32),
            "wrapped integrity frame"
        );
        Ok(frame)
    }

    fn unwrap(&mut self, incoming: &[u8]) -> SaslResult<Vec<u8>> {
        if incoming.is_empty() {
            return Ok(Vec::new());
        }
        if incoming.len() < TRAILER_SIZE {
            return Err(SaslError::malformed_message().with_context(format!(
                "{} bytes is shorter than the {TRAILER_SIZE}-byte trailer",
                incoming.len()
            )));
        }

        let (body, trailer) = Trailer::split(incoming)?;
        let (message, tag) = split_tag(body)?;

        if self.accept_inbound(trailer, message, &tag)? {
            trace!(seq = trailer.seq(), len = message.len(), "unwrapped integrity frame");
            Ok(message.to_vec())
        } else {
            Ok(Vec::new())
        }
    }
}

impl fmt::Debug for IntegrityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityContext")
            .field("client_mode", &self.client_mode)
            .field("state", &self.state)
            .field("my_seq", &self.my_seq)
            .field("peer_seq", &self.peer_seq)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
