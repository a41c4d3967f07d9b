//! The `auth-conf` security context.
//!
//! Privacy layers encryption over the integrity scheme (MAC-then-encrypt):
//!
//! ```text
//! wrap(msg) = E(Kc_own, msg ∥ pad ∥ HMAC(Ki_own, seq ∥ msg)[0..10]) ∥ 0x0001 ∥ seq
//! ```
//!
//! `pad` is `k` bytes of value `k` with `1 <= k <= block size`, chosen so
//! the encrypted body is a whole number of blocks. RC4 has a block size of 1
//! and carries no padding. Message type and sequence number stay in clear.
//!
//! Unwrap decrypts, validates and strips the padding, and then applies the
//! integrity rules to the recovered plaintext: a MAC mismatch or bad padding
//! silently drops the frame, while a sequence mismatch is an error.

use crate::error::{SaslError, SaslResult};
use crate::security::SecurityContext;
use crate::security::cipher::{CipherKind, SealCipher, build_sealing_cipher};
use crate::security::envelope::{SUFFIX_SIZE, TRAILER_SIZE, Trailer, split_tag};
use crate::security::integrity::{ContextState, ContextStats, IntegrityContext};
use crate::security::key::{KeyPair, SharedSecret};
use crate::security::tag::MAC_SIZE;
use crate::tracing_compat::{debug, trace};
use core::fmt;
use zeroize::Zeroizing;

/// Confidentiality and integrity protection for one side of a session.
///
/// # Example
///
/// ```
/// use saslwrap::security::{PrivacyContext, SecurityContext, SharedSecret};
/// use saslwrap::security::cipher::CipherKind;
///
/// let secret = SharedSecret::new(*b"0123456789abcdef");
/// let mut client = PrivacyContext::new(&secret, true, CipherKind::Des3).unwrap();
/// let mut server = PrivacyContext::new(&secret, false, CipherKind::Des3).unwrap();
///
/// let frame = client.wrap(b"secret payload").unwrap();
/// assert!(!frame.windows(6).any(|w| w == b"secret"));
/// assert_eq!(server.unwrap(&frame).unwrap(), b"secret payload");
/// ```
pub struct PrivacyContext {
    integrity: IntegrityContext,
    cipher: CipherKind,
    encryptor: Box<dyn SealCipher>,
    decryptor: Box<dyn SealCipher>,
}

impl PrivacyContext {
    /// Derives integrity and sealing keys and builds both ciphers.
    ///
    /// # Errors
    ///
    /// Returns `CipherFailure` if a cipher rejects its key.
    pub fn new(secret: &SharedSecret, client_mode: bool, cipher: CipherKind) -> SaslResult<Self> {
        let integrity = IntegrityContext::new(secret, client_mode);
        let sealing = KeyPair::sealing(secret, cipher.secret_prefix_len(), client_mode);
        let encryptor = build_sealing_cipher(cipher, sealing.own())?;
        let decryptor = build_sealing_cipher(cipher, sealing.peer())?;
        debug!(client_mode, cipher = cipher.token(), "derived sealing keys");

        Ok(Self {
            integrity,
            cipher,
            encryptor,
            decryptor,
        })
    }

    /// Negotiated cipher.
    #[must_use]
    pub const fn cipher(&self) -> CipherKind {
        self.cipher
    }

    /// The embedded integrity state (keys, sequence numbers, counters).
    #[must_use]
    pub const fn integrity(&self) -> &IntegrityContext {
        &self.integrity
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.integrity.state()
    }

    /// Frame counters.
    #[must_use]
    pub const fn stats(&self) -> ContextStats {
        self.integrity.stats()
    }

    fn padding_len(&self, message_len: usize) -> usize {
        let block = self.encryptor.block_size();
        if block == 1 {
            0
        } else {
            block - (message_len + MAC_SIZE) % block
        }
    }
}

/// Returns `padded` without its trailing padding, or `None` if the padding
/// is not `k` copies of `k` with `1 <= k <= block`.
fn strip_padding(padded: &[u8], block: usize) -> Option<&[u8]> {
    if block == 1 {
        return Some(padded);
    }
    let k = usize::from(*padded.last()?);
    if k == 0 || k > block || k > padded.len() {
        return None;
    }
    let (message, pad) = padded.split_at(padded.len() - k);
    pad.iter().all(|&b| usize::from(b) == k).then_some(message)
}

impl SecurityContext for PrivacyContext {
    fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>> {
        if outgoing.is_empty() {
            return Ok(Vec::new());
        }

        let pad = self.padding_len(outgoing.len());
        let (trailer, tag) = self.integrity.seal_outbound(outgoing)?;

        let mut frame = Vec::with_capacity(outgoing.len() + pad + TRAILER_SIZE);
        frame.extend_from_slice(outgoing);
        frame.resize(outgoing.len() + pad, pad as u8);
        frame.extend_from_slice(tag.as_bytes());
        self.encryptor.encrypt(&mut frame)?;
        trailer.encode_into(&mut frame)?;

        trace!(
            seq = trailer.seq(),
            pad,
            frame = %crate::tracing_compat::hex_preview(&frame, 32),
            "wrapped privacy frame"
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
        let block = self.decryptor.block_size();
        if body.len() % block != 0 {
            return Err(SaslError::malformed_message().with_context(format!(
                "{}-byte body is not a multiple of the {block}-byte block",
                incoming.len() - SUFFIX_SIZE
            )));
        }

        let mut plain = Zeroizing::new(body.to_vec());
        self.decryptor.decrypt(&mut plain)?;
        let (padded, tag) = split_tag(&plain)?;

        let Some(message) = strip_padding(padded, block) else {
            self.integrity.record_discard("bad padding", trailer.seq());
            return Ok(Vec::new());
        };

        if self.integrity.accept_inbound(trailer, message, &tag)? {
            trace!(seq = trailer.seq(), len = message.len(), "unwrapped privacy frame");
            Ok(message.to_vec())
        } else {
            Ok(Vec::new())
        }
    }
}

impl fmt::Debug for PrivacyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivacyContext")
            .field("cipher", &self.cipher)
            .field("integrity", &self.integrity)
            .finish_non_exhaustive()
    }
}
