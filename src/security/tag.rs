//! Truncated HMAC-MD5 message authentication tags.
//!
//! The tag binds a message to its position in the stream: it is computed
//! over the 4-byte big-endian sequence number followed by the message,
//! never over the message alone.

use crate::error::{SaslError, SaslErrorKind, SaslResult};
use crate::security::key::DerivedKey;
use core::fmt;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Size of a truncated tag in bytes.
pub const MAC_SIZE: usize = 10;

/// The first ten bytes of `HMAC-MD5(key, seq ∥ message)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacTag {
    bytes: [u8; MAC_SIZE],
}

impl MacTag {
    /// Computes the tag for `message` sent with sequence number `seq`.
    ///
    /// # Errors
    ///
    /// Returns `CipherFailure` if the MAC rejects the key; HMAC accepts
    /// keys of any length, so this does not happen with derived keys.
    pub fn compute(key: &DerivedKey, seq: u32, message: &[u8]) -> SaslResult<Self> {
        let mut mac = <HmacMd5 as KeyInit>::new_from_slice(key.as_bytes()).map_err(|e| {
            SaslError::new(SaslErrorKind::CipherFailure).with_context(e.to_string())
        })?;
        mac.update(&seq.to_be_bytes());
        mac.update(message);
        let full = mac.finalize().into_bytes();

        let mut bytes = [0u8; MAC_SIZE];
        bytes.copy_from_slice(&full[..MAC_SIZE]);
        Ok(Self { bytes })
    }

    /// Recomputes the tag and compares in constant time.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`compute`](Self::compute).
    pub fn verify(&self, key: &DerivedKey, seq: u32, message: &[u8]) -> SaslResult<bool> {
        let computed = Self::compute(key, seq, message)?;
        Ok(self.constant_time_eq(&computed))
    }

    /// Creates a tag from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MAC_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw tag bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MAC_SIZE] {
        &self.bytes
    }

    fn constant_time_eq(&self, other: &Self) -> bool {
        let mut diff = 0u8;
        for i in 0..MAC_SIZE {
            diff |= self.bytes[i] ^ other.bytes[i];
        }
        diff == 0
    }
}

impl fmt::Debug for MacTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacTag({:02x}{:02x}...)", self.bytes[0], self.bytes[1])
    }
}
