//! Wire layout of wrapped messages.
//!
//! Every wrapped message ends with a fixed 16-byte trailer:
//!
//! ```text
//! offset from end  length  field
//! -16              10      truncated HMAC-MD5
//! -6               2       message type (big-endian, always 1)
//! -4               4       sequence number (big-endian)
//! ```
//!
//! For `auth-int` the MAC follows the plaintext directly. For `auth-conf`
//! the MAC is encrypted together with the plaintext and padding, so only
//! the last six bytes ([`Trailer`]) travel in clear.

use crate::error::{SaslError, SaslResult};
use crate::security::tag::{MAC_SIZE, MacTag};
use crate::util::{int_to_network_byte_order, network_byte_order_to_int};

/// Size of the message type field.
pub const TYPE_SIZE: usize = 2;
/// Size of the sequence number field.
pub const SEQ_SIZE: usize = 4;
/// Size of the clear suffix: message type plus sequence number.
pub const SUFFIX_SIZE: usize = TYPE_SIZE + SEQ_SIZE;
/// Total trailer size: MAC, message type and sequence number.
pub const TRAILER_SIZE: usize = MAC_SIZE + SUFFIX_SIZE;
/// Message type carried by this protocol revision.
pub const MESSAGE_TYPE: u16 = 1;

/// The clear message-type and sequence-number suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    msg_type: u16,
    seq: u32,
}

impl Trailer {
    /// Creates a trailer for the current protocol revision.
    #[must_use]
    pub const fn new(seq: u32) -> Self {
        Self {
            msg_type: MESSAGE_TYPE,
            seq,
        }
    }

    /// Sequence number carried by the trailer.
    #[must_use]
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Message type carried by the trailer.
    #[must_use]
    pub const fn msg_type(&self) -> u16 {
        self.msg_type
    }

    /// Appends the encoded suffix to `out`.
    ///
    /// # Errors
    ///
    /// Only fails if the byte-order helpers reject a width, which the fixed
    /// field sizes rule out.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> SaslResult<()> {
        let mut suffix = [0u8; SUFFIX_SIZE];
        int_to_network_byte_order(u32::from(self.msg_type), &mut suffix[..TYPE_SIZE])?;
        int_to_network_byte_order(self.seq, &mut suffix[TYPE_SIZE..])?;
        out.extend_from_slice(&suffix);
        Ok(())
    }

    /// Splits `frame` into its body and clear suffix.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the frame is too short or carries an
    /// unknown message type.
    pub fn split(frame: &[u8]) -> SaslResult<(&[u8], Self)> {
        if frame.len() < SUFFIX_SIZE {
            return Err(SaslError::malformed_message()
                .with_context(format!("{} bytes is shorter than the trailer", frame.len())));
        }
        let (body, suffix) = frame.split_at(frame.len() - SUFFIX_SIZE);
        let msg_type = network_byte_order_to_int(&suffix[..TYPE_SIZE])?;
        let seq = network_byte_order_to_int(&suffix[TYPE_SIZE..])?;

        if msg_type != u32::from(MESSAGE_TYPE) {
            return Err(SaslError::malformed_message()
                .with_context(format!("unexpected message type {msg_type}")));
        }

        Ok((
            body,
            Self {
                msg_type: MESSAGE_TYPE,
                seq,
            },
        ))
    }
}

/// Splits the trailing MAC off `body`.
///
/// # Errors
///
/// Returns `MalformedMessage` if `body` is shorter than a MAC.
pub fn split_tag(body: &[u8]) -> SaslResult<(&[u8], MacTag)> {
    if body.len() < MAC_SIZE {
        return Err(SaslError::malformed_message()
            .with_context(format!("{} bytes cannot hold a MAC", body.len())));
    }
    let (message, mac) = body.split_at(body.len() - MAC_SIZE);
    let mut bytes = [0u8; MAC_SIZE];
    bytes.copy_from_slice(mac);
    Ok((message, MacTag::from_bytes(bytes)))
}
