//! Key material for the security layers.
//!
//! All keys are derived from the shared authentication secret H(A1) by
//! hashing it together with a fixed direction-specific magic constant
//! (RFC 2831 section 2.3 and 2.4):
//!
//! ```text
//! Kic = MD5(H(A1) ∥ "Digest session key to client-to-server signing key magic constant")
//! Kis = MD5(H(A1) ∥ "Digest session key to server-to-client signing key magic constant")
//! Kcc = MD5(H(A1)[..n] ∥ "Digest H(A1) to client-to-server sealing key magic constant")
//! Kcs = MD5(H(A1)[..n] ∥ "Digest H(A1) to server-to-client sealing key magic constant")
//! ```
//!
//! A client uses the client-to-server key as its own key and the
//! server-to-client key as its peer key; a server does the opposite, so one
//! side's own key is always the other side's peer key.
//!
//! Every buffer holding secret bytes is zeroized when dropped.

use core::fmt;
use md5::{Digest, Md5};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every derived key in bytes (one MD5 output).
pub const KEY_SIZE: usize = 16;

/// Magic constant for the client-to-server integrity key.
pub const CLIENT_INTEGRITY_MAGIC: &[u8] =
    b"Digest session key to client-to-server signing key magic constant";
/// Magic constant for the server-to-client integrity key.
pub const SERVER_INTEGRITY_MAGIC: &[u8] =
    b"Digest session key to server-to-client signing key magic constant";
/// Magic constant for the client-to-server sealing key.
pub const CLIENT_SEALING_MAGIC: &[u8] =
    b"Digest H(A1) to client-to-server sealing key magic constant";
/// Magic constant for the server-to-client sealing key.
pub const SERVER_SEALING_MAGIC: &[u8] =
    b"Digest H(A1) to server-to-client sealing key magic constant";

/// The shared authentication secret H(A1).
///
/// Produced by the credential exchange and treated here as opaque bytes.
/// Security contexts only borrow it while deriving keys.
///
/// # Example
///
/// ```
/// use saslwrap::security::SharedSecret;
///
/// let secret = SharedSecret::new(*b"0123456789abcdef");
/// assert_eq!(secret.len(), 16);
/// assert!(!format!("{secret:?}").contains("0123"));
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: Vec<u8>,
}

impl SharedSecret {
    /// Wraps raw secret bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the secret length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty secret.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret({} bytes)", self.bytes.len())
    }
}

/// A 16-byte key derived from the shared secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Derives `MD5(secret ∥ magic)`.
    #[must_use]
    pub fn derive(secret: &[u8], magic: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(magic);
        let digest = hasher.finalize();

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print full key material.
        write!(
            f,
            "DerivedKey([{:02x}{:02x}...{:02x}{:02x}])",
            self.bytes[0],
            self.bytes[1],
            self.bytes[KEY_SIZE - 2],
            self.bytes[KEY_SIZE - 1]
        )
    }
}

/// An own/peer key pair for one purpose (integrity or sealing).
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct KeyPair {
    own: DerivedKey,
    peer: DerivedKey,
}

impl KeyPair {
    /// Derives both directional keys and assigns them by role.
    #[must_use]
    pub fn derive(
        secret: &[u8],
        client_magic: &[u8],
        server_magic: &[u8],
        client_mode: bool,
    ) -> Self {
        let client_to_server = DerivedKey::derive(secret, client_magic);
        let server_to_client = DerivedKey::derive(secret, server_magic);

        if client_mode {
            Self {
                own: client_to_server,
                peer: server_to_client,
            }
        } else {
            Self {
                own: server_to_client,
                peer: client_to_server,
            }
        }
    }

    /// Integrity keys `Kic`/`Kis`.
    #[must_use]
    pub fn integrity(secret: &SharedSecret, client_mode: bool) -> Self {
        Self::derive(
            secret.as_bytes(),
            CLIENT_INTEGRITY_MAGIC,
            SERVER_INTEGRITY_MAGIC,
            client_mode,
        )
    }

    /// Sealing keys `Kcc`/`Kcs` over the first `prefix_len` secret bytes.
    ///
    /// A secret shorter than `prefix_len` is used whole.
    #[must_use]
    pub fn sealing(secret: &SharedSecret, prefix_len: usize, client_mode: bool) -> Self {
        let n = prefix_len.min(secret.len());
        Self::derive(
            &secret.as_bytes()[..n],
            CLIENT_SEALING_MAGIC,
            SERVER_SEALING_MAGIC,
            client_mode,
        )
    }

    /// Key used for messages this side sends.
    #[must_use]
    pub const fn own(&self) -> &DerivedKey {
        &self.own
    }

    /// Key used for messages the peer sends.
    #[must_use]
    pub const fn peer(&self) -> &DerivedKey {
        &self.peer
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("own", &self.own)
            .field("peer", &self.peer)
            .finish()
    }
}
