//! Cipher selection and sealing ciphers for `auth-conf`.
//!
//! Five ciphers are defined, each belonging to one strength class:
//!
//! | token    | strength | construction                              |
//! |----------|----------|-------------------------------------------|
//! | `3des`   | high     | two-key EDE, CBC chained across messages  |
//! | `rc4`    | high     | RC4 over the full 16-byte key             |
//! | `des`    | medium   | single DES, CBC chained across messages   |
//! | `rc4-56` | medium   | RC4 over the full 16-byte key             |
//! | `rc4-40` | low      | RC4 over the full 16-byte key             |
//!
//! The RC4 variants differ only in how many bytes of H(A1) feed the sealing
//! key derivation ([`CipherKind::secret_prefix_len`]).
//!
//! All ciphers are driven through [`SealCipher`], which works in place on
//! whole blocks. RC4 reports a block size of 1.

use crate::error::{SaslError, SaslErrorKind, SaslResult};
use crate::negotiation::{SEPARATORS, Strength};
use crate::security::key::{DerivedKey, KEY_SIZE};
use crate::tracing_compat::{debug, trace};
use core::fmt;
use core::str::FromStr;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::{Des, TdesEde2};
use rc4::Rc4;
use rc4::cipher::StreamCipher;
use rc4::cipher::consts::U16;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// DES and 3DES block size.
pub const DES_BLOCK_SIZE: usize = 8;

/// A cipher usable for `auth-conf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CipherKind {
    /// Two-key triple DES.
    Des3,
    /// 128-bit RC4.
    Rc4,
    /// Single DES.
    Des,
    /// RC4 keyed from a 7-byte secret prefix.
    Rc4_56,
    /// RC4 keyed from a 5-byte secret prefix.
    Rc4_40,
}

impl CipherKind {
    /// Every cipher, in the default selection order.
    pub const ALL: [Self; 5] = [Self::Des3, Self::Rc4, Self::Des, Self::Rc4_56, Self::Rc4_40];

    /// Wire token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Des3 => "3des",
            Self::Rc4 => "rc4",
            Self::Des => "des",
            Self::Rc4_56 => "rc4-56",
            Self::Rc4_40 => "rc4-40",
        }
    }

    /// Strength class.
    #[must_use]
    pub const fn strength(self) -> Strength {
        match self {
            Self::Des3 | Self::Rc4 => Strength::High,
            Self::Des | Self::Rc4_56 => Strength::Medium,
            Self::Rc4_40 => Strength::Low,
        }
    }

    /// Number of H(A1) bytes hashed into the sealing keys.
    #[must_use]
    pub const fn secret_prefix_len(self) -> usize {
        match self {
            Self::Rc4_40 => 5,
            Self::Rc4_56 => 7,
            Self::Des3 | Self::Rc4 | Self::Des => KEY_SIZE,
        }
    }

    /// Cipher block size; `1` for the stream ciphers.
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Des3 | Self::Des => DES_BLOCK_SIZE,
            Self::Rc4 | Self::Rc4_56 | Self::Rc4_40 => 1,
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for CipherKind {
    type Err = SaslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.token() == lowered)
            .ok_or_else(|| SaslError::unsupported_cipher().with_context(format!("{s:?}")))
    }
}

/// Parses a peer's offered cipher list, skipping names this crate does not
/// implement.
#[must_use]
pub fn parse_cipher_list(raw: &str) -> Vec<CipherKind> {
    raw.split(SEPARATORS)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse() {
            Ok(kind) => Some(kind),
            Err(_) => {
                trace!(token, "skipping unknown cipher");
                None
            }
        })
        .collect()
}

/// Chooses the `auth-conf` cipher.
///
/// The selector's order breaks ties inside one strength class; the caller's
/// strength preferences decide between classes.
///
/// ```
/// use saslwrap::negotiation::parse_strength;
/// use saslwrap::security::cipher::{CipherKind, CipherSelector};
///
/// let selector = CipherSelector::default();
/// let prefs = parse_strength("medium,high").unwrap();
/// let offered = [CipherKind::Rc4, CipherKind::Des, CipherKind::Rc4_40];
///
/// assert_eq!(selector.select(&prefs, &offered).unwrap(), CipherKind::Des);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSelector {
    order: Vec<CipherKind>,
}

impl Default for CipherSelector {
    fn default() -> Self {
        Self {
            order: CipherKind::ALL.to_vec(),
        }
    }
}

impl CipherSelector {
    /// Creates a selector with a custom order. Duplicates are dropped.
    #[must_use]
    pub fn with_order(order: impl IntoIterator<Item = CipherKind>) -> Self {
        let mut deduped = Vec::new();
        for kind in order {
            if !deduped.contains(&kind) {
                deduped.push(kind);
            }
        }
        Self { order: deduped }
    }

    /// Supported ciphers in selection order.
    #[must_use]
    pub fn order(&self) -> &[CipherKind] {
        &self.order
    }

    /// Whether `kind` is supported.
    #[must_use]
    pub fn supports(&self, kind: CipherKind) -> bool {
        self.order.contains(&kind)
    }

    /// Picks a cipher the peer offered.
    ///
    /// `strength_prefs` is a parsed strength preference sequence (zero slots
    /// are ignored).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCipher` if no offered cipher matches any preferred
    /// strength.
    pub fn select(&self, strength_prefs: &[u8], offered: &[CipherKind]) -> SaslResult<CipherKind> {
        for &pref in strength_prefs.iter().filter(|&&m| m != 0) {
            for &kind in &self.order {
                if kind.strength().mask() == pref && offered.contains(&kind) {
                    debug!(cipher = kind.token(), strength = pref, "selected cipher");
                    return Ok(kind);
                }
            }
        }

        Err(SaslError::unsupported_cipher().with_context(format!(
            "no common cipher among {}",
            offered
                .iter()
                .map(|k| k.token())
                .collect::<Vec<_>>()
                .join(",")
        )))
    }

    /// Validates a cipher name chosen by the peer.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCipher` for an unknown or disabled cipher.
    pub fn accept(&self, name: &str) -> SaslResult<CipherKind> {
        let kind: CipherKind = name.parse()?;
        if self.supports(kind) {
            Ok(kind)
        } else {
            Err(SaslError::unsupported_cipher().with_context(format!("{kind} is disabled")))
        }
    }
}

/// An in-place sealing cipher for one direction of a session.
///
/// Implementations keep their chaining state between calls, so one instance
/// must only ever encrypt or only ever decrypt. Key schedules and chaining
/// state are wiped when an instance is dropped.
pub trait SealCipher: Send + ZeroizeOnDrop {
    /// Block size in bytes; buffers passed in are a multiple of it.
    fn block_size(&self) -> usize;

    /// Encrypts `buf` in place.
    fn encrypt(&mut self, buf: &mut [u8]) -> SaslResult<()>;

    /// Decrypts `buf` in place.
    fn decrypt(&mut self, buf: &mut [u8]) -> SaslResult<()>;
}

/// RC4 keystream presented as a cipher with 1-byte blocks.
#[derive(ZeroizeOnDrop)]
struct Rc4Seal {
    inner: Rc4<U16>,
}

impl SealCipher for Rc4Seal {
    fn block_size(&self) -> usize {
        1
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> SaslResult<()> {
        self.inner.apply_keystream(buf);
        Ok(())
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> SaslResult<()> {
        self.inner.apply_keystream(buf);
        Ok(())
    }
}

/// CBC mode over an 8-byte block cipher, chained across calls.
struct CbcSeal<C> {
    cipher: C,
    iv: [u8; DES_BLOCK_SIZE],
}

impl<C> CbcSeal<C> {
    fn check_len(buf: &[u8]) -> SaslResult<()> {
        if buf.len() % DES_BLOCK_SIZE == 0 {
            Ok(())
        } else {
            Err(SaslError::malformed_message().with_context(format!(
                "{} bytes is not a multiple of the block size",
                buf.len()
            )))
        }
    }
}

impl<C> SealCipher for CbcSeal<C>
where
    C: BlockEncrypt + BlockDecrypt + ZeroizeOnDrop + Send,
{
    fn block_size(&self) -> usize {
        DES_BLOCK_SIZE
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> SaslResult<()> {
        Self::check_len(buf)?;
        for chunk in buf.chunks_exact_mut(DES_BLOCK_SIZE) {
            for (b, v) in chunk.iter_mut().zip(self.iv.iter()) {
                *b ^= v;
            }
            self.cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
            self.iv.copy_from_slice(chunk);
        }
        Ok(())
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> SaslResult<()> {
        Self::check_len(buf)?;
        let mut saved = Zeroizing::new([0u8; DES_BLOCK_SIZE]);
        for chunk in buf.chunks_exact_mut(DES_BLOCK_SIZE) {
            saved.copy_from_slice(chunk);
            self.cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
            for (b, v) in chunk.iter_mut().zip(self.iv.iter()) {
                *b ^= v;
            }
            self.iv = *saved;
        }
        Ok(())
    }
}

impl<C> Drop for CbcSeal<C> {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

impl<C: ZeroizeOnDrop> ZeroizeOnDrop for CbcSeal<C> {}

/// Spreads 56 key bits over 8 bytes, 7 bits each, and sets the low bit of
/// every byte to give it odd parity.
#[must_use]
pub fn expand_des_key(seven: &[u8; 7]) -> [u8; 8] {
    let mut bits = seven.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    let mut key = [0u8; 8];
    for (i, out) in key.iter_mut().enumerate() {
        let chunk = ((bits >> (49 - 7 * i)) & 0x7f) as u8;
        let shifted = chunk << 1;
        *out = shifted | ((shifted.count_ones() + 1) & 1) as u8;
    }
    bits.zeroize();
    key
}

fn cipher_failure(kind: CipherKind, e: impl fmt::Display) -> SaslError {
    SaslError::new(SaslErrorKind::CipherFailure).with_context(format!("{kind}: {e}"))
}

fn des_key(bytes: &[u8]) -> Zeroizing<[u8; 8]> {
    let mut seven = Zeroizing::new([0u8; 7]);
    seven.copy_from_slice(&bytes[..7]);
    Zeroizing::new(expand_des_key(&seven))
}

/// Builds the sealing cipher for `kind` from a 16-byte sealing key.
///
/// # Errors
///
/// Returns `CipherFailure` if the underlying cipher rejects its key.
pub fn build_sealing_cipher(kind: CipherKind, key: &DerivedKey) -> SaslResult<Box<dyn SealCipher>> {
    let kc = key.as_bytes();
    let mut iv = Zeroizing::new([0u8; DES_BLOCK_SIZE]);
    iv.copy_from_slice(&kc[8..16]);

    let cipher: Box<dyn SealCipher> = match kind {
        CipherKind::Rc4 | CipherKind::Rc4_56 | CipherKind::Rc4_40 => {
            let inner = Rc4::<U16>::new_from_slice(kc).map_err(|e| cipher_failure(kind, e))?;
            Box::new(Rc4Seal { inner })
        }
        CipherKind::Des => {
            let single = des_key(&kc[..7]);
            let cipher = Des::new_from_slice(&single[..]).map_err(|e| cipher_failure(kind, e))?;
            Box::new(CbcSeal { cipher, iv: *iv })
        }
        CipherKind::Des3 => {
            let mut ede_key = Zeroizing::new([0u8; 16]);
            ede_key[..8].copy_from_slice(&des_key(&kc[..7])[..]);
            ede_key[8..].copy_from_slice(&des_key(&kc[7..14])[..]);
            let cipher =
                TdesEde2::new_from_slice(&ede_key[..]).map_err(|e| cipher_failure(kind, e))?;
            Box::new(CbcSeal { cipher, iv: *iv })
        }
    };

    Ok(cipher)
}
