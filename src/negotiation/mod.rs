//! Quality-of-protection and cipher-strength negotiation policy.
//!
//! Both peers advertise comma-separated preference lists such as
//! `"auth-int,auth-conf"` or `"high,medium"`. This module turns those lists
//! into ordered bitmask sequences and resolves the level both sides accept.
//!
//! # Resolution rule
//!
//! The side doing the resolving always walks **its own** preference order and
//! picks the first entry the peer accepts:
//!
//! ```
//! use saslwrap::negotiation::{
//!     find_preferred_mask, parse_qop, INTEGRITY_ONLY_PROTECTION, NO_PROTECTION,
//! };
//!
//! let mine = parse_qop("").unwrap(); // auth-conf, auth-int, auth
//! let peer = INTEGRITY_ONLY_PROTECTION | NO_PROTECTION;
//! assert_eq!(find_preferred_mask(peer, &mine), INTEGRITY_ONLY_PROTECTION);
//! ```
//!
//! All functions here are pure; the only state lives in the caller-owned
//! [`SessionRecord`].

pub mod record;

pub use record::{PropertyValue, SessionRecord, properties};

use crate::error::{SaslError, SaslResult};
use crate::tracing_compat::trace;
use core::fmt;
use core::str::FromStr;

/// Protection bit: authentication only.
pub const NO_PROTECTION: u8 = 1;
/// Protection bit: authentication plus integrity.
pub const INTEGRITY_ONLY_PROTECTION: u8 = 2;
/// Protection bit: authentication plus integrity and confidentiality.
pub const PRIVACY_PROTECTION: u8 = 4;

/// Strength bit: 40-bit class ciphers.
pub const LOW_STRENGTH: u8 = 1;
/// Strength bit: 56-bit class ciphers.
pub const MEDIUM_STRENGTH: u8 = 2;
/// Strength bit: 112/128-bit class ciphers.
pub const HIGH_STRENGTH: u8 = 4;

/// Characters that separate tokens in a preference list.
pub const SEPARATORS: &[char] = &[',', ' ', '\t', '\n'];

/// Describes one negotiable property: its name, canonical tokens, the bit
/// for each token, and the order used when the caller supplies nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceSpec {
    /// Property name used in diagnostics.
    pub property: &'static str,
    /// Canonical tokens.
    pub tokens: &'static [&'static str],
    /// Bit for each canonical token (same index).
    pub masks: &'static [u8],
    /// Preference list applied to empty input.
    pub default: &'static str,
}

/// Quality-of-protection preference.
pub const QOP_PREFERENCE: PreferenceSpec = PreferenceSpec {
    property: properties::QOP,
    tokens: &["auth-conf", "auth-int", "auth"],
    masks: &[PRIVACY_PROTECTION, INTEGRITY_ONLY_PROTECTION, NO_PROTECTION],
    default: "auth-conf,auth-int,auth",
};

/// Cipher strength preference.
pub const STRENGTH_PREFERENCE: PreferenceSpec = PreferenceSpec {
    property: properties::STRENGTH,
    tokens: &["low", "medium", "high"],
    masks: &[LOW_STRENGTH, MEDIUM_STRENGTH, HIGH_STRENGTH],
    default: "high,medium,low",
};

/// Parses a preference list into an ordered mask sequence.
///
/// Each input token is lower-cased and looked up in the full canonical token
/// list; the position of a token in the input has no bearing on which
/// canonical entry it matches. The result has one slot per canonical token,
/// filled in input order and zero-padded. Tokens beyond the last slot are
/// dropped. Empty input yields `pref.default`.
///
/// # Errors
///
/// Returns `InvalidPreference` for a token that matches nothing, unless
/// `ignore_unmatched` is set, in which case the token is skipped.
///
/// # Example
///
/// ```
/// use saslwrap::negotiation::{
///     parse_preference, INTEGRITY_ONLY_PROTECTION, PRIVACY_PROTECTION, QOP_PREFERENCE,
/// };
///
/// let order = parse_preference(&QOP_PREFERENCE, "auth-int,auth-conf", false).unwrap();
/// assert_eq!(order, vec![INTEGRITY_ONLY_PROTECTION, PRIVACY_PROTECTION, 0]);
/// ```
pub fn parse_preference(
    pref: &PreferenceSpec,
    raw: &str,
    ignore_unmatched: bool,
) -> SaslResult<Vec<u8>> {
    debug_assert_eq!(pref.tokens.len(), pref.masks.len());

    let raw = if raw.split(SEPARATORS).all(str::is_empty) {
        pref.default
    } else {
        raw
    };

    let mut answer = vec![0u8; pref.tokens.len()];
    let mut filled = 0;

    for token in raw.split(SEPARATORS).filter(|t| !t.is_empty()) {
        if filled == answer.len() {
            trace!(
                property = pref.property,
                token,
                "preference list longer than canonical set; dropping"
            );
            break;
        }

        let lowered = token.to_ascii_lowercase();
        match pref.tokens.iter().position(|canon| *canon == lowered) {
            Some(idx) => {
                answer[filled] = pref.masks[idx];
                trace!(property = pref.property, token = %lowered, slot = filled, "preference");
                filled += 1;
            }
            None if ignore_unmatched => {
                trace!(property = pref.property, token = %lowered, "ignoring unknown token");
            }
            None => {
                return Err(SaslError::invalid_preference()
                    .with_context(format!("{}: unknown token {token:?}", pref.property)));
            }
        }
    }

    Ok(answer)
}

/// Parses a QOP list (`auth`, `auth-int`, `auth-conf`).
///
/// # Errors
///
/// Returns `InvalidPreference` for unknown tokens.
pub fn parse_qop(raw: &str) -> SaslResult<Vec<u8>> {
    parse_preference(&QOP_PREFERENCE, raw, false)
}

/// Parses a strength list (`low`, `medium`, `high`).
///
/// # Errors
///
/// Returns `InvalidPreference` for unknown tokens.
pub fn parse_strength(raw: &str) -> SaslResult<Vec<u8>> {
    parse_preference(&STRENGTH_PREFERENCE, raw, false)
}

/// ORs every mask in the sequence: all levels this side accepts.
#[must_use]
pub fn combine_masks(masks: &[u8]) -> u8 {
    masks.iter().fold(0, |acc, m| acc | m)
}

/// Returns the first of `mine` that intersects `peer`, or `0` if none does.
#[must_use]
pub fn find_preferred_mask(peer: u8, mine: &[u8]) -> u8 {
    mine.iter().copied().find(|m| m & peer != 0).unwrap_or(0)
}

/// Resolves the quality of protection from this side's order and the
/// peer's accepted set.
#[must_use]
pub fn negotiate_qop(peer: u8, mine: &[u8]) -> Option<Qop> {
    Qop::from_mask(find_preferred_mask(peer, mine))
}

/// Negotiated quality of protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Qop {
    /// Authentication only; no security layer.
    #[default]
    Auth,
    /// Integrity protection.
    AuthInt,
    /// Integrity and confidentiality protection.
    AuthConf,
}

impl Qop {
    /// Wire token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
            Self::AuthConf => "auth-conf",
        }
    }

    /// Protection bit.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Auth => NO_PROTECTION,
            Self::AuthInt => INTEGRITY_ONLY_PROTECTION,
            Self::AuthConf => PRIVACY_PROTECTION,
        }
    }

    /// Maps a single protection bit back to a level.
    #[must_use]
    pub const fn from_mask(mask: u8) -> Option<Self> {
        match mask {
            NO_PROTECTION => Some(Self::Auth),
            INTEGRITY_ONLY_PROTECTION => Some(Self::AuthInt),
            PRIVACY_PROTECTION => Some(Self::AuthConf),
            _ => None,
        }
    }

    /// Returns `true` if messages carry an integrity trailer.
    #[must_use]
    pub const fn has_integrity(self) -> bool {
        !matches!(self, Self::Auth)
    }

    /// Returns `true` if messages are encrypted.
    #[must_use]
    pub const fn has_privacy(self) -> bool {
        matches!(self, Self::AuthConf)
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Qop {
    type Err = SaslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(Self::Auth),
            "auth-int" => Ok(Self::AuthInt),
            "auth-conf" => Ok(Self::AuthConf),
            other => Err(SaslError::invalid_preference()
                .with_context(format!("{}: unknown token {other:?}", properties::QOP))),
        }
    }
}

/// Negotiated cipher strength class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strength {
    /// 40-bit class.
    Low,
    /// 56-bit class.
    Medium,
    /// 112/128-bit class.
    High,
}

impl Strength {
    /// Wire token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Strength bit.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Low => LOW_STRENGTH,
            Self::Medium => MEDIUM_STRENGTH,
            Self::High => HIGH_STRENGTH,
        }
    }

    /// Maps a single strength bit back to a class.
    #[must_use]
    pub const fn from_mask(mask: u8) -> Option<Self> {
        match mask {
            LOW_STRENGTH => Some(Self::Low),
            MEDIUM_STRENGTH => Some(Self::Medium),
            HIGH_STRENGTH => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Strength {
    type Err = SaslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(SaslError::invalid_preference()
                .with_context(format!("{}: unknown token {other:?}", properties::STRENGTH))),
        }
    }
}
