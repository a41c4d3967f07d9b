//! Optional tracing integration.
//!
//! With the `tracing-integration` feature enabled this module re-exports the
//! `tracing` event macros. Without it the same names expand to nothing, so
//! call sites never need their own `#[cfg]` guards.
//!
//! ```ignore
//! use crate::tracing_compat::{debug, warn};
//!
//! debug!(seq = 4, "wrapped message");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[doc(hidden)]
#[macro_export]
macro_rules! __saslwrap_tracing_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing-integration"))]
pub use crate::__saslwrap_tracing_noop as debug;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__saslwrap_tracing_noop as error;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__saslwrap_tracing_noop as info;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__saslwrap_tracing_noop as trace;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__saslwrap_tracing_noop as warn;

/// Renders bytes as lowercase hex for `trace!` output.
///
/// Output is capped at `limit` bytes followed by `..` so large frames do not
/// flood the log.
#[must_use]
pub fn hex_preview(bytes: &[u8], limit: usize) -> String {
    use core::fmt::Write as _;

    let shown = bytes.len().min(limit);
    let mut out = String::with_capacity(shown * 2 + 2);
    for b in &bytes[..shown] {
        let _ = write!(out, "{b:02x}");
    }
    if bytes.len() > limit {
        out.push_str("..");
    }
    out
}
