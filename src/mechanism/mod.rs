//! Client-side SASL mechanism contract.
//!
//! A mechanism drives the challenge/response exchange and, once complete,
//! exposes the negotiated properties and any security layer through the
//! same object.

pub mod plain;

pub use plain::PlainClient;

use crate::error::SaslResult;
use crate::negotiation::record::PropertyValue;

/// A client-side SASL mechanism.
pub trait SaslClient {
    /// Registered mechanism name, e.g. `PLAIN`.
    fn mechanism_name(&self) -> &'static str;

    /// Whether the client speaks first.
    fn has_initial_response(&self) -> bool;

    /// Produces the response to a server challenge.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` once the exchange has finished.
    fn evaluate_challenge(&mut self, challenge: &[u8]) -> SaslResult<Vec<u8>>;

    /// Whether the exchange has finished.
    fn is_complete(&self) -> bool;

    /// Protects an outgoing message with the negotiated layer.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` before completion and `NoSecurityLayer` if no
    /// layer was negotiated.
    fn wrap(&mut self, outgoing: &[u8]) -> SaslResult<Vec<u8>>;

    /// Removes protection from an incoming message.
    ///
    /// # Errors
    ///
    /// As for [`wrap`](Self::wrap).
    fn unwrap(&mut self, incoming: &[u8]) -> SaslResult<Vec<u8>>;

    /// Looks up a negotiated property; unknown keys yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` before completion.
    fn negotiated_property(&self, key: &str) -> SaslResult<Option<PropertyValue>>;

    /// Releases secrets held by the mechanism.
    fn dispose(&mut self);
}
