//! Transport contract.
//!
//! The client never speaks a wire format itself. Every remote call goes
//! through one primitive, `request(service, method, args)`, implemented by a
//! transport crate (see `erpshell-http`) or by a test double.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors reported by a transport.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// The server could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server answered with a fault.
    #[error("Server fault [{code}]: {message}")]
    Fault {
        /// Fault code or exception name reported by the server
        code: String,
        /// Fault message
        message: String,
    },

    /// The response could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The transport gave up waiting for a response.
    #[error("Request timed out")]
    Timeout,
}

/// A request/response channel to one server.
///
/// Implementations must not retry on their own; the caller sees every fault.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Issue one remote call and return its raw result.
    async fn request(&self, service: &str, method: &str, args: Vec<Value>) -> TransportResult<Value>;

    /// Server address this transport talks to.
    fn endpoint(&self) -> String;
}
