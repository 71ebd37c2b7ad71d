//! Error types for the erpshell client
//!
//! Errors fall in three groups:
//!
//! - **usage errors**: wrong argument shape, count or kind. Raised before any
//!   network round-trip and never retried.
//! - **transport faults**: whatever the [`Transport`](crate::Transport)
//!   reported, carried verbatim.
//! - session state errors, such as a data call issued before a successful login.
//!
//! Soft conditions (unknown options, legacy domains, missing models) are not
//! errors at all; they go through the [`Reporter`](crate::Reporter).

use thiserror::Error;

use crate::session::ServerIdentity;
use crate::transport::TransportError;

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by client operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The name is not an advertised method of a service, or not a known
    /// operation of the client.
    #[error("'{owner}' has no attribute '{name}'")]
    MissingAttribute {
        /// Service or object the lookup was made on
        owner: String,
        /// The name that was looked up
        name: String,
    },

    /// Wrong number of arguments, or an option the operation cannot accept.
    #[error("TypeError: {0}")]
    Type(String),

    /// An argument has the wrong kind (e.g. a model name that is not a string).
    #[error("AssertionError: {0}")]
    Assertion(String),

    /// A domain term could not be parsed.
    #[error("ValueError: {0}")]
    InvalidDomain(String),

    /// Transport or server fault, propagated as-is.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A record operation was issued while no user is logged in.
    #[error("not logged in: authenticate before calling record operations")]
    NotLoggedIn,

    /// No password was supplied and no prompt is configured.
    #[error("password required for {identity}")]
    PasswordRequired {
        /// The identity that needed a password
        identity: ServerIdentity,
    },

    /// A server result did not have the expected shape.
    #[error("unexpected result from {call}: {detail}")]
    UnexpectedResult {
        /// `service.method` or `model.method` that produced the value
        call: String,
        /// What was wrong with it
        detail: String,
    },

    /// JSON conversion failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing_attribute(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingAttribute {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub(crate) fn unexpected(call: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedResult {
            call: call.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error was raised locally because of how the operation was
    /// called (and would fail again with the same arguments).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::MissingAttribute { .. } | Self::Type(_) | Self::Assertion(_) | Self::InvalidDomain(_)
        )
    }
}
