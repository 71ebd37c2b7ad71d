//! Error types for CLI operations

use std::fmt;

use erpshell_client::{Error as ClientError, TransportError};
use thiserror::Error;

/// CLI errors with enough context for a useful message
#[derive(Error, Debug)]
pub enum CliError {
    /// Error raised by the client library
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The operation needs a database and none was given
    #[error("No database selected")]
    NoDatabase,

    /// Login did not succeed
    #[error("Login failed for '{user}' on database '{database}'")]
    LoginFailed { user: String, database: String },

    /// `--env` names a profile the configuration file does not have
    #[error("Unknown profile '{name}' (available: {available})")]
    UnknownProfile { name: String, available: String },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        Self::Client(ClientError::Transport(err))
    }
}

impl CliError {
    /// Hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Client(ClientError::Transport(TransportError::Connection(_) | TransportError::Timeout)) => vec![
                "Check if the server is running",
                "Verify the server address (--server or the profile's host and port)",
            ],
            Self::Client(ClientError::PasswordRequired { .. }) => {
                vec!["Pass --password, set ERPSHELL_PASSWORD, or run from a terminal to be prompted"]
            }
            Self::Client(ClientError::NotLoggedIn) | Self::LoginFailed { .. } => vec![
                "Check the user name and password",
                "List databases with `erpshell databases`",
            ],
            Self::Client(error) if error.is_usage_error() => vec!["Use --help to see expected arguments"],
            Self::NoDatabase => vec!["Pass --db, or select a profile with --env"],
            Self::UnknownProfile { .. } => vec!["Check the section names of erpshell.ini"],
            Self::InvalidArguments(_) => vec!["Use --help to see expected format"],
            _ => vec![],
        }
    }

    /// Error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(ClientError::Transport(TransportError::Fault { .. })) => ErrorCategory::Server,
            Self::Client(ClientError::Transport(_)) => ErrorCategory::Connection,
            Self::Client(ClientError::NotLoggedIn | ClientError::PasswordRequired { .. }) | Self::LoginFailed { .. } => {
                ErrorCategory::Authentication
            }
            Self::Client(ClientError::UnexpectedResult { .. } | ClientError::Json(_)) | Self::Json(_) => {
                ErrorCategory::Parsing
            }
            Self::Client(_) | Self::InvalidArguments(_) | Self::NoDatabase => ErrorCategory::User,
            Self::UnknownProfile { .. } | Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Authentication,
    User,
    Server,
    Parsing,
    System,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::Authentication => write!(f, "Authentication"),
            Self::User => write!(f, "User Input"),
            Self::Server => write!(f, "Server"),
            Self::Parsing => write!(f, "Parsing"),
            Self::System => write!(f, "System"),
            Self::Config => write!(f, "Configuration"),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let fault = CliError::from(TransportError::Fault {
            code: "warning".into(),
            message: "Access denied".into(),
        });
        assert_eq!(fault.category(), ErrorCategory::Server);

        let refused = CliError::from(TransportError::Connection("refused".into()));
        assert_eq!(refused.category(), ErrorCategory::Connection);
        assert!(!refused.suggestions().is_empty());

        let usage = CliError::from(ClientError::Type("count() takes at most 2 positional arguments".into()));
        assert_eq!(usage.category(), ErrorCategory::User);
        assert_eq!(usage.suggestions(), vec!["Use --help to see expected arguments"]);

        assert_eq!(CliError::NoDatabase.category(), ErrorCategory::User);
        assert_eq!(CliError::from(ClientError::NotLoggedIn).category(), ErrorCategory::Authentication);
    }

    #[test]
    fn test_messages() {
        let err = CliError::UnknownProfile {
            name: "staging".into(),
            available: "demo, prod".into(),
        };
        assert_eq!(err.to_string(), "Unknown profile 'staging' (available: demo, prod)");
        let err = CliError::from(TransportError::Timeout);
        assert_eq!(err.to_string(), "Request timed out");
    }
}
