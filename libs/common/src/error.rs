//! Error taxonomy shared by every client component
//!
//! Local validation failures never reach the network, authorization failures
//! are handled globally by the gateway, and remote or network failures are
//! surfaced as scoped status messages by the component that initiated them.

use thiserror::Error;

use crate::credential::Role;

/// Custom error type for client operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Input rejected locally, no request was issued
    #[error("{0}")]
    Validation(String),

    /// The remote service answered 401; the credential has been cleared
    #[error("Session expired. Please sign in again.")]
    Unauthorized,

    /// Credentials were valid but belong to another workspace
    #[error(
        "Those credentials belong to the {actual} workspace. Switch the role selection to continue."
    )]
    RoleMismatch { actual: Role },

    /// Non-2xx answer from a business endpoint
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The remote service could not be reached
    #[error("{0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// Another round trip for the same control is still in flight
    #[error("Another request is still in progress.")]
    Busy,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential persistence error
    #[error("Credential persistence error: {0}")]
    Persistence(String),
}

impl ClientError {
    /// True for a remote 404, which several reads treat as "absent" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Remote { status: 404, .. })
    }

    /// True when no request left the client
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::Validation(_) | ClientError::Busy)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Configuration(err.to_string())
    }
}

/// Type alias for Result with ClientError
pub type ClientResult<T> = Result<T, ClientError>;
