//! Errors raised while building a LiveKit client
//!
//! Failures of individual registry calls are reported as
//! [`dispatcher_core::RegistryError`]; this type only covers setup.

use thiserror::Error;

/// Result type for client setup
pub type LiveKitResult<T> = Result<T, LiveKitError>;

#[derive(Debug, Error)]
pub enum LiveKitError {
    /// Server URL could not be parsed
    #[error("Invalid LiveKit URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Server URL uses a scheme we cannot talk to
    #[error("Unsupported URL scheme '{scheme}', expected http, https, ws or wss")]
    UnsupportedScheme { scheme: String },

    /// API key or secret is empty
    #[error("Missing LiveKit credential: {name}")]
    MissingCredential { name: &'static str },

    /// Access token could not be signed
    #[error("Token error: {0}")]
    Token(String),

    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}
