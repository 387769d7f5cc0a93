use thiserror::Error;

/// Errors raised by credential storage and the OAuth token endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("OAuth credentials not configured. Run 'bb auth setup' first")]
    MissingClientCredentials,
    #[error("No refresh token available")]
    MissingRefreshToken,
    #[error("token request failed (HTTP {status}): {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),
    #[error("authorization timed out after {minutes} minutes")]
    AuthorizationTimeout { minutes: u64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
