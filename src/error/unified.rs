//! Error classification and recovery hints.

use std::fmt;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    NotFound,
    Api,
    Configuration,
    Serialization,
    Io,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    Reauthenticate,
    CheckConfiguration,
    CheckArguments,
    IncreaseTimeout,
    RetryLater,
    None,
}

impl RecoverySuggestion {
    /// One-line hint shown under an error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Reauthenticate => Some("Run 'bb auth login' to authenticate again."),
            Self::CheckConfiguration => Some("Check your settings with 'bb config view'."),
            Self::CheckArguments => Some("Check the workspace, repository or resource name."),
            Self::IncreaseTimeout => Some("Set BB_HTTP_TIMEOUT (seconds) to allow slower responses."),
            Self::RetryLater => Some("The service may be unavailable; try again shortly."),
            Self::None => None,
        }
    }
}

impl fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint().unwrap_or(""))
    }
}
