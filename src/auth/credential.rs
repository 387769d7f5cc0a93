use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a stored credential authenticates requests.
///
/// The string form is the `auth_method` tag of the credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum AuthMethod {
    #[serde(rename = "oauth")]
    #[strum(serialize = "oauth")]
    OAuth,
    #[serde(rename = "token")]
    #[strum(serialize = "token")]
    AppPassword,
}

/// OAuth access token as issued by the token endpoint.
///
/// # Example
/// ```
/// use bitbucket_cli::auth::OAuthToken;
///
/// let token = OAuthToken::new("access").with_refresh_token("refresh");
/// assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Lifetime in seconds reported by the server.
    pub expires_in: u64,
    pub scopes: Option<String>,
    /// Local time the token was obtained, used with `expires_in`.
    pub obtained_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "bearer".to_string(),
            expires_in: 0,
            scopes: None,
            obtained_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = non_empty(refresh_token.into());
        self
    }

    /// Absolute expiry, when both the lifetime and the issue time are known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.expires_in == 0 {
            return None;
        }
        let lifetime = Duration::seconds(i64::try_from(self.expires_in).ok()?);
        self.obtained_at.map(|at| at + lifetime)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// A stored credential. Exactly one authentication method is active.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CredentialRecord", into = "CredentialRecord")]
pub enum Credential {
    /// Bearer token with optional refresh capability.
    OAuth(OAuthToken),
    /// HTTP Basic with a username and app password. Never refreshed.
    AppPassword { username: String, secret: String },
}

impl Credential {
    pub fn app_password(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::AppPassword {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            Self::OAuth(_) => AuthMethod::OAuth,
            Self::AppPassword { .. } => AuthMethod::AppPassword,
        }
    }

    /// The refresh token, only for OAuth credentials that carry a non-empty one.
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Self::OAuth(token) => token.refresh_token.as_deref().filter(|t| !t.is_empty()),
            Self::AppPassword { .. } => None,
        }
    }

    /// Attach the Authorization header for this credential.
    pub fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::OAuth(token) => builder.bearer_auth(&token.access_token),
            Self::AppPassword { username, secret } => builder.basic_auth(username, Some(secret)),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth(token) => f
                .debug_struct("OAuth")
                .field("token_type", &token.token_type)
                .field("has_refresh_token", &token.refresh_token.is_some())
                .field("scopes", &token.scopes)
                .finish_non_exhaustive(),
            Self::AppPassword { username, .. } => f
                .debug_struct("AppPassword")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// OAuth consumer key and secret identifying this CLI to the authorization server.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthApp {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for OAuthApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthApp")
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .finish()
    }
}

/// Flat on-disk shape of a credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    scopes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_method: Option<AuthMethod>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    obtained_at: Option<DateTime<Utc>>,
}

impl From<CredentialRecord> for Credential {
    fn from(record: CredentialRecord) -> Self {
        // Files written before app passwords existed carry no tag.
        match record.auth_method.unwrap_or(AuthMethod::OAuth) {
            AuthMethod::AppPassword => Self::AppPassword {
                username: record.username,
                secret: record.access_token,
            },
            AuthMethod::OAuth => Self::OAuth(OAuthToken {
                access_token: record.access_token,
                refresh_token: non_empty(record.refresh_token),
                token_type: record.token_type,
                expires_in: record.expires_in,
                scopes: non_empty(record.scopes),
                obtained_at: record.obtained_at,
            }),
        }
    }
}

impl From<Credential> for CredentialRecord {
    fn from(credential: Credential) -> Self {
        match credential {
            Credential::OAuth(token) => Self {
                access_token: token.access_token,
                refresh_token: token.refresh_token.unwrap_or_default(),
                token_type: token.token_type,
                expires_in: token.expires_in,
                scopes: token.scopes.unwrap_or_default(),
                auth_method: Some(AuthMethod::OAuth),
                username: String::new(),
                obtained_at: token.obtained_at,
            },
            Credential::AppPassword { username, secret } => Self {
                access_token: secret,
                auth_method: Some(AuthMethod::AppPassword),
                username,
                ..Self::default()
            },
        }
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
