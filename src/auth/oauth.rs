//! OAuth 2.0 token endpoint client: refresh-token and authorization-code grants.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;

use super::credential::{non_empty, OAuthApp, OAuthToken};
use super::error::AuthError;
use crate::config::{AUTH_URL, TOKEN_URL};

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, app: &OAuthApp, refresh_token: &str)
        -> Result<OAuthToken, AuthError>;
}

/// Token endpoint client speaking the standard form-encoded grants with
/// HTTP Basic client authentication.
///
/// # Example
/// ```no_run
/// use bitbucket_cli::auth::{OAuthApp, OAuthRefresher, TokenRefresher};
///
/// # async fn example() -> Result<(), bitbucket_cli::auth::AuthError> {
/// let refresher = OAuthRefresher::new();
/// let app = OAuthApp::new("consumer-key", "consumer-secret");
/// let token = refresher.refresh(&app, "refresh-token").await?;
/// println!("{}", token.token_type);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OAuthRefresher {
    client: reqwest::Client,
    token_url: String,
}

impl Default for OAuthRefresher {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthRefresher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Exchange an authorization code obtained from [`authorize_url`].
    ///
    /// `redirect_uri` must match the one sent with the authorize request.
    pub async fn exchange_code(
        &self,
        app: &OAuthApp,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthToken, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidResponse(
                "no authorization code received".to_string(),
            ));
        }
        let mut form = vec![("grant_type", "authorization_code"), ("code", code)];
        if let Some(redirect_uri) = redirect_uri {
            form.push(("redirect_uri", redirect_uri));
        }
        self.request_token(app, &form).await
    }

    async fn request_token(
        &self,
        app: &OAuthApp,
        form: &[(&str, &str)],
    ) -> Result<OAuthToken, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&app.client_id, Some(&app.client_secret))
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            tracing::debug!(status = status.as_u16(), "Token endpoint rejected request");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        let payload: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            AuthError::InvalidResponse(format!("failed to parse token response: {err}"))
        })?;
        Ok(payload.into_token())
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(
        &self,
        app: &OAuthApp,
        refresh_token: &str,
    ) -> Result<OAuthToken, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }
        self.request_token(
            app,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
        )
        .await
    }
}

/// Authorization URL the user opens to grant this consumer access.
pub fn authorize_url(client_id: &str, redirect_uri: Option<&str>) -> String {
    authorize_url_with_base(AUTH_URL, client_id, redirect_uri)
}

pub(crate) fn authorize_url_with_base(
    base: &str,
    client_id: &str,
    redirect_uri: Option<&str>,
) -> String {
    let mut params = vec![("client_id", client_id), ("response_type", "code")];
    if let Some(redirect_uri) = redirect_uri {
        params.push(("redirect_uri", redirect_uri));
    }
    match reqwest::Url::parse_with_params(base, &params) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{base}?client_id={client_id}&response_type=code"),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    scopes: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.and_then(non_empty),
            token_type: self.token_type,
            expires_in: self.expires_in,
            scopes: self.scopes.and_then(non_empty),
            obtained_at: Some(Utc::now()),
        }
    }
}
