//! Authenticated request executor for the REST API.
//!
//! [`ApiClient`] attaches the stored credential to every request. When an
//! OAuth access token is rejected with 401 and a refresh token is available,
//! it refreshes once, persists the new credential, and replays the request
//! once with the same buffered body. Nothing else is retried.

pub mod request;
pub mod response;

pub use request::{ApiRequest, ContentType, RequestBody};
pub use response::{ApiResponse, Page, Payload};

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AuthError, Credential, CredentialStore, OAuthApp, OAuthToken, TokenRefresher};
use crate::config::{Config, HttpSettings};
use crate::error::{BbError, Result};

/// HTTP client for the API, owning the active credential.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use bitbucket_cli::auth::{FileCredentialStore, OAuthRefresher};
/// use bitbucket_cli::client::ApiClient;
/// use bitbucket_cli::config::{Config, HttpSettings};
///
/// # async fn example() -> bitbucket_cli::error::Result<()> {
/// let settings = HttpSettings::from_env();
/// let mut client = ApiClient::from_store(
///     &settings,
///     &Config::load_default()?,
///     Arc::new(FileCredentialStore::new_default()),
///     Arc::new(OAuthRefresher::new()),
/// )?;
/// let user: serde_json::Value = client.get_json("/user").await?;
/// println!("{user}");
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    credential: Credential,
    app: Option<OAuthApp>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        credential: Credential,
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            credential,
            app: None,
            store,
            refresher,
        }
    }

    /// OAuth consumer used to refresh expired access tokens.
    pub fn with_oauth_app(mut self, app: Option<OAuthApp>) -> Self {
        self.app = app;
        self
    }

    /// Build a client from settings and the credential currently in `store`.
    pub fn from_store(
        settings: &HttpSettings,
        config: &Config,
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self> {
        let credential = store.load()?.ok_or(BbError::NotAuthenticated)?;
        tracing::debug!(method = %credential.method(), "Loaded credential");
        Ok(Self::new(
            settings.build_client()?,
            settings.api_base.clone(),
            credential,
            store,
            refresher,
        )
        .with_oauth_app(config.oauth_app()))
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn into_credential(self) -> Credential {
        self.credential
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Absolute URLs pass through; anything else is joined onto the API base.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("https://") || target.starts_with("http://") {
            return target.to_string();
        }
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            target.trim_start_matches('/')
        )
    }

    /// Issue one logical call and return the final response unclassified.
    ///
    /// Transport failures are returned as [`BbError::Network`]. A failed
    /// refresh is returned as [`BbError::SessionExpired`] and leaves the
    /// stored credential untouched.
    pub async fn execute(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve_url(&request.url);
        let response = self.send(request, &url).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }
        let Some(previous) = self.credential.refresh_token().map(str::to_owned) else {
            return Ok(response);
        };

        tracing::warn!(url = %url, "Access token rejected; refreshing");
        let token = self
            .refresh(previous)
            .await
            .map_err(BbError::SessionExpired)?;
        self.credential = Credential::OAuth(token);
        self.store.save(&self.credential)?;
        tracing::info!("Refreshed access token saved");

        self.send(request, &url).await
    }

    async fn refresh(&self, previous: String) -> std::result::Result<OAuthToken, AuthError> {
        let app = self
            .app
            .as_ref()
            .ok_or(AuthError::MissingClientCredentials)?;
        let mut token = self.refresher.refresh(app, &previous).await?;
        // Servers do not always rotate the refresh token.
        if token.refresh_token.as_deref().map_or(true, str::is_empty) {
            token.refresh_token = Some(previous);
        }
        Ok(token)
    }

    async fn send(&self, request: &ApiRequest, url: &str) -> Result<ApiResponse> {
        let mut builder = self
            .credential
            .authorize(self.http.request(request.method.clone(), url));
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, body.content_type().as_ref())
                .body(body.bytes().to_vec());
        }
        tracing::debug!(method = %request.method, url = %url, "Sending request");
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        tracing::debug!(status, bytes = body.len(), "Received response");
        Ok(ApiResponse::new(status, body.to_vec()))
    }

    /// Execute and classify the final response.
    pub async fn call(&mut self, request: &ApiRequest) -> Result<Payload> {
        self.execute(request).await?.into_payload()
    }

    pub async fn get(&mut self, path: &str) -> Result<Payload> {
        self.call(&ApiRequest::get(path)).await
    }

    /// GET an absolute URL such as a pagination `next` link.
    pub async fn get_url(&mut self, url: &str) -> Result<Payload> {
        self.call(&ApiRequest::get(url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        self.get(path).await?.decode()
    }

    pub async fn post_json(&mut self, path: &str, json: impl Into<String>) -> Result<Payload> {
        self.call(&ApiRequest::post(path, RequestBody::json(json)))
            .await
    }

    /// POST `body` serialized as JSON and decode the response as `T`.
    pub async fn post_json_value<B, T>(&mut self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(&ApiRequest::post(path, RequestBody::json_value(body)?))
            .await?
            .decode()
    }

    pub async fn post_form<K, V>(&mut self, path: &str, pairs: &[(K, V)]) -> Result<Payload>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.call(&ApiRequest::post(path, RequestBody::form(pairs)?))
            .await
    }

    pub async fn put_json(&mut self, path: &str, json: impl Into<String>) -> Result<Payload> {
        self.call(&ApiRequest::put(path, RequestBody::json(json)))
            .await
    }

    /// DELETE; most endpoints answer 204, surfaced as [`Payload::NoContent`].
    pub async fn delete(&mut self, path: &str) -> Result<Payload> {
        self.call(&ApiRequest::delete(path)).await
    }

    /// Follow `next` links from `path`, collecting at most `limit` values.
    ///
    /// Stops at the first page whose `next` link was already fetched.
    pub async fn get_all<T: DeserializeOwned>(
        &mut self,
        path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let mut target = self.resolve_url(path);
        let mut visited = HashSet::new();
        while visited.insert(target.clone()) {
            let page: Page<T> = self.get_url(&target).await?.decode()?;
            values.extend(page.values);
            if let Some(limit) = limit {
                if values.len() >= limit {
                    values.truncate(limit);
                    break;
                }
            }
            match page.next {
                Some(next) if !next.is_empty() => target = next,
                _ => break,
            }
        }
        Ok(values)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base", &self.api_base)
            .field("credential", &self.credential)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}
