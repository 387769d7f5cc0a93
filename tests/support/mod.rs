#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bitbucket_cli::auth::{
    AuthError, Credential, CredentialStore, OAuthApp, OAuthRefresher, OAuthToken, TokenRefresher,
};
use bitbucket_cli::client::ApiClient;
use wiremock::MockServer;

pub const TOKEN_PATH: &str = "/site/oauth2/access_token";

#[derive(Default)]
pub struct InMemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
    saves: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(credential: Credential) -> Self {
        let store = Self::new();
        *store.credential.lock().expect("store lock poisoned") = Some(credential);
        store
    }

    pub fn get(&self) -> Option<Credential> {
        self.credential.lock().expect("store lock poisoned").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.get())
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock().expect("store lock poisoned") = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.credential.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

/// Store whose writes always fail; loads see nothing.
#[derive(Default)]
pub struct FailingCredentialStore {
    attempts: AtomicUsize,
}

impl FailingCredentialStore {
    pub fn save_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl CredentialStore for FailingCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        Ok(None)
    }

    fn save(&self, _credential: &Credential) -> Result<(), AuthError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::Io("disk full".to_string()))
    }

    fn clear(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Refresher that records its calls and replays a canned outcome.
pub struct ScriptedRefresher {
    outcome: Mutex<Option<Result<OAuthToken, AuthError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRefresher {
    pub fn succeeding(token: OAuthToken) -> Self {
        Self {
            outcome: Mutex::new(Some(Ok(token))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AuthError) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (client id, refresh token) per call.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(
        &self,
        app: &OAuthApp,
        refresh_token: &str,
    ) -> Result<OAuthToken, AuthError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((app.client_id.clone(), refresh_token.to_string()));
        self.outcome
            .lock()
            .expect("outcome lock poisoned")
            .take()
            .unwrap_or_else(|| Err(AuthError::InvalidResponse("refresher called twice".to_string())))
    }
}

pub fn oauth(access: &str, refresh: Option<&str>) -> Credential {
    let token = OAuthToken::new(access);
    Credential::OAuth(match refresh {
        Some(refresh) => token.with_refresh_token(refresh),
        None => token,
    })
}

pub fn app() -> OAuthApp {
    OAuthApp::new("consumer-key", "consumer-secret")
}

pub fn refresher_for(server: &MockServer) -> OAuthRefresher {
    OAuthRefresher::new().with_token_url(format!("{}{TOKEN_PATH}", server.uri()))
}

pub fn client(
    server: &MockServer,
    credential: Credential,
    store: Arc<InMemoryCredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
) -> ApiClient {
    ApiClient::new(
        reqwest::Client::new(),
        server.uri(),
        credential,
        store,
        refresher,
    )
    .with_oauth_app(Some(app()))
}
