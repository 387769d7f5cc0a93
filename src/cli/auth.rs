//! CLI auth command handlers for setup, login, status, and logout.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{prompt, read_line, require, LoginArgs};
use crate::auth::{
    authorize_url, AuthError, CallbackServer, Credential, CredentialStore, FileCredentialStore,
    OAuthRefresher, CALLBACK_TIMEOUT,
};
use crate::client::ApiClient;
use crate::config::{config_dir, Config, HttpSettings};
use crate::error::{BbError, Result};

/// Handle `bb auth setup`.
pub fn handle_setup() -> Result<()> {
    println!("Create an OAuth consumer under Bitbucket settings > OAuth consumers,");
    println!("with callback URL http://localhost, then paste its key and secret.");
    setup(&config_dir(), &mut std::io::stdin().lock())?;
    println!("OAuth credentials saved successfully.");
    Ok(())
}

fn setup(dir: &Path, input: &mut impl BufRead) -> Result<Config> {
    let key = prompt("Enter OAuth consumer key: ", input)?;
    let secret = prompt("Enter OAuth consumer secret: ", input)?;
    if key.is_empty() || secret.is_empty() {
        return Err(BbError::InvalidArgument(
            "both key and secret are required".to_string(),
        ));
    }
    let mut config = Config::load(dir)?;
    config.oauth_key = key;
    config.oauth_secret = secret;
    config.save(dir)?;
    Ok(config)
}

/// Handle `bb auth login`.
pub async fn handle_login(args: &LoginArgs) -> Result<()> {
    let settings = HttpSettings::from_env();
    let store = Arc::new(FileCredentialStore::new_default());

    let credential = if args.with_token {
        let mut input = std::io::stdin().lock();
        login_with_app_password(&settings, store, args.username.clone(), &mut input).await?
    } else {
        let config = Config::load_default()?;
        let refresher = OAuthRefresher::new().with_client(settings.build_client()?);
        let server = CallbackServer::bind().await?;
        login_with_oauth(&config, &refresher, store.as_ref(), server, CALLBACK_TIMEOUT).await?
    };
    tracing::info!(method = %credential.method(), "Logged in");
    println!("Successfully authenticated with Bitbucket!");
    Ok(())
}

/// Authorization-code flow: the browser redirects to a loopback listener
/// whose URI is echoed back to the token endpoint.
async fn login_with_oauth(
    config: &Config,
    refresher: &OAuthRefresher,
    store: &dyn CredentialStore,
    server: CallbackServer,
    timeout: Duration,
) -> Result<Credential> {
    let app = config
        .oauth_app()
        .ok_or(BbError::Auth(AuthError::MissingClientCredentials))?;

    let redirect_uri = server.redirect_uri().to_string();

    println!("Open this URL in your browser to authenticate:");
    println!();
    println!("  {}", authorize_url(&app.client_id, Some(&redirect_uri)));
    println!();
    println!("Waiting for authorization...");

    let code = server.wait_for_code(timeout).await?;
    let token = refresher
        .exchange_code(&app, &code, Some(&redirect_uri))
        .await?;
    let credential = Credential::OAuth(token);
    store.save(&credential)?;
    Ok(credential)
}

/// Verify an app password against `/user` and store it.
async fn login_with_app_password(
    settings: &HttpSettings,
    store: Arc<dyn CredentialStore>,
    username: Option<String>,
    input: &mut impl BufRead,
) -> Result<Credential> {
    let username = match username {
        Some(name) => name,
        None => prompt("Username: ", input)?,
    };
    let username = require(username, "username")?;
    let secret = require(read_line(input)?, "app password")?;
    let credential = Credential::app_password(username, secret);

    // App passwords are never refreshed, so the client leaves the store alone.
    let mut client = ApiClient::new(
        settings.build_client()?,
        settings.api_base.clone(),
        credential,
        store.clone(),
        Arc::new(OAuthRefresher::new()),
    );
    client.get("/user").await?;

    let credential = client.into_credential();
    store.save(&credential)?;
    Ok(credential)
}

/// Handle `bb auth status`.
pub fn handle_status() -> Result<()> {
    let store = FileCredentialStore::new_default();
    for line in status_lines(&store)? {
        println!("{line}");
    }
    Ok(())
}

fn status_lines(store: &dyn CredentialStore) -> Result<Vec<String>> {
    let Some(credential) = store.load()? else {
        return Ok(vec![
            "Not authenticated. Run 'bb auth login' to log in.".to_string()
        ]);
    };
    let mut lines = Vec::new();
    match &credential {
        Credential::OAuth(token) => {
            lines.push("Authenticated with Bitbucket (OAuth 2.0).".to_string());
            if let Some(scopes) = &token.scopes {
                lines.push(format!("Scopes: {scopes}"));
            }
            if let Some(expires) = token.expires_at() {
                if token.is_expired(Utc::now()) {
                    lines.push("Access token expired (refreshed on next request).".to_string());
                } else {
                    lines.push(format!(
                        "Access token expires {}",
                        expires.format("%Y-%m-%d %H:%M UTC")
                    ));
                }
            }
        }
        Credential::AppPassword { username, .. } => {
            lines.push(format!(
                "Authenticated with Bitbucket (app password, user: {username})."
            ));
        }
    }
    Ok(lines)
}

/// Handle `bb auth logout`.
pub fn handle_logout() -> Result<()> {
    FileCredentialStore::new_default().clear()?;
    println!("Logged out successfully.");
    Ok(())
}
