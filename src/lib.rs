//! bitbucket-cli: a command-line client for Bitbucket Cloud.
//!
//! The library core is the authenticated request executor in [`client`]. It
//! attaches the stored credential to each REST call and transparently
//! refreshes an expired OAuth access token once, persisting the new token
//! before replaying the request.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bitbucket_cli::auth::{FileCredentialStore, OAuthRefresher};
//! use bitbucket_cli::client::ApiClient;
//! use bitbucket_cli::config::{Config, HttpSettings};
//!
//! # async fn example() -> bitbucket_cli::error::Result<()> {
//! let mut client = ApiClient::from_store(
//!     &HttpSettings::from_env(),
//!     &Config::load_default()?,
//!     Arc::new(FileCredentialStore::new_default()),
//!     Arc::new(OAuthRefresher::new()),
//! )?;
//! let repos: Vec<serde_json::Value> = client.get_all("/repositories/acme", Some(50)).await?;
//! println!("{} repositories", repos.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
