//! Credentials, their storage, and the OAuth token endpoint.

pub mod callback;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod store;

pub use callback::{CallbackServer, CALLBACK_TIMEOUT};
pub use credential::{AuthMethod, Credential, OAuthApp, OAuthToken};
pub use error::AuthError;
pub use oauth::{authorize_url, OAuthRefresher, TokenRefresher};
pub use store::{CredentialStore, FileCredentialStore};
