use std::fs;
use std::path::PathBuf;

use super::credential::Credential;
use super::error::AuthError;
use crate::util::fs::atomic_write;

const TOKEN_FILE_NAME: &str = "token.json";

/// Storage abstraction for the persisted credential.
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential. `Ok(None)` means nothing is stored.
    fn load(&self) -> Result<Option<Credential>, AuthError>;
    fn save(&self, credential: &Credential) -> Result<(), AuthError>;
    /// Remove the stored credential. Clearing a missing credential is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed credential store writing `token.json` into a directory.
///
/// # Example
/// ```no_run
/// use bitbucket_cli::auth::{Credential, CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new(std::path::PathBuf::from("/tmp/bb"));
/// store.save(&Credential::app_password("bob", "app-password"))?;
/// # Ok::<(), bitbucket_cli::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self::new(crate::config::config_dir())
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join(TOKEN_FILE_NAME)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let credential: Credential = serde_json::from_str(&raw)?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let serialized = serde_json::to_vec_pretty(credential)?;
        atomic_write(&self.path(), &serialized)?;
        tracing::debug!(path = %self.path().display(), method = %credential.method(), "Saved credential");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}
