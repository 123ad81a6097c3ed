//! Credential Store
//!
//! Client-local persistence of the session token and cached user profile.
//! The file-backed store survives restarts; the in-memory store is used for
//! tests and embedding.

use crate::session::UserProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Token and profile as persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub profile: UserProfile,
}

/// Persistent storage for the session credentials
pub trait CredentialStore: Send + Sync {
    /// Persist a token and profile, replacing anything stored before
    fn save(&self, token: &str, profile: &UserProfile) -> Result<(), CredentialError>;

    /// Load stored credentials; `Ok(None)` when nothing is stored
    fn load(&self) -> Result<Option<StoredCredentials>, CredentialError>;

    /// Remove stored credentials; clearing an empty store succeeds
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Errors from the credential store
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error on {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Malformed credentials: {0}")]
    Malformed(String),
}

/// Stores credentials as a JSON file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's local data directory
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|p| p.join("crypto-advisor").join("credentials.json"))
            .unwrap_or_else(|| PathBuf::from("./crypto-advisor-credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, error: std::io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            error: error.to_string(),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str, profile: &UserProfile) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let stored = StoredCredentials {
            token: token.to_string(),
            profile: profile.clone(),
        };
        let content = serde_json::to_vec_pretty(&stored)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        tracing::debug!(path = ?self.path, user_id = %profile.user_id, "Saved credentials");
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredentials>, CredentialError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let stored: StoredCredentials = serde_json::from_slice(&content)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        validate(stored).map(Some)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = ?self.path, "Cleared credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Keeps credentials in memory only
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with credentials, as if saved by an earlier run
    pub fn with_credentials(token: &str, profile: UserProfile) -> Self {
        Self {
            inner: Mutex::new(Some(StoredCredentials {
                token: token.to_string(),
                profile,
            })),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredCredentials>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str, profile: &UserProfile) -> Result<(), CredentialError> {
        *self.slot() = Some(StoredCredentials {
            token: token.to_string(),
            profile: profile.clone(),
        });
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredentials>, CredentialError> {
        match self.slot().clone() {
            Some(stored) => validate(stored).map(Some),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}

fn validate(stored: StoredCredentials) -> Result<StoredCredentials, CredentialError> {
    if stored.token.trim().is_empty() {
        return Err(CredentialError::Malformed("empty session token".to_string()));
    }
    if stored.profile.user_id.trim().is_empty() {
        return Err(CredentialError::Malformed("profile has no user id".to_string()));
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn profile() -> UserProfile {
        UserProfile::new("7", "ada@example.com", "Ada")
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("credentials.json"));

        assert!(store.load().unwrap().is_none());

        store.save("tok-1", &profile()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.profile, profile());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        FileCredentialStore::new(&path).save("tok-2", &profile()).unwrap();
        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().unwrap().unwrap().token, "tok-2");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save("tok", &profile()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = FileCredentialStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
    }

    #[test]
    fn test_empty_token_is_malformed() {
        let store = MemoryCredentialStore::with_credentials("  ", profile());
        assert!(matches!(
            store.load().unwrap_err(),
            CredentialError::Malformed(_)
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
        store.save("tok", &profile()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().profile.name, "Ada");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
