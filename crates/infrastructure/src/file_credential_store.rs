//! Credential store persisted as a small JSON file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fundline_application::CredentialStore;
use fundline_core::{AppError, AppResult, BearerToken};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    access_token: BearerToken,
}

/// Credential store backed by a JSON file such as `~/.fundline/credentials.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, error: &std::io::Error) -> AppError {
        AppError::Internal(format!(
            "failed to {action} credentials at '{}': {error}",
            self.path.display()
        ))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> AppResult<Option<BearerToken>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(self.io_error("read", &error)),
        };

        match serde_json::from_slice::<StoredCredentials>(&contents) {
            Ok(stored) => Ok(Some(stored.access_token)),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "ignoring unreadable credentials file");
                Ok(None)
            }
        }
    }

    async fn save(&self, token: &BearerToken) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| self.io_error("create directory for", &error))?;
        }

        let contents = serde_json::to_vec_pretty(&StoredCredentials {
            access_token: token.clone(),
        })
        .map_err(|error| AppError::Internal(format!("failed to encode credentials: {error}")))?;

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|error| self.io_error("write", &error))
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error("remove", &error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use fundline_application::CredentialStore;
    use fundline_core::BearerToken;

    use super::FileCredentialStore;

    fn scratch_store() -> FileCredentialStore {
        let path = std::env::temp_dir()
            .join(format!("fundline-{}", uuid::Uuid::new_v4()))
            .join("credentials.json");
        FileCredentialStore::new(path)
    }

    #[tokio::test]
    async fn token_survives_a_new_store_instance() {
        let store = scratch_store();
        let token = BearerToken::new("persisted-token").unwrap_or_else(|_| unreachable!());

        assert!(store.save(&token).await.is_ok());
        let reopened = FileCredentialStore::new(store.path());
        let loaded = reopened.load().await;

        assert_eq!(
            loaded.ok().flatten().map(|token| token.expose().to_owned()),
            Some("persisted-token".to_owned())
        );
        assert!(store.clear().await.is_ok());
        assert!(matches!(store.load().await, Ok(None)));
    }

    #[tokio::test]
    async fn missing_or_corrupt_files_load_as_signed_out() {
        let store = scratch_store();
        assert!(matches!(store.load().await, Ok(None)));
        assert!(store.clear().await.is_ok());

        if let Some(parent) = store.path().parent() {
            assert!(tokio::fs::create_dir_all(parent).await.is_ok());
        }
        assert!(tokio::fs::write(store.path(), b"{not json").await.is_ok());
        assert!(matches!(store.load().await, Ok(None)));
    }
}
