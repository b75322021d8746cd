use async_trait::async_trait;
use fundline_application::CredentialStore;
use fundline_core::{AppResult, BearerToken};
use tokio::sync::RwLock;

/// Credential store that forgets the token on exit.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    token: RwLock<Option<BearerToken>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> AppResult<Option<BearerToken>> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &BearerToken) -> AppResult<()> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fundline_application::CredentialStore;
    use fundline_core::BearerToken;

    use super::InMemoryCredentialStore;

    #[tokio::test]
    async fn save_load_clear() {
        let store = InMemoryCredentialStore::new();
        let token = BearerToken::new("abc").unwrap_or_else(|_| unreachable!());

        assert!(matches!(store.load().await, Ok(None)));
        assert!(store.save(&token).await.is_ok());
        assert_eq!(
            store
                .load()
                .await
                .ok()
                .flatten()
                .map(|token| token.expose().to_owned()),
            Some("abc".to_owned())
        );
        assert!(store.clear().await.is_ok());
        assert!(matches!(store.load().await, Ok(None)));
    }
}
