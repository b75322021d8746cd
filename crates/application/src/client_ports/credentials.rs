use async_trait::async_trait;
use fundline_core::{AppResult, BearerToken};

/// Port for persisting the bearer token across restarts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored token, if any.
    async fn load(&self) -> AppResult<Option<BearerToken>>;

    /// Replaces the stored token.
    async fn save(&self, token: &BearerToken) -> AppResult<()>;

    /// Removes the stored token.
    async fn clear(&self) -> AppResult<()>;
}
