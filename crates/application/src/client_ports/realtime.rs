use async_trait::async_trait;
use fundline_core::{AppResult, BearerToken};
use fundline_domain::RealtimeEvent;
use futures::stream::BoxStream;

/// Decoded events from one realtime connection. The stream ends when the
/// connection closes.
pub type RealtimeStream = BoxStream<'static, AppResult<RealtimeEvent>>;

/// Port for opening a realtime connection.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Opens a connection authenticated with `bearer`.
    async fn connect(&self, bearer: Option<BearerToken>) -> AppResult<RealtimeStream>;
}
