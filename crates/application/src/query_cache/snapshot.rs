use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundline_core::{AppError, AppResult};
use fundline_domain::QueryKey;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    /// First fetch in flight, no data yet.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed; earlier data, if any, is kept.
    Error,
}

/// Point-in-time view of one cached query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    /// Key.
    pub key: QueryKey,
    /// Last good data, or placeholder/previous-page data when flagged.
    pub data: Option<Arc<Value>>,
    /// Status.
    pub status: QueryStatus,
    /// Data is outdated or invalidated.
    pub is_stale: bool,
    /// A request for this key is in flight.
    pub is_fetching: bool,
    /// `data` is static fallback content, not backend data.
    pub is_placeholder: bool,
    /// `data` belongs to the previously viewed page.
    pub is_previous: bool,
    /// When `data` was received.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Last failure.
    pub error: Option<AppError>,
}

impl QuerySnapshot {
    /// Returns true when data is available.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Decodes `data` into a typed value.
    pub fn decode<T>(&self) -> AppResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.data
            .as_deref()
            .map(|value| {
                T::deserialize(value).map_err(|error| {
                    AppError::Internal(format!("unexpected payload for '{}': {error}", self.key))
                })
            })
            .transpose()
    }

    /// Maps `data` through `decode`, preserving `None`.
    pub fn map_data<T>(&self, decode: impl FnOnce(&Value) -> AppResult<T>) -> AppResult<Option<T>> {
        self.data.as_deref().map(decode).transpose()
    }
}
