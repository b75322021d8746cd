use chrono::{DateTime, Utc};
use fundline_core::{AppError, AppResult};
use fundline_domain::{Page, Pagination};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::query_cache::QuerySnapshot;

/// Rendered state of a paginated list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    /// Rows.
    pub items: Vec<T>,
    /// Total rows.
    pub total: u64,
    /// Current page.
    pub page: u32,
    /// Number of pages for the current page size.
    pub page_count: u32,
    /// Rows are outdated.
    pub is_stale: bool,
    /// A refetch is running.
    pub is_fetching: bool,
    /// Rows belong to the previously viewed page.
    pub is_previous: bool,
    /// Last failure.
    pub error: Option<AppError>,
}

impl<T> ListView<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn from_snapshot(
        snapshot: &QuerySnapshot,
        collection: &str,
        pagination: Pagination,
    ) -> Self {
        let decoded = snapshot.map_data(|value| Page::<T>::from_value(value, collection));
        let (page, decode_error) = match decoded {
            Ok(page) => (page, None),
            Err(error) => (None, Some(error)),
        };

        let (items, total) = page.map_or_else(|| (Vec::new(), 0), |page| (page.items, page.total));

        Self {
            page_count: pagination.page_count(total),
            page: pagination.page(),
            items,
            total,
            is_stale: snapshot.is_stale,
            is_fetching: snapshot.is_fetching,
            is_previous: snapshot.is_previous,
            error: decode_error.or_else(|| snapshot.error.clone()),
        }
    }
}

/// Rendered state of a single resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView<T> {
    /// Decoded data.
    pub data: Option<T>,
    /// Data is outdated.
    pub is_stale: bool,
    /// Data is static fallback content.
    pub is_placeholder: bool,
    /// When the data was received.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Last failure.
    pub error: Option<AppError>,
}

impl<T> ResourceView<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        Self::decode_with(snapshot, |value| {
            T::deserialize(value).map_err(|error| {
                AppError::Internal(format!("unexpected payload for '{}': {error}", snapshot.key))
            })
        })
    }

    pub(crate) fn decode_with(
        snapshot: &QuerySnapshot,
        decode: impl FnOnce(&Value) -> AppResult<T>,
    ) -> Self {
        let (data, decode_error) = match snapshot.map_data(decode) {
            Ok(data) => (data, None),
            Err(error) => (None, Some(error)),
        };

        Self {
            data,
            is_stale: snapshot.is_stale,
            is_placeholder: snapshot.is_placeholder,
            fetched_at: snapshot.fetched_at,
            error: decode_error.or_else(|| snapshot.error.clone()),
        }
    }
}
