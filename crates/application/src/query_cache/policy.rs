use std::time::Duration;

/// Fixed-delay retry for read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub attempts: u32,
    /// Pause before each extra attempt.
    pub delay: Duration,
}

/// Caching rules declared by each query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Age after which cached data is shown but refetched.
    pub stale_time: Duration,
    /// Time an unsubscribed entry is kept before collection.
    pub gc_time: Duration,
    /// Polling period while subscribed.
    pub refetch_interval: Option<Duration>,
    /// Retry on server and transport failures.
    pub retry: Option<RetryPolicy>,
    /// Keep showing the previous page while the next one loads.
    pub keep_previous_data: bool,
}

const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

impl QueryPolicy {
    /// Paginated list screens.
    #[must_use]
    pub fn list() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            gc_time: DEFAULT_GC_TIME,
            refetch_interval: None,
            retry: None,
            keep_previous_data: true,
        }
    }

    /// Status-sensitive data such as agent and system health.
    #[must_use]
    pub fn live() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: DEFAULT_GC_TIME,
            refetch_interval: Some(Duration::from_secs(30)),
            retry: None,
            keep_previous_data: false,
        }
    }

    /// Dashboard counters.
    #[must_use]
    pub fn dashboard() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            gc_time: DEFAULT_GC_TIME,
            refetch_interval: Some(Duration::from_secs(60)),
            retry: None,
            keep_previous_data: false,
        }
    }

    /// Rarely changing reference data such as templates and settings categories.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            stale_time: Duration::from_secs(10 * 60),
            gc_time: Duration::from_secs(30 * 60),
            refetch_interval: None,
            retry: Some(RetryPolicy {
                attempts: 1,
                delay: Duration::from_secs(1),
            }),
            keep_previous_data: false,
        }
    }

    /// Overrides the polling period.
    #[must_use]
    pub fn with_refetch_interval(mut self, interval: Option<Duration>) -> Self {
        self.refetch_interval = interval;
        self
    }
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self::list()
    }
}
