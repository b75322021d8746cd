use std::sync::Arc;

use fundline_domain::{
    ActivityItem, CaseDashboardStats, DashboardStats, HealthStatus, Page, QueryKey, Resource,
};
use tracing::debug;

use super::PageContext;
use super::view::ResourceView;
use crate::query_cache::{PollHandle, QueryPolicy};
use crate::realtime_channel::RealtimeChannel;

/// Dashboard panels, each loaded and failing on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// Headline counters.
    pub stats: ResourceView<DashboardStats>,
    /// Case counters.
    pub case_stats: ResourceView<CaseDashboardStats>,
    /// Recent activity feed.
    pub activity: ResourceView<Vec<ActivityItem>>,
    /// Backend health.
    pub health: ResourceView<HealthStatus>,
}

/// Dashboard screen. Mounting starts polling and the realtime channel;
/// unmounting or dropping stops both.
pub struct DashboardPage {
    ctx: PageContext,
    policy: QueryPolicy,
    realtime: Option<Arc<RealtimeChannel>>,
    polls: Vec<PollHandle>,
}

impl DashboardPage {
    /// Creates an unmounted dashboard.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            policy: QueryPolicy::dashboard(),
            realtime: None,
            polls: Vec::new(),
        }
    }

    /// Attaches the realtime channel opened while the dashboard is mounted.
    #[must_use]
    pub fn with_realtime(mut self, channel: Arc<RealtimeChannel>) -> Self {
        self.realtime = Some(channel);
        self
    }

    /// Overrides the refresh policy.
    #[must_use]
    pub fn with_policy(mut self, policy: QueryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts background refresh and connects the realtime channel.
    pub fn mount(&mut self) {
        if self.is_mounted() {
            return;
        }

        let cache = self.ctx.cache();
        self.polls = [
            Resource::DashboardStats,
            Resource::CaseStats,
            Resource::Activity,
            Resource::Health,
        ]
        .into_iter()
        .map(|resource| cache.poll(&QueryKey::root(resource), &self.policy))
        .collect();

        if let Some(channel) = &self.realtime {
            channel.connect();
        }
        debug!("dashboard mounted");
    }

    /// Stops background refresh and disconnects the realtime channel.
    pub fn unmount(&mut self) {
        if !self.is_mounted() {
            return;
        }

        self.polls.clear();
        if let Some(channel) = &self.realtime {
            channel.disconnect();
        }
        debug!("dashboard unmounted");
    }

    /// Returns true between `mount` and `unmount`.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.polls.is_empty()
    }

    /// Loads every panel concurrently.
    pub async fn load(&self) -> DashboardView {
        let (stats, case_stats, activity, health) =
            tokio::join!(self.stats(), self.case_stats(), self.activity(), self.health());
        DashboardView {
            stats,
            case_stats,
            activity,
            health,
        }
    }

    /// Headline counters.
    pub async fn stats(&self) -> ResourceView<DashboardStats> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::DashboardStats), &self.policy)
            .await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Case counters.
    pub async fn case_stats(&self) -> ResourceView<CaseDashboardStats> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::CaseStats), &self.policy)
            .await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Recent activity feed.
    pub async fn activity(&self) -> ResourceView<Vec<ActivityItem>> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::Activity), &self.policy)
            .await;
        ResourceView::decode_with(&snapshot, |value| {
            Page::from_value(value, Resource::Activity.collection_field()).map(|page| page.items)
        })
    }

    /// Backend health.
    pub async fn health(&self) -> ResourceView<HealthStatus> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::Health), &self.policy)
            .await;
        ResourceView::from_snapshot(&snapshot)
    }
}

impl Drop for DashboardPage {
    fn drop(&mut self) {
        self.unmount();
    }
}
