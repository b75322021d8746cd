use std::collections::BTreeSet;

use crate::wire_enum::wire_enum;

wire_enum! {
    /// Backend resource families that cached queries belong to.
    ///
    /// Every mutation names exactly one resource; the cache keys that become
    /// stale are derived from [`Resource::invalidation_set`], never listed by
    /// hand at the call site.
    pub enum Resource {
        /// Case list and case detail queries.
        Cases => "cases",
        /// Aggregated case counters shown on the cases screen.
        CaseStats => "case_stats",
        /// Plaintiff list and detail queries.
        Plaintiffs => "plaintiffs",
        /// Law firm list and detail queries.
        LawFirms => "law_firms",
        /// Document list, detail and analysis queries.
        Documents => "documents",
        /// Communication history queries.
        Communications => "communications",
        /// Email and SMS templates.
        Templates => "templates",
        /// Agent status and metrics queries.
        Agents => "agents",
        /// Report analytics and agent metrics.
        Reports => "reports",
        /// Settings categories and agent settings.
        Settings => "settings",
        /// Dashboard headline counters.
        DashboardStats => "dashboard_stats",
        /// Recent activity feed.
        Activity => "activity",
        /// Backend health probe.
        Health => "health",
        /// Current user identity.
        Session => "session",
    }
}

impl Resource {
    /// Returns the collection endpoint for this resource, relative to the API prefix.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Cases => "/cases",
            Self::CaseStats => "/cases/dashboard-stats",
            Self::Plaintiffs => "/plaintiffs",
            Self::LawFirms => "/law-firms",
            Self::Documents => "/documents",
            Self::Communications => "/communications",
            Self::Templates => "/communications/templates",
            Self::Agents => "/agents/status",
            Self::Reports => "/reports/analytics",
            Self::Settings => "/settings/categories",
            Self::DashboardStats => "/dashboard/stats",
            Self::Activity => "/activity/recent",
            Self::Health => "/health",
            Self::Session => "/auth/me",
        }
    }

    /// Returns the envelope field that holds list items in collection responses.
    #[must_use]
    pub fn collection_field(&self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Plaintiffs => "plaintiffs",
            Self::LawFirms => "law_firms",
            Self::Documents => "documents",
            Self::Communications => "communications",
            Self::Templates => "templates",
            Self::Agents => "agents",
            Self::Activity => "activities",
            Self::Settings => "categories",
            Self::Reports => "trends",
            Self::CaseStats | Self::DashboardStats | Self::Health | Self::Session => "items",
        }
    }

    /// Returns the resources whose cached data derives from this one.
    #[must_use]
    pub fn dependents(&self) -> &'static [Resource] {
        match self {
            Self::Cases => &[
                Self::CaseStats,
                Self::DashboardStats,
                Self::Activity,
                Self::Reports,
            ],
            Self::Plaintiffs => &[Self::Cases, Self::Activity],
            Self::LawFirms => &[Self::Cases, Self::Activity],
            Self::Documents => &[Self::Cases, Self::DashboardStats, Self::Activity],
            Self::Communications => &[Self::DashboardStats, Self::Activity],
            Self::Agents => &[
                Self::Health,
                Self::DashboardStats,
                Self::Reports,
                Self::Activity,
            ],
            Self::Settings => &[Self::Agents],
            Self::Templates
            | Self::CaseStats
            | Self::Reports
            | Self::DashboardStats
            | Self::Activity
            | Self::Health
            | Self::Session => &[],
        }
    }

    /// Returns this resource plus every resource reachable through
    /// [`Resource::dependents`].
    #[must_use]
    pub fn invalidation_set(&self) -> BTreeSet<Resource> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![*self];

        while let Some(resource) = pending.pop() {
            if visited.insert(resource) {
                pending.extend(resource.dependents().iter().copied());
            }
        }

        visited
    }

    /// Maps a backend entity name (as used in realtime events) to its resource.
    #[must_use]
    pub fn from_entity_name(entity: &str) -> Option<Self> {
        match entity.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "case" | "cases" => Some(Self::Cases),
            "plaintiff" | "plaintiffs" => Some(Self::Plaintiffs),
            "law_firm" | "law_firms" => Some(Self::LawFirms),
            "document" | "documents" => Some(Self::Documents),
            "communication" | "communications" => Some(Self::Communications),
            "template" | "templates" => Some(Self::Templates),
            "agent" | "agents" => Some(Self::Agents),
            "setting" | "settings" => Some(Self::Settings),
            "report" | "reports" => Some(Self::Reports),
            "activity" => Some(Self::Activity),
            _ => None,
        }
    }
}
