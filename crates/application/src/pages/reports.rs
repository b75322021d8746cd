use chrono::NaiveDate;
use fundline_core::AppResult;
use fundline_domain::{
    AgentMetricsReport, AnalyticsReport, ExportFormat, QueryKey, QueryParams, ReportFilter,
    ReportPeriod, Resource,
};
use tracing::info;

use super::PageContext;
use super::view::ResourceView;
use crate::api_client::Download;
use crate::query_cache::QueryPolicy;

/// Reports screen.
pub struct ReportsPage {
    ctx: PageContext,
    filter: ReportFilter,
    policy: QueryPolicy,
}

impl ReportsPage {
    /// Creates the controller over the last 30 days.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            filter: ReportFilter::for_period(ReportPeriod::Month),
            policy: QueryPolicy::dashboard(),
        }
    }

    /// Active filter.
    #[must_use]
    pub fn filter(&self) -> &ReportFilter {
        &self.filter
    }

    /// Switches to a rolling period.
    pub fn set_period(&mut self, period: ReportPeriod) -> bool {
        let filter = ReportFilter::for_period(period);
        let changed = self.filter != filter;
        self.filter = filter;
        changed
    }

    /// Switches to an explicit date range.
    pub fn set_range(&mut self, date_from: NaiveDate, date_to: NaiveDate) -> AppResult<bool> {
        let filter = ReportFilter::for_range(date_from, date_to)?;
        let changed = self.filter != filter;
        self.filter = filter;
        Ok(changed)
    }

    /// Overview figures and trend series.
    pub async fn analytics(&self) -> ResourceView<AnalyticsReport> {
        let key = QueryKey::build(Resource::Reports, Resource::Reports.path(), &self.filter);
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Per-agent efficiency figures.
    pub async fn agent_metrics(&self) -> ResourceView<AgentMetricsReport> {
        let key = QueryKey::build(Resource::Reports, "/reports/agent-metrics", &self.filter);
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Downloads the current report as a file.
    pub async fn export(&self, format: ExportFormat) -> AppResult<Download> {
        let mut query: Vec<(String, String)> = self
            .filter
            .query_params()
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        query.push(("format".to_owned(), format.to_string()));

        let download = self
            .ctx
            .cache()
            .client()
            .download("/reports/export", query)
            .await?;
        info!(%format, bytes = download.bytes.len(), "report exported");
        self.ctx.confirm("Report exported");
        Ok(download)
    }
}
