//! Per-screen filter state and its query-string projection.

use chrono::NaiveDate;
use fundline_core::{AppError, AppResult};

use crate::choices::{
    CaseStatus, CaseType, Channel, CommunicationStatus, Direction, DocumentStatus, DocumentType,
    PartyStatus, Priority, ReportPeriod,
};

/// Default number of rows per list page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the backend accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Values that contribute query-string parameters to a request and its cache key.
pub trait QueryParams {
    /// Returns `(name, value)` pairs; unset filters are omitted.
    fn query_params(&self) -> Vec<(&'static str, String)>;
}

impl QueryParams for () {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// One-based page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Creates a validated page position.
    pub fn new(page: u32, limit: u32) -> AppResult<Self> {
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_owned()));
        }

        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self { page, limit })
    }

    /// Returns the current page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the number of pages needed for `total` rows.
    #[must_use]
    pub fn page_count(&self, total: u64) -> u32 {
        let pages = total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryParams for Pagination {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Filter plus page position for one list screen.
///
/// Any filter change sends the list back to page 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery<F> {
    filter: F,
    pagination: Pagination,
}

impl<F> ListQuery<F>
where
    F: Clone + PartialEq,
{
    /// Creates list state on page 1 with the default page size.
    #[must_use]
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            pagination: Pagination::default(),
        }
    }

    /// Returns the active filter.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Returns the active page position.
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Replaces the filter and resets to page 1. Returns whether anything changed.
    pub fn set_filter(&mut self, filter: F) -> bool {
        let changed = self.filter != filter || self.pagination.page != 1;
        self.filter = filter;
        self.pagination.page = 1;
        changed
    }

    /// Applies an in-place edit to the filter and resets to page 1.
    pub fn update_filter(&mut self, edit: impl FnOnce(&mut F)) -> bool {
        let mut filter = self.filter.clone();
        edit(&mut filter);
        self.set_filter(filter)
    }

    /// Moves to another page, keeping the filter.
    pub fn set_page(&mut self, page: u32) -> AppResult<()> {
        self.pagination = Pagination::new(page, self.pagination.limit)?;
        Ok(())
    }

    /// Changes the page size and resets to page 1.
    pub fn set_page_size(&mut self, limit: u32) -> AppResult<()> {
        self.pagination = Pagination::new(1, limit)?;
        Ok(())
    }

    /// Advances one page unless already on the last page for `total` rows.
    pub fn next_page(&mut self, total: u64) -> bool {
        if self.pagination.page >= self.pagination.page_count(total) {
            return false;
        }

        self.pagination.page += 1;
        true
    }

    /// Goes back one page unless already on page 1.
    pub fn previous_page(&mut self) -> bool {
        if self.pagination.page <= 1 {
            return false;
        }

        self.pagination.page -= 1;
        true
    }
}

impl<F> QueryParams for ListQuery<F>
where
    F: QueryParams,
{
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.filter.query_params();
        params.extend(self.pagination.query_params());
        params
    }
}

/// Normalises free-text search input; blank input means no search.
#[must_use]
pub fn normalize_search(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn push_opt(params: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<String>) {
    if let Some(value) = value {
        params.push((name, value));
    }
}

/// Cases screen filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CaseFilter {
    /// Free-text search over case number, title and plaintiff.
    pub search: Option<String>,
    /// Status dropdown.
    pub status: Option<CaseStatus>,
    /// Case type dropdown.
    pub case_type: Option<CaseType>,
    /// Priority dropdown.
    pub priority: Option<Priority>,
}

impl QueryParams for CaseFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_opt(&mut params, "search", self.search.clone());
        push_opt(&mut params, "status", self.status.map(|value| value.to_string()));
        push_opt(
            &mut params,
            "case_type",
            self.case_type.map(|value| value.to_string()),
        );
        push_opt(
            &mut params,
            "priority",
            self.priority.map(|value| value.to_string()),
        );
        params
    }
}

/// Plaintiffs and law firms screen filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PartyFilter {
    /// Free-text search over name, email and phone.
    pub search: Option<String>,
    /// Status dropdown.
    pub status: Option<PartyStatus>,
}

impl QueryParams for PartyFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_opt(&mut params, "search", self.search.clone());
        push_opt(&mut params, "status", self.status.map(|value| value.to_string()));
        params
    }
}

/// Documents screen filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocumentFilter {
    /// Free-text search over file names.
    pub search: Option<String>,
    /// Document type dropdown.
    pub document_type: Option<DocumentType>,
    /// Processing status dropdown.
    pub status: Option<DocumentStatus>,
    /// Restricts the list to one case.
    pub case_id: Option<String>,
}

impl QueryParams for DocumentFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_opt(&mut params, "search", self.search.clone());
        push_opt(
            &mut params,
            "document_type",
            self.document_type.map(|value| value.to_string()),
        );
        push_opt(&mut params, "status", self.status.map(|value| value.to_string()));
        push_opt(&mut params, "case_id", self.case_id.clone());
        params
    }
}

/// Communications screen filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CommunicationFilter {
    /// Free-text search over subject, body and recipient.
    pub search: Option<String>,
    /// Channel dropdown.
    pub channel: Option<Channel>,
    /// Delivery status dropdown.
    pub status: Option<CommunicationStatus>,
    /// Direction dropdown.
    pub direction: Option<Direction>,
}

impl QueryParams for CommunicationFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_opt(&mut params, "search", self.search.clone());
        push_opt(&mut params, "type", self.channel.map(|value| value.to_string()));
        push_opt(&mut params, "status", self.status.map(|value| value.to_string()));
        push_opt(
            &mut params,
            "direction",
            self.direction.map(|value| value.to_string()),
        );
        params
    }
}

/// Reports screen filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReportFilter {
    period: Option<ReportPeriod>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl ReportFilter {
    /// Creates a filter over a rolling period.
    #[must_use]
    pub fn for_period(period: ReportPeriod) -> Self {
        Self {
            period: Some(period),
            date_from: None,
            date_to: None,
        }
    }

    /// Creates a filter over an explicit inclusive date range.
    pub fn for_range(date_from: NaiveDate, date_to: NaiveDate) -> AppResult<Self> {
        if date_from > date_to {
            return Err(AppError::Validation(
                "report start date must not be after end date".to_owned(),
            ));
        }

        Ok(Self {
            period: None,
            date_from: Some(date_from),
            date_to: Some(date_to),
        })
    }

    /// Returns the rolling period, if any.
    #[must_use]
    pub fn period(&self) -> Option<ReportPeriod> {
        self.period
    }
}

impl QueryParams for ReportFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_opt(&mut params, "period", self.period.map(|value| value.to_string()));
        push_opt(
            &mut params,
            "date_from",
            self.date_from.map(|value| value.format("%Y-%m-%d").to_string()),
        );
        push_opt(
            &mut params,
            "date_to",
            self.date_to.map(|value| value.format("%Y-%m-%d").to_string()),
        );
        params
    }
}
