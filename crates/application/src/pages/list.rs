use fundline_core::AppResult;
use fundline_domain::{ListQuery, Pagination, QueryKey, QueryParams, RecordId, Resource};
use serde::de::DeserializeOwned;

use super::PageContext;
use super::view::ListView;
use crate::query_cache::QueryPolicy;

/// Create/edit modal state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
    /// No modal shown.
    #[default]
    Closed,
    /// Create form shown.
    Create,
    /// Edit form for one record shown.
    Edit(RecordId),
}

/// Filter, page, selection and modal state of one list screen.
#[derive(Debug, Clone)]
pub struct ListState<F> {
    resource: Resource,
    query: ListQuery<F>,
    shown: Option<(QueryKey, Pagination)>,
    selected: Option<RecordId>,
    modal: ModalState,
}

impl<F> ListState<F>
where
    F: QueryParams + Clone + PartialEq + Default,
{
    /// Creates page-1 state with an empty filter.
    #[must_use]
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            query: ListQuery::new(F::default()),
            shown: None,
            selected: None,
            modal: ModalState::Closed,
        }
    }

    /// Filter and pagination.
    #[must_use]
    pub fn query(&self) -> &ListQuery<F> {
        &self.query
    }

    /// Active filter.
    #[must_use]
    pub fn filter(&self) -> &F {
        self.query.filter()
    }

    /// Cache key of the current page.
    #[must_use]
    pub fn key(&self) -> QueryKey {
        QueryKey::list(self.resource, &self.query)
    }

    /// Replaces the filter and resets to page 1.
    pub fn set_filter(&mut self, filter: F) -> bool {
        self.query.set_filter(filter)
    }

    /// Edits the filter in place and resets to page 1.
    pub fn update_filter(&mut self, edit: impl FnOnce(&mut F)) -> bool {
        self.query.update_filter(edit)
    }

    /// Jumps to `page`.
    pub fn set_page(&mut self, page: u32) -> AppResult<()> {
        self.query.set_page(page)
    }

    /// Changes the page size and resets to page 1.
    pub fn set_page_size(&mut self, limit: u32) -> AppResult<()> {
        self.query.set_page_size(limit)
    }

    /// Advances unless on the last page.
    pub fn next_page(&mut self, total: u64) -> bool {
        self.query.next_page(total)
    }

    /// Goes back unless on page 1.
    pub fn previous_page(&mut self) -> bool {
        self.query.previous_page()
    }

    /// Opens the detail panel for `id`.
    pub fn select(&mut self, id: RecordId) {
        self.selected = Some(id);
    }

    /// Closes the detail panel.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Record shown in the detail panel.
    #[must_use]
    pub fn selected(&self) -> Option<&RecordId> {
        self.selected.as_ref()
    }

    /// Opens the create form.
    pub fn open_create(&mut self) {
        self.modal = ModalState::Create;
    }

    /// Opens the edit form for `id`.
    pub fn open_edit(&mut self, id: RecordId) {
        self.modal = ModalState::Edit(id);
    }

    /// Closes the modal.
    pub fn close_modal(&mut self) {
        self.modal = ModalState::Closed;
    }

    /// Modal state.
    #[must_use]
    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    /// Loads the current page, showing the previous page while it loads.
    ///
    /// Stale rows are returned at once while a background refresh runs; see
    /// [`ListState::settle`].
    pub async fn load<T>(&mut self, ctx: &PageContext, policy: &QueryPolicy) -> ListView<T>
    where
        T: DeserializeOwned,
    {
        let key = self.key();
        let previous = self.shown.as_ref().map(|(key, _)| key);
        let snapshot = ctx.cache().fetch_paginated(&key, previous, policy).await;

        // previous rows are labelled with the page they came from
        let shown = self.shown.as_ref().map(|(_, pagination)| *pagination);
        let pagination = match shown {
            Some(shown) if snapshot.is_previous => shown,
            _ => {
                self.shown = Some((key, self.query.pagination()));
                self.query.pagination()
            }
        };

        ListView::from_snapshot(&snapshot, self.resource.collection_field(), pagination)
    }

    /// Waits for the refresh of the current page and renders the result.
    pub async fn settle<T>(&mut self, ctx: &PageContext) -> ListView<T>
    where
        T: DeserializeOwned,
    {
        let key = self.key();
        let snapshot = ctx.cache().settle(&key).await;
        let pagination = self.query.pagination();
        if snapshot.data.is_some() {
            self.shown = Some((key, pagination));
        }

        ListView::from_snapshot(&snapshot, self.resource.collection_field(), pagination)
    }

    pub(crate) fn forget(&mut self, id: &RecordId) {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.modal == ModalState::Edit(id.clone()) {
            self.modal = ModalState::Closed;
        }
    }
}
