//! List, detail and modal-form controller shared by the record screens.

use std::marker::PhantomData;

use fundline_core::AppResult;
use fundline_domain::{
    Case, CaseDashboardStats, CaseFilter, CaseForm, CasePayload, CaseStatus, CaseType, LawFirm,
    LawFirmForm, LawFirmPayload, PartyFilter, PartyStatus, Permission, Plaintiff, PlaintiffForm,
    PlaintiffPayload, Priority, QueryKey, QueryParams, RecordId, Resource, decode_record,
    normalize_search, parse_choice,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::PageContext;
use super::list::{ListState, ModalState};
use super::view::{ListView, ResourceView};
use crate::mutation::Mutation;
use crate::query_cache::QueryPolicy;

/// A record family edited through a list screen with a create/edit modal.
pub trait CrudResource {
    /// Owning resource.
    const RESOURCE: Resource;
    /// Field wrapping a single record in detail and mutation responses.
    const RECORD_FIELD: &'static str;
    /// Screen filter.
    type Filter: QueryParams + Clone + PartialEq + Default + Send + Sync;
    /// Decoded row.
    type Record: DeserializeOwned;
    /// Raw modal input.
    type Form;
    /// Validated request body.
    type Payload: Serialize;

    /// Validates modal input without touching the network.
    fn validate(form: &Self::Form) -> AppResult<Self::Payload>;
}

/// Cases.
#[derive(Debug, Clone, Copy)]
pub struct CaseRecords;

impl CrudResource for CaseRecords {
    const RESOURCE: Resource = Resource::Cases;
    const RECORD_FIELD: &'static str = "case";
    type Filter = CaseFilter;
    type Record = Case;
    type Form = CaseForm;
    type Payload = CasePayload;

    fn validate(form: &CaseForm) -> AppResult<Self::Payload> {
        form.validate()
    }
}

/// Plaintiffs.
#[derive(Debug, Clone, Copy)]
pub struct PlaintiffRecords;

impl CrudResource for PlaintiffRecords {
    const RESOURCE: Resource = Resource::Plaintiffs;
    const RECORD_FIELD: &'static str = "plaintiff";
    type Filter = PartyFilter;
    type Record = Plaintiff;
    type Form = PlaintiffForm;
    type Payload = PlaintiffPayload;

    fn validate(form: &PlaintiffForm) -> AppResult<Self::Payload> {
        form.validate()
    }
}

/// Law firms.
#[derive(Debug, Clone, Copy)]
pub struct LawFirmRecords;

impl CrudResource for LawFirmRecords {
    const RESOURCE: Resource = Resource::LawFirms;
    const RECORD_FIELD: &'static str = "law_firm";
    type Filter = PartyFilter;
    type Record = LawFirm;
    type Form = LawFirmForm;
    type Payload = LawFirmPayload;

    fn validate(form: &LawFirmForm) -> AppResult<Self::Payload> {
        form.validate()
    }
}

/// Cases screen.
pub type CasesPage = CrudPage<CaseRecords>;
/// Plaintiffs screen.
pub type PlaintiffsPage = CrudPage<PlaintiffRecords>;
/// Law firms screen.
pub type LawFirmsPage = CrudPage<LawFirmRecords>;

/// Controller for one record screen.
pub struct CrudPage<K: CrudResource> {
    ctx: PageContext,
    list: ListState<K::Filter>,
    policy: QueryPolicy,
    kind: PhantomData<K>,
}

impl<K: CrudResource> CrudPage<K> {
    /// Creates the controller on page 1 with no filter.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            list: ListState::new(K::RESOURCE),
            policy: QueryPolicy::list(),
            kind: PhantomData,
        }
    }

    /// List state.
    #[must_use]
    pub fn list(&self) -> &ListState<K::Filter> {
        &self.list
    }

    /// Mutable list state for filter, page and selection changes.
    pub fn list_mut(&mut self) -> &mut ListState<K::Filter> {
        &mut self.list
    }

    /// Modal state.
    #[must_use]
    pub fn modal(&self) -> &ModalState {
        self.list.modal()
    }

    /// Loads the current page.
    pub async fn load(&mut self) -> ListView<K::Record> {
        self.list.load(&self.ctx, &self.policy).await
    }

    /// Waits for the background refresh started by `load`.
    pub async fn settle(&mut self) -> ListView<K::Record> {
        self.list.settle(&self.ctx).await
    }

    /// Loads one record for the detail panel.
    pub async fn detail(&self, id: &RecordId) -> ResourceView<K::Record> {
        let key = detail_key::<K>(id);
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::decode_with(&snapshot, |value| decode_record(value, K::RECORD_FIELD))
    }

    /// Loads the selected record, if any.
    pub async fn selected_detail(&self) -> Option<ResourceView<K::Record>> {
        let id = self.list.selected()?.clone();
        Some(self.detail(&id).await)
    }

    /// Validates and creates a record, then closes the modal.
    ///
    /// Validation errors are returned for inline display and send nothing.
    pub async fn create(&mut self, form: &K::Form) -> AppResult<K::Record> {
        let payload = K::validate(form)?;
        let mutation = Mutation::post(K::RESOURCE, K::RESOURCE.path(), &payload)?;
        let record = self.submit(mutation).await?;
        self.ctx.confirm(&format!("{} created", label::<K>()));
        Ok(record)
    }

    /// Validates and updates a record, then closes the modal.
    pub async fn update(&mut self, id: &RecordId, form: &K::Form) -> AppResult<K::Record> {
        let payload = K::validate(form)?;
        let mutation = Mutation::put(K::RESOURCE, record_path::<K>(id), &payload)?;
        let record = self.submit(mutation).await?;
        self.ctx.confirm(&format!("{} updated", label::<K>()));
        Ok(record)
    }

    /// Deletes a record and drops it from the selection.
    pub async fn delete(&mut self, id: &RecordId) -> AppResult<()> {
        self.ctx
            .mutate(
                &Permission::write(K::RESOURCE),
                Mutation::delete(K::RESOURCE, record_path::<K>(id)),
            )
            .await?;
        self.list.forget(id);
        self.ctx.confirm(&format!("{} deleted", label::<K>()));
        Ok(())
    }

    async fn submit(&mut self, mutation: Mutation) -> AppResult<K::Record> {
        let value = self
            .ctx
            .mutate(&Permission::write(K::RESOURCE), mutation)
            .await?;
        self.list.close_modal();
        decode_record(&value, K::RECORD_FIELD).map_err(|error| self.ctx.decode_failure(error))
    }
}

fn record_path<K: CrudResource>(id: &RecordId) -> String {
    format!("{}/{id}", K::RESOURCE.path())
}

fn detail_key<K: CrudResource>(id: &RecordId) -> QueryKey {
    QueryKey::build(K::RESOURCE, record_path::<K>(id), &())
}

fn label<K: CrudResource>() -> &'static str {
    match K::RESOURCE {
        Resource::Cases => "Case",
        Resource::Plaintiffs => "Plaintiff",
        Resource::LawFirms => "Law firm",
        _ => "Record",
    }
}

impl CrudPage<CaseRecords> {
    /// Applies the search box. Blank input clears the search.
    pub fn set_search(&mut self, raw: &str) -> bool {
        let search = normalize_search(raw);
        self.list.update_filter(|filter| filter.search = search)
    }

    /// Applies the status dropdown; `all` or blank clears it.
    pub fn set_status(&mut self, raw: &str) -> AppResult<bool> {
        let status = parse_choice::<CaseStatus>(raw)?;
        Ok(self.list.update_filter(|filter| filter.status = status))
    }

    /// Applies the case type dropdown.
    pub fn set_case_type(&mut self, raw: &str) -> AppResult<bool> {
        let case_type = parse_choice::<CaseType>(raw)?;
        Ok(self.list.update_filter(|filter| filter.case_type = case_type))
    }

    /// Applies the priority dropdown.
    pub fn set_priority(&mut self, raw: &str) -> AppResult<bool> {
        let priority = parse_choice::<Priority>(raw)?;
        Ok(self.list.update_filter(|filter| filter.priority = priority))
    }

    /// Header counters.
    pub async fn stats(&self) -> ResourceView<CaseDashboardStats> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::CaseStats), &QueryPolicy::dashboard())
            .await;
        ResourceView::from_snapshot(&snapshot)
    }
}

macro_rules! party_filters {
    ($kind:ty) => {
        impl CrudPage<$kind> {
            /// Applies the search box. Blank input clears the search.
            pub fn set_search(&mut self, raw: &str) -> bool {
                let search = normalize_search(raw);
                self.list.update_filter(|filter| filter.search = search)
            }

            /// Applies the status dropdown; `all` or blank clears it.
            pub fn set_status(&mut self, raw: &str) -> AppResult<bool> {
                let status = parse_choice::<PartyStatus>(raw)?;
                Ok(self.list.update_filter(|filter| filter.status = status))
            }
        }
    };
}

party_filters!(PlaintiffRecords);
party_filters!(LawFirmRecords);
