//! Page controllers: filter state, cache-keyed queries and modal mutations
//! for each business screen.
//!
//! Reads never fail the page: a failed query comes back as a view with
//! `error` set, so one panel's failure cannot blank another.

use fundline_core::{AppError, AppResult};
use fundline_domain::{MutationAck, Permission, Toast, decode_record};
use serde_json::Value;

use crate::mutation::{Mutation, MutationRunner};
use crate::query_cache::QueryCache;
use crate::session_store::SessionStore;

mod agents;
mod communications;
mod crud;
mod dashboard;
mod documents;
mod list;
mod reports;
mod settings;
mod view;


pub use agents::AgentsPage;
pub use communications::CommunicationsPage;
pub use crud::{
    CaseRecords, CasesPage, CrudPage, CrudResource, LawFirmRecords, LawFirmsPage,
    PlaintiffRecords, PlaintiffsPage,
};
pub use dashboard::{DashboardPage, DashboardView};
pub use documents::{DocumentsPage, UploadFile};
pub use list::{ListState, ModalState};
pub use reports::ReportsPage;
pub use settings::{SettingsPage, SettingsView};
pub use view::{ListView, ResourceView};

/// Services shared by every page controller.
#[derive(Clone)]
pub struct PageContext {
    cache: QueryCache,
    mutations: MutationRunner,
    session: SessionStore,
}

impl PageContext {
    /// Creates a context over the shared cache and session store.
    #[must_use]
    pub fn new(cache: QueryCache, session: SessionStore) -> Self {
        Self {
            mutations: MutationRunner::new(cache.clone()),
            cache,
            session,
        }
    }

    /// Shared query cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Mutation runner.
    #[must_use]
    pub fn mutations(&self) -> &MutationRunner {
        &self.mutations
    }

    /// Session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Shows a success toast.
    pub(crate) fn confirm(&self, message: &str) {
        self.cache.client().notifier().notify(Toast::success(message));
    }

    /// Checks `permission`, toasting the denial.
    pub(crate) fn authorize(&self, permission: &Permission) -> AppResult<()> {
        self.session
            .require(permission)
            .map_err(|error| self.cache.client().report(error))
    }

    /// Checks `permission`, then runs `mutation`.
    pub(crate) async fn mutate(&self, permission: &Permission, mutation: Mutation) -> AppResult<Value> {
        self.authorize(permission)?;
        self.mutations.run(mutation).await
    }

    /// Checks `permission`, then runs `mutations` sequentially with one invalidation.
    pub(crate) async fn mutate_batch(
        &self,
        permission: &Permission,
        mutations: Vec<Mutation>,
    ) -> AppResult<Vec<Value>> {
        self.authorize(permission)?;
        self.mutations.run_batch(mutations).await
    }

    /// Reports a response that could not be decoded.
    pub(crate) fn decode_failure(&self, error: AppError) -> AppError {
        self.cache.client().report(error)
    }
}

/// Decodes an acknowledgement body; an empty body is a bare success.
pub(crate) fn decode_ack(value: &Value) -> AppResult<MutationAck> {
    if value.is_null() {
        return Ok(MutationAck::default());
    }
    decode_record(value, "result")
}
