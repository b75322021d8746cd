//! Client services: API access, session, query cache, realtime channel and
//! page controllers.

#![forbid(unsafe_code)]

mod api_client;
mod auth_context;
mod client_ports;
mod mutation;
mod pages;
mod query_cache;
mod realtime_channel;
mod session_store;

#[cfg(test)]
mod test_support;

pub use api_client::{ApiClient, Download};
pub use auth_context::AuthContext;
pub use client_ports::{
    CredentialStore, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm,
    MultipartPart, Navigator, Notifier, RealtimeConnector, RealtimeStream, RequestBody, Route,
};
pub use mutation::{Mutation, MutationRunner};
pub use pages::{
    AgentsPage, CaseRecords, CasesPage, CommunicationsPage, CrudPage, CrudResource, DashboardPage,
    DashboardView, DocumentsPage, LawFirmRecords, LawFirmsPage, ListState, ListView, ModalState,
    PageContext, PlaintiffRecords, PlaintiffsPage, ReportsPage, ResourceView, SettingsPage,
    SettingsView, UploadFile,
};
pub use query_cache::{
    PollHandle, QueryCache, QueryPolicy, QuerySnapshot, QueryStatus, QuerySubscription,
    RetryPolicy,
};
pub use realtime_channel::{
    ChannelStatus, EventHandler, HandlerId, RealtimeChannel, ReconnectPolicy,
};
pub use session_store::SessionStore;
