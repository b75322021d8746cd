//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod choices;
mod contact;
mod filters;
mod forms;
mod notification;
mod query_key;
mod realtime;
mod records;
mod resource;
mod session;
mod settings;
mod templates;
mod wire_enum;

pub use choices::{
    AgentCommand, CaseStatus, CaseType, Channel, CommunicationStatus, Direction, DocumentStatus,
    DocumentType, ExportFormat, PartyStatus, Priority, ReportPeriod, parse_choice,
};
pub use contact::{EmailAddress, PhoneNumber};
pub use filters::{
    CaseFilter, CommunicationFilter, DEFAULT_PAGE_SIZE, DocumentFilter, ListQuery, MAX_PAGE_SIZE,
    Pagination, PartyFilter, QueryParams, ReportFilter, normalize_search,
};
pub use forms::{
    CaseForm, CasePayload, LawFirmForm, LawFirmPayload, MessageForm, OutboundMessage,
    PlaintiffForm, PlaintiffPayload, REQUIRED_FIELDS_MESSAGE,
};
pub use notification::{Toast, ToastLevel};
pub use query_key::QueryKey;
pub use realtime::{RealtimeEvent, RealtimeEventKind};
pub use records::{
    ActivityItem, AgentMetric, AgentMetricsReport, AgentStatus, AnalyticsOverview,
    AnalyticsReport, Case, CaseDashboardStats, Communication, DashboardStats, Document,
    HealthStatus, LawFirm, MessageTemplate, MutationAck, Page, Plaintiff, RecordId,
    decode_record, lenient_timestamp, parse_timestamp,
};
pub use resource::Resource;
pub use session::{
    AuthState, LoginRequest, LoginResponse, Permission, PermissionAction, Role, Session,
};
pub use settings::{
    AgentSetting, AgentSettingUpdate, Setting, SettingDataType, SettingUpdate, SettingsCategory,
    ValidationRules, default_settings_categories,
};
pub use templates::{RenderedMessage, SMS_MAX_SEGMENTS, SMS_SEGMENT_LENGTH, SmsBody, sms_segments};
