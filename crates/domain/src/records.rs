//! Backend records, passed through with lenient decoding.
//!
//! Fields the client does not model are kept in `extra` so nothing the
//! backend sends is lost on the way to the caller.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDateTime, Utc};
use fundline_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Record identifier; the backend uses both integer and string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier.
    Int(i64),
    /// Opaque string identifier.
    Text(String),
}

impl Default for RecordId {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl Display for RecordId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Text(value) => formatter.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        value
            .parse::<i64>()
            .map_or_else(|_| Self::Text(value.to_owned()), Self::Int)
    }
}

/// Decodes an optional timestamp, accepting RFC 3339 and naive ISO 8601 values.
///
/// Unparseable values decode to `None` instead of failing the whole record.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

/// Parses one backend timestamp.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Total rows across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Page size the backend used.
    pub per_page: u32,
}

impl<T> Page<T>
where
    T: DeserializeOwned,
{
    /// Decodes either a bare JSON array or an envelope
    /// `{ "<collection>": [...], "total": n, "page": p, "per_page": s }`.
    pub fn from_value(value: &Value, collection: &str) -> AppResult<Self> {
        let (items_value, envelope) = match value {
            Value::Array(_) => (value.clone(), None),
            Value::Object(object) => {
                let items = object
                    .get(collection)
                    .or_else(|| object.get("items"))
                    .or_else(|| object.get("data"))
                    .cloned()
                    .unwrap_or(Value::Array(Vec::new()));
                (items, Some(object))
            }
            other => {
                return Err(AppError::Internal(format!(
                    "expected list payload for '{collection}', got {other}"
                )));
            }
        };

        let items: Vec<T> = serde_json::from_value(items_value).map_err(|error| {
            AppError::Internal(format!("failed to decode '{collection}' items: {error}"))
        })?;
        let count = u64::try_from(items.len()).unwrap_or(u64::MAX);

        let read_u64 = |field: &str| {
            envelope
                .and_then(|object| object.get(field))
                .and_then(Value::as_u64)
        };

        Ok(Self {
            total: read_u64("total").unwrap_or(count),
            page: read_u64("page")
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(1),
            per_page: read_u64("per_page")
                .or_else(|| read_u64("limit"))
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or_else(|| u32::try_from(count).unwrap_or(u32::MAX)),
            items,
        })
    }
}

/// Decodes a single record payload, optionally wrapped under `field`.
pub fn decode_record<T>(value: &Value, field: &str) -> AppResult<T>
where
    T: DeserializeOwned,
{
    let inner = value
        .as_object()
        .and_then(|object| object.get(field))
        .unwrap_or(value);

    serde_json::from_value(inner.clone())
        .map_err(|error| AppError::Internal(format!("failed to decode '{field}' payload: {error}")))
}

/// Funding case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Case {
    /// Identifier.
    pub id: RecordId,
    /// Human-readable case number.
    pub case_number: Option<String>,
    /// Short title.
    pub title: Option<String>,
    /// Owning plaintiff.
    pub plaintiff_id: Option<RecordId>,
    /// Denormalised plaintiff name.
    pub plaintiff_name: Option<String>,
    /// Representing law firm.
    pub law_firm_id: Option<RecordId>,
    /// Denormalised law firm name.
    pub law_firm_name: Option<String>,
    /// Pipeline status wire value.
    pub status: Option<String>,
    /// Case type wire value.
    pub case_type: Option<String>,
    /// Priority wire value.
    pub priority: Option<String>,
    /// Funding amount requested.
    pub funding_amount_requested: Option<f64>,
    /// Estimated case value.
    pub estimated_case_value: Option<f64>,
    /// Risk score 0-100.
    pub risk_score: Option<f64>,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Plaintiff seeking funding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plaintiff {
    /// Identifier.
    pub id: RecordId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Status wire value.
    pub status: Option<String>,
    /// Number of linked cases.
    pub cases_count: u32,
    /// Creation time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Plaintiff {
    /// Returns "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Law firm representing plaintiffs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LawFirm {
    /// Identifier.
    pub id: RecordId,
    /// Firm name.
    pub name: String,
    /// Primary contact.
    pub contact_person: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Status wire value.
    pub status: Option<String>,
    /// Number of linked cases.
    pub cases_count: u32,
    /// Historical success rate in percent.
    pub success_rate: Option<f64>,
    /// Creation time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Uploaded document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Identifier.
    pub id: RecordId,
    /// Original file name.
    #[serde(alias = "original_filename")]
    pub filename: String,
    /// Document type wire value.
    pub document_type: Option<String>,
    /// Processing status wire value.
    pub status: Option<String>,
    /// Linked case.
    pub case_id: Option<RecordId>,
    /// Size in bytes.
    pub file_size: Option<u64>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Upload time.
    #[serde(deserialize_with = "lenient_timestamp", alias = "created_at")]
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Email, SMS or call log entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Communication {
    /// Identifier.
    pub id: RecordId,
    /// Channel wire value.
    #[serde(rename = "type", alias = "channel")]
    pub channel: Option<String>,
    /// Direction wire value.
    pub direction: Option<String>,
    /// Delivery status wire value.
    pub status: Option<String>,
    /// Email subject.
    pub subject: Option<String>,
    /// Message body.
    pub content: Option<String>,
    /// Recipient address or number.
    pub recipient: Option<String>,
    /// Linked case.
    pub case_id: Option<RecordId>,
    /// Send time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored email or SMS template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplate {
    /// Identifier.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Channel wire value, when the backend scopes the template.
    #[serde(alias = "type")]
    pub channel: Option<String>,
    /// Email subject template.
    pub subject: Option<String>,
    /// Body template with `{{ placeholder }}` markers.
    #[serde(alias = "message")]
    pub content: String,
}

/// Agent as reported by `/agents/status`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStatus {
    /// Identifier.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Agent type key.
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
    /// Run state (`active`, `idle`, `stopped`, ...).
    pub status: String,
    /// Completed task count.
    pub tasks_completed: u64,
    /// Success rate in percent.
    pub success_rate: Option<f64>,
    /// Human-readable last activity.
    pub last_activity: Option<String>,
    /// Agent configuration.
    pub config: Value,
}

impl AgentStatus {
    /// Returns true when the agent is processing or ready to process work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.status.as_str(), "active" | "running" | "busy")
    }
}

/// Dashboard headline counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    /// Open cases.
    pub active_cases: i64,
    /// Change in open cases.
    pub cases_change: i64,
    /// Documents awaiting processing.
    pub pending_documents: i64,
    /// Change in pending documents.
    pub documents_change: i64,
    /// Queued outbound messages.
    pub communication_queue: i64,
    /// Change in queued messages.
    pub queue_change: i64,
    /// Health score in percent.
    pub system_health: i64,
    /// Change in health score.
    pub health_change: i64,
}

/// Counters for the cases screen header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseDashboardStats {
    /// All cases.
    pub total_cases: i64,
    /// Open cases.
    pub active_cases: i64,
    /// Cases awaiting review.
    pub pending_cases: i64,
    /// Closed cases.
    pub closed_cases: i64,
    /// Cases opened this month.
    pub cases_this_month: i64,
    /// Month-over-month change.
    pub cases_change: i64,
    /// Average case value.
    pub avg_case_value: f64,
    /// Success rate in percent.
    pub success_rate: f64,
}

/// One entry of the recent activity feed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityItem {
    /// Identifier.
    pub id: RecordId,
    /// Activity kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Display message.
    pub message: String,
    /// Event time.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Actor name.
    pub user: Option<String>,
}

/// Backend health probe response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    /// `healthy` when all dependencies respond.
    pub status: String,
    /// Backend version.
    pub version: Option<String>,
    /// Deployment environment.
    pub environment: Option<String>,
}

impl HealthStatus {
    /// Returns true when the backend reports itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Reports analytics overview.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsReport {
    /// Headline figures.
    pub overview: AnalyticsOverview,
    /// Time series points.
    pub trends: Vec<Value>,
}

/// Headline figures of the analytics report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOverview {
    /// All cases.
    pub total_cases: i64,
    /// Resolved cases.
    pub resolved_cases: i64,
    /// Unresolved cases.
    pub pending_cases: i64,
    /// Success rate in percent.
    pub success_rate: f64,
}

/// Agent efficiency report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMetricsReport {
    /// Per-agent figures.
    pub agents: Vec<AgentMetric>,
}

/// Efficiency figures for one agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMetric {
    /// Agent display name.
    pub name: String,
    /// Efficiency in percent.
    pub efficiency: f64,
    /// Uptime in percent.
    pub uptime: f64,
}

/// Generic acknowledgement returned by settings and agent mutations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationAck {
    /// Whether the backend applied the change.
    pub success: Option<bool>,
    /// Backend message.
    pub message: Option<String>,
    /// Extra response data.
    pub data: Value,
}
