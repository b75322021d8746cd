//! Realtime event schema shared by the event stream and the invalidation layer.
//!
//! Events are JSON objects tagged by `type`. Unknown types decode to
//! [`RealtimeEvent::Unknown`] and are ignored.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notification::{Toast, ToastLevel};
use crate::records::lenient_timestamp;
use crate::resource::Resource;

/// Server to client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// Handshake acknowledgement.
    ConnectionEstablished {
        /// Server-side connection id.
        #[serde(default)]
        connection_id: Option<String>,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// One agent or the full agent list changed state.
    AgentStatusUpdate {
        /// Agent, absent for full-list broadcasts.
        #[serde(default)]
        agent_id: Option<String>,
        /// Status payload.
        #[serde(default)]
        data: Value,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Backend health snapshot.
    SystemHealthUpdate {
        /// Health payload.
        #[serde(default)]
        data: Value,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Agent task progress.
    TaskUpdate {
        /// Task id.
        #[serde(default)]
        task_id: Option<String>,
        /// Agent running the task.
        #[serde(default)]
        agent_id: Option<String>,
        /// Task status.
        #[serde(default)]
        status: Option<String>,
        /// Task payload.
        #[serde(default)]
        data: Value,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Broadcast message for the user.
    SystemNotification {
        /// Backend notification category.
        #[serde(default)]
        notification_type: Option<String>,
        /// Text.
        #[serde(default)]
        message: String,
        /// Severity wire value.
        #[serde(default)]
        level: Option<String>,
        /// Extra payload.
        #[serde(default)]
        data: Value,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// A business entity was created, updated or deleted.
    EntityChanged {
        /// Entity name such as `case` or `law_firm`.
        entity: String,
        /// Changed record.
        #[serde(default)]
        id: Option<Value>,
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Keepalive reply.
    Pong {
        /// Server time.
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    /// Agent update subscription acknowledged.
    SubscriptionConfirmed {
        /// Subscribed agents.
        #[serde(default)]
        agent_ids: Vec<String>,
    },
    /// Server-side processing error.
    Error {
        /// Error text.
        #[serde(default)]
        message: String,
    },
    /// Any event type this client does not know.
    #[serde(other)]
    Unknown,
}

/// Discriminant of [`RealtimeEvent`], used to register handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RealtimeEventKind {
    /// [`RealtimeEvent::ConnectionEstablished`].
    ConnectionEstablished,
    /// [`RealtimeEvent::AgentStatusUpdate`].
    AgentStatusUpdate,
    /// [`RealtimeEvent::SystemHealthUpdate`].
    SystemHealthUpdate,
    /// [`RealtimeEvent::TaskUpdate`].
    TaskUpdate,
    /// [`RealtimeEvent::SystemNotification`].
    SystemNotification,
    /// [`RealtimeEvent::EntityChanged`].
    EntityChanged,
    /// [`RealtimeEvent::Pong`].
    Pong,
    /// [`RealtimeEvent::SubscriptionConfirmed`].
    SubscriptionConfirmed,
    /// [`RealtimeEvent::Error`].
    Error,
    /// [`RealtimeEvent::Unknown`].
    Unknown,
}

impl RealtimeEvent {
    /// Returns the event discriminant.
    #[must_use]
    pub fn kind(&self) -> RealtimeEventKind {
        match self {
            Self::ConnectionEstablished { .. } => RealtimeEventKind::ConnectionEstablished,
            Self::AgentStatusUpdate { .. } => RealtimeEventKind::AgentStatusUpdate,
            Self::SystemHealthUpdate { .. } => RealtimeEventKind::SystemHealthUpdate,
            Self::TaskUpdate { .. } => RealtimeEventKind::TaskUpdate,
            Self::SystemNotification { .. } => RealtimeEventKind::SystemNotification,
            Self::EntityChanged { .. } => RealtimeEventKind::EntityChanged,
            Self::Pong { .. } => RealtimeEventKind::Pong,
            Self::SubscriptionConfirmed { .. } => RealtimeEventKind::SubscriptionConfirmed,
            Self::Error { .. } => RealtimeEventKind::Error,
            Self::Unknown => RealtimeEventKind::Unknown,
        }
    }

    /// Cached resources this event makes stale.
    #[must_use]
    pub fn affected_resources(&self) -> BTreeSet<Resource> {
        match self {
            Self::AgentStatusUpdate { .. } => BTreeSet::from([Resource::Agents]),
            Self::SystemHealthUpdate { .. } => BTreeSet::from([Resource::Health]),
            Self::TaskUpdate { .. } => BTreeSet::from([Resource::Agents, Resource::Activity]),
            Self::EntityChanged { entity, .. } => Resource::from_entity_name(entity)
                .map(|resource| resource.invalidation_set())
                .unwrap_or_default(),
            Self::ConnectionEstablished { .. }
            | Self::SystemNotification { .. }
            | Self::Pong { .. }
            | Self::SubscriptionConfirmed { .. }
            | Self::Error { .. }
            | Self::Unknown => BTreeSet::new(),
        }
    }

    /// Toast to show for this event, if any.
    #[must_use]
    pub fn toast(&self) -> Option<Toast> {
        match self {
            Self::SystemNotification { message, level, .. } if !message.trim().is_empty() => {
                Some(Toast {
                    level: level
                        .as_deref()
                        .map(ToastLevel::lenient)
                        .unwrap_or(ToastLevel::Info),
                    message: message.clone(),
                })
            }
            _ => None,
        }
    }
}
