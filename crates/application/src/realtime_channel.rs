//! Realtime subscription channel.
//!
//! A background task keeps one connection open, dispatches each event to the
//! registered handlers, turns it into targeted cache invalidations and shows
//! system notifications as toasts. When the stream ends or fails the task
//! reconnects with exponential backoff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fundline_domain::{RealtimeEvent, RealtimeEventKind};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client_ports::RealtimeConnector;
use crate::query_cache::QueryCache;


/// Callback registered for one event kind.
pub type EventHandler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Registration handle returned by [`RealtimeChannel::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Exponential reconnect delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `failures` (zero-based).
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2_u32.saturating_pow(failures.min(16));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not running.
    Disconnected,
    /// Opening a connection.
    Connecting,
    /// Receiving events.
    Connected,
    /// Waiting before the next attempt.
    Reconnecting {
        /// Consecutive failures so far.
        failures: u32,
        /// Wait before the next attempt.
        delay: Duration,
    },
}

type HandlerMap = HashMap<RealtimeEventKind, Vec<(HandlerId, EventHandler)>>;

struct ChannelShared {
    connector: Arc<dyn RealtimeConnector>,
    cache: QueryCache,
    handlers: Mutex<HandlerMap>,
    next_handler: AtomicU64,
    status: watch::Sender<ChannelStatus>,
    reconnect: ReconnectPolicy,
}

impl ChannelShared {
    fn handlers(&self) -> MutexGuard<'_, HandlerMap> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: &RealtimeEvent) {
        let kind = event.kind();
        debug!(?kind, "realtime event received");

        let handlers: Vec<EventHandler> = self
            .handlers()
            .get(&kind)
            .map(|handlers| handlers.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(event);
        }

        let affected = event.affected_resources();
        if !affected.is_empty() {
            self.cache.invalidate_resources(&affected);
        }

        if let Some(toast) = event.toast() {
            self.cache.client().notifier().notify(toast);
        }
    }

    async fn run(self: Arc<Self>) {
        let mut failures = 0_u32;

        loop {
            self.status.send_replace(ChannelStatus::Connecting);
            let bearer = self.cache.client().auth().token();

            match self.connector.connect(bearer).await {
                Ok(mut stream) => {
                    failures = 0;
                    self.status.send_replace(ChannelStatus::Connected);
                    info!("realtime channel connected");

                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(event) => self.dispatch(&event),
                            Err(error) => {
                                warn!(error = %error, "realtime stream failed");
                                break;
                            }
                        }
                    }
                    info!("realtime stream closed");
                }
                Err(error) if error.is_unauthorized() => {
                    warn!(error = %error, "realtime connection rejected, giving up");
                    self.status.send_replace(ChannelStatus::Disconnected);
                    return;
                }
                Err(error) => {
                    warn!(error = %error, failures, "realtime connection failed");
                }
            }

            let delay = self.reconnect.delay(failures);
            failures = failures.saturating_add(1);
            self.status
                .send_replace(ChannelStatus::Reconnecting { failures, delay });
            tokio::time::sleep(delay).await;
        }
    }
}

/// Realtime channel with `connect`, `on_event` and `disconnect`.
pub struct RealtimeChannel {
    shared: Arc<ChannelShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    /// Creates a disconnected channel with the default reconnect policy.
    #[must_use]
    pub fn new(connector: Arc<dyn RealtimeConnector>, cache: QueryCache) -> Self {
        Self::with_reconnect_policy(connector, cache, ReconnectPolicy::default())
    }

    /// Creates a disconnected channel.
    #[must_use]
    pub fn with_reconnect_policy(
        connector: Arc<dyn RealtimeConnector>,
        cache: QueryCache,
        reconnect: ReconnectPolicy,
    ) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            shared: Arc::new(ChannelShared {
                connector,
                cache,
                handlers: Mutex::new(HashMap::new()),
                next_handler: AtomicU64::new(1),
                status,
                reconnect,
            }),
            task: Mutex::new(None),
        }
    }

    /// Starts the background connection. Does nothing when already running.
    pub fn connect(&self) {
        let mut task = self.task();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        *task = Some(tokio::spawn(self.shared.clone().run()));
    }

    /// Registers `handler` for events of `kind`.
    pub fn on_event(
        &self,
        kind: RealtimeEventKind,
        handler: impl Fn(&RealtimeEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.shared.next_handler.fetch_add(1, Ordering::Relaxed));
        self.shared
            .handlers()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns true when it was registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.shared.handlers();
        let mut removed = false;
        for registered in handlers.values_mut() {
            let before = registered.len();
            registered.retain(|(handler_id, _)| *handler_id != id);
            removed |= registered.len() != before;
        }
        removed
    }

    /// Stops the connection and any pending reconnect.
    pub fn disconnect(&self) {
        if let Some(task) = self.task().take() {
            task.abort();
            info!("realtime channel disconnected");
        }
        self.shared
            .status
            .send_replace(ChannelStatus::Disconnected);
    }

    /// Current connection state.
    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        *self.shared.status.borrow()
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.shared.status.subscribe()
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task().take() {
            task.abort();
        }
    }
}
