//! Hand-written fakes shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fundline_core::{AppError, AppResult, BearerToken};
use fundline_domain::{RealtimeEvent, Toast};
use serde_json::{Value, json};

use crate::api_client::ApiClient;
use crate::auth_context::AuthContext;
use crate::client_ports::{
    CredentialStore, HttpMethod, HttpRequest, HttpResponse, HttpTransport, Navigator, Notifier,
    RealtimeConnector, RealtimeStream, Route,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
enum Scripted {
    Respond {
        delay: Option<Duration>,
        response: HttpResponse,
    },
    Fail(AppError),
}

/// Scripted transport keyed by method and path.
///
/// Each route holds a queue; the last queued reply repeats. Unknown routes
/// answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub(crate) fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Scripted::Respond {
                delay: None,
                response: HttpResponse::json(status, &body),
            },
        );
    }

    pub(crate) fn respond_after(
        &self,
        method: HttpMethod,
        path: &str,
        delay: Duration,
        status: u16,
        body: Value,
    ) {
        self.push(
            method,
            path,
            Scripted::Respond {
                delay: Some(delay),
                response: HttpResponse::json(status, &body),
            },
        );
    }

    pub(crate) fn respond_raw(&self, method: HttpMethod, path: &str, response: HttpResponse) {
        self.push(
            method,
            path,
            Scripted::Respond {
                delay: None,
                response,
            },
        );
    }

    pub(crate) fn fail(&self, method: HttpMethod, path: &str, error: AppError) {
        self.push(method, path, Scripted::Fail(error));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub(crate) fn count(&self, method: HttpMethod, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Scripted) {
        lock(&self.routes)
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, method: HttpMethod, path: &str) -> Option<Scripted> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(&(method, path.to_owned()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let reply = self.next_reply(request.method, request.path.as_str());
        lock(&self.requests).push(request);

        match reply {
            Some(Scripted::Respond { delay, response }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(HttpResponse::json(404, &json!({"detail": "Not Found"}))),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub(crate) fn toasts(&self) -> Vec<Toast> {
        lock(&self.toasts).clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.toasts()
            .into_iter()
            .map(|toast| toast.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        lock(&self.toasts).push(toast);
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        lock(&self.routes).push(route);
    }
}

#[derive(Default)]
pub(crate) struct FakeCredentialStore {
    token: Mutex<Option<BearerToken>>,
}

impl FakeCredentialStore {
    pub(crate) fn with_token(value: &str) -> Self {
        Self {
            token: Mutex::new(Some(token(value))),
        }
    }

    pub(crate) fn stored(&self) -> Option<BearerToken> {
        lock(&self.token).clone()
    }
}

#[async_trait]
impl CredentialStore for FakeCredentialStore {
    async fn load(&self) -> AppResult<Option<BearerToken>> {
        Ok(lock(&self.token).clone())
    }

    async fn save(&self, token: &BearerToken) -> AppResult<()> {
        *lock(&self.token) = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *lock(&self.token) = None;
        Ok(())
    }
}

/// Connector that hands out pre-scripted connections in order; once they run
/// out every attempt fails.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    connections: Mutex<VecDeque<AppResult<Vec<RealtimeEvent>>>>,
    attempts: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedConnector {
    pub(crate) fn push_connection(&self, events: Vec<RealtimeEvent>) {
        lock(&self.connections).push_back(Ok(events));
    }

    pub(crate) fn push_failure(&self, error: AppError) {
        lock(&self.connections).push_back(Err(error));
    }

    pub(crate) fn attempts(&self) -> Vec<tokio::time::Instant> {
        lock(&self.attempts).clone()
    }
}

#[async_trait]
impl RealtimeConnector for ScriptedConnector {
    async fn connect(&self, _bearer: Option<BearerToken>) -> AppResult<RealtimeStream> {
        lock(&self.attempts).push(tokio::time::Instant::now());
        let next = lock(&self.connections).pop_front();

        match next {
            Some(Ok(events)) => Ok(Box::pin(futures::stream::iter(
                events.into_iter().map(Ok),
            ))),
            Some(Err(error)) => Err(error),
            None => Err(AppError::Transport("connection refused".to_owned())),
        }
    }
}

pub(crate) fn token(value: &str) -> BearerToken {
    BearerToken::new(value).unwrap_or_else(|_| unreachable!())
}

/// Fully wired client over fakes.
pub(crate) struct Harness {
    pub(crate) transport: Arc<FakeTransport>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) navigator: Arc<RecordingNavigator>,
    pub(crate) credentials: Arc<FakeCredentialStore>,
    pub(crate) auth: AuthContext,
    pub(crate) client: ApiClient,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_credentials(FakeCredentialStore::default())
    }

    pub(crate) fn signed_in() -> Self {
        let harness = Self::with_credentials(FakeCredentialStore::with_token("stored-token"));
        harness.auth.set(token("stored-token"));
        harness
    }

    pub(crate) fn with_credentials(credentials: FakeCredentialStore) -> Self {
        let transport = Arc::new(FakeTransport::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let credentials = Arc::new(credentials);
        let auth = AuthContext::new();
        let client = ApiClient::new(
            transport.clone(),
            auth.clone(),
            notifier.clone(),
            credentials.clone(),
            navigator.clone(),
        );

        Self {
            transport,
            notifier,
            navigator,
            credentials,
            auth,
            client,
        }
    }
}
