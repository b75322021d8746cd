//! Fundline headless console: signs in, mounts the dashboard and logs what it
//! shows until interrupted.

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fundline_application::{
    ApiClient, AuthContext, CredentialStore, DashboardPage, DashboardView, PageContext,
    QueryCache, QueryPolicy, RealtimeChannel, SessionStore,
};
use fundline_core::{AppError, AppResult};
use fundline_domain::AuthState;
use fundline_infrastructure::{
    ConsoleNavigator, ConsoleNotifier, DEFAULT_REQUEST_TIMEOUT, FileCredentialStore,
    HttpEventStreamConnector, InMemoryCredentialStore, ReqwestHttpTransport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const GARBAGE_COLLECTION_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct ConsoleConfig {
    api_base_url: String,
    credentials_path: Option<PathBuf>,
    email: Option<String>,
    password: Option<String>,
    poll_interval_ms: u64,
    event_stream: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ConsoleConfig::load()?;
    let transport = Arc::new(ReqwestHttpTransport::new(
        config.api_base_url.as_str(),
        DEFAULT_REQUEST_TIMEOUT,
    )?);
    let credentials: Arc<dyn CredentialStore> = match &config.credentials_path {
        Some(path) => Arc::new(FileCredentialStore::new(path.clone())),
        None => Arc::new(InMemoryCredentialStore::new()),
    };
    let client = ApiClient::new(
        transport,
        AuthContext::new(),
        Arc::new(ConsoleNotifier::new()),
        credentials.clone(),
        Arc::new(ConsoleNavigator::new()),
    );
    let session = SessionStore::new(client.clone(), credentials);
    let cache = QueryCache::new(client);

    info!(
        api_base_url = %config.api_base_url,
        poll_interval_ms = config.poll_interval_ms,
        event_stream = config.event_stream,
        "fundline-console started"
    );

    sign_in(&session, &config).await?;

    let revocations = tokio::spawn({
        let session = session.clone();
        async move { session.watch_revocations().await }
    });
    let collector = cache.spawn_garbage_collector(GARBAGE_COLLECTION_PERIOD);

    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let ctx = PageContext::new(cache.clone(), session.clone());
    let mut dashboard = DashboardPage::new(ctx)
        .with_policy(QueryPolicy::dashboard().with_refetch_interval(Some(poll_interval)));
    if config.event_stream {
        let connector = Arc::new(HttpEventStreamConnector::new(
            config.api_base_url.as_str(),
            DEFAULT_REQUEST_TIMEOUT,
        )?);
        dashboard = dashboard.with_realtime(Arc::new(RealtimeChannel::new(connector, cache)));
    }
    dashboard.mount();

    let mut ticker = tokio::time::interval(poll_interval);
    let mut auth_state = session.subscribe();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                log_dashboard(&dashboard.load().await);
            }
            changed = auth_state.changed() => {
                let signed_out = changed.is_err()
                    || matches!(*auth_state.borrow(), AuthState::Unauthenticated);
                if signed_out {
                    warn!("session ended; stopping");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; stopping");
                break;
            }
        }
    }

    dashboard.unmount();
    collector.abort();
    revocations.abort();
    info!("fundline-console stopped");

    Ok(())
}

async fn sign_in(session: &SessionStore, config: &ConsoleConfig) -> AppResult<()> {
    if let AuthState::Authenticated(restored) = session.restore().await {
        info!(user = %restored.email(), "using stored session");
        return Ok(());
    }

    let (Some(email), Some(password)) = (&config.email, &config.password) else {
        return Err(AppError::Validation(
            "no stored session; FUNDLINE_EMAIL and FUNDLINE_PASSWORD are required".to_owned(),
        ));
    };

    session.login(email, password).await.map(|_| ())
}

fn log_dashboard(view: &DashboardView) {
    match &view.stats.data {
        Some(stats) => info!(
            active_cases = stats.active_cases,
            pending_documents = stats.pending_documents,
            communication_queue = stats.communication_queue,
            system_health = stats.system_health,
            stale = view.stats.is_stale,
            "dashboard stats"
        ),
        None => warn!(error = ?view.stats.error, "dashboard stats unavailable"),
    }

    if let Some(case_stats) = &view.case_stats.data {
        info!(
            total_cases = case_stats.total_cases,
            active_cases = case_stats.active_cases,
            pending_cases = case_stats.pending_cases,
            closed_cases = case_stats.closed_cases,
            "case stats"
        );
    }

    if let Some(activity) = &view.activity.data {
        info!(items = activity.len(), "recent activity");
    }

    match &view.health.data {
        Some(health) => info!(status = %health.status, "backend health"),
        None => warn!(error = ?view.health.error, "backend health unavailable"),
    }
}

impl ConsoleConfig {
    fn load() -> AppResult<Self> {
        let api_base_url = env::var("FUNDLINE_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let credentials_path = optional_env("FUNDLINE_CREDENTIALS_PATH").map(PathBuf::from);
        let email = optional_env("FUNDLINE_EMAIL");
        let password = env::var("FUNDLINE_PASSWORD")
            .ok()
            .filter(|value| !value.is_empty());
        let poll_interval_ms = parse_env_u64("FUNDLINE_POLL_INTERVAL_MS", 30_000)?;
        let event_stream = parse_env_bool("FUNDLINE_EVENT_STREAM", false)?;

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "FUNDLINE_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            credentials_path,
            email,
            password,
            poll_interval_ms,
            event_stream,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match optional_env(name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match optional_env(name).map(|value| value.to_ascii_lowercase()) {
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        },
        None => Ok(default),
    }
}
