//! Session/auth store: the only owner of the signed-in identity.

use std::sync::Arc;

use fundline_core::{AppError, AppResult};
use fundline_domain::{
    AuthState, LoginRequest, LoginResponse, Permission, REQUIRED_FIELDS_MESSAGE, Resource,
    Session,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::client_ports::{CredentialStore, HttpMethod, HttpRequest, RequestBody};


/// Owns the [`AuthState`] lifecycle and publishes it to subscribers.
#[derive(Clone)]
pub struct SessionStore {
    client: ApiClient,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<AuthState>>,
}

impl SessionStore {
    /// Creates an unauthenticated store.
    #[must_use]
    pub fn new(client: ApiClient, credentials: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            client,
            credentials,
            state: Arc::new(state),
        }
    }

    /// Resumes a stored session.
    ///
    /// With a stored token the store passes through `Loading` while `/auth/me`
    /// is checked; any failure clears the token and ends `Unauthenticated`.
    pub async fn restore(&self) -> AuthState {
        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "failed to load stored credentials");
                None
            }
        };

        let Some(token) = stored else {
            self.publish(AuthState::Unauthenticated);
            return AuthState::Unauthenticated;
        };

        self.publish(AuthState::Loading);
        self.client.auth().set(token);

        let identity = match self.client.get_json(Resource::Session.path(), Vec::new()).await {
            Ok(value) => Session::from_user_value(&value),
            Err(error) => Err(error),
        };

        match identity {
            Ok(session) => {
                info!(user = %session.email(), "session restored");
                let state = AuthState::Authenticated(session);
                self.publish(state.clone());
                state
            }
            Err(error) => {
                warn!(error = %error, "stored session rejected");
                self.discard_credentials().await;
                AuthState::Unauthenticated
            }
        }
    }

    /// Signs in. On failure the error is returned for the form and the store
    /// stays `Unauthenticated`.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(REQUIRED_FIELDS_MESSAGE.to_owned()));
        }

        self.publish(AuthState::Loading);
        match self.authenticate(email.trim(), password).await {
            Ok(session) => {
                info!(user = %session.email(), role = session.role().as_str(), "signed in");
                self.publish(AuthState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(error) => {
                self.client.auth().clear();
                self.publish(AuthState::Unauthenticated);
                Err(error)
            }
        }
    }

    /// Signs out locally. No request is made.
    pub async fn logout(&self) {
        self.discard_credentials().await;
        info!("signed out");
    }

    /// Current state. A token revoked by a 401 is reflected immediately.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.reconcile();
        self.state.borrow().clone()
    }

    /// Current identity, if signed in.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state().session().cloned()
    }

    /// Returns true when the signed-in user holds `permission`.
    #[must_use]
    pub fn can(&self, permission: &Permission) -> bool {
        self.session()
            .is_some_and(|session| session.can(permission))
    }

    /// Fails with `Forbidden` unless the signed-in user holds `permission`.
    pub fn require(&self, permission: &Permission) -> AppResult<()> {
        match self.state() {
            AuthState::Authenticated(session) if session.can(permission) => Ok(()),
            AuthState::Authenticated(_) => Err(AppError::Forbidden(format!(
                "You do not have permission to {permission}"
            ))),
            AuthState::Unauthenticated | AuthState::Loading => {
                Err(AppError::Unauthorized("Please sign in".to_owned()))
            }
        }
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Follows the shared credential and drops to `Unauthenticated` as soon as
    /// it is cleared elsewhere. Returns when the context is dropped.
    pub async fn watch_revocations(&self) {
        let mut tokens = self.client.auth().subscribe();
        while tokens.changed().await.is_ok() {
            self.reconcile();
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Session> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        })
        .map_err(|error| AppError::Internal(format!("failed to encode login: {error}")))?;

        let request = HttpRequest::new(HttpMethod::Post, "/auth/login")
            .with_body(RequestBody::Json(body));
        let response = self.client.execute_anonymous(request).await?;
        let login: LoginResponse = response
            .decode()
            .map_err(|error| self.client.report(error))?;

        self.client.auth().set(login.access_token.clone());

        let identity = if login.user.is_null() {
            self.client
                .get_json(Resource::Session.path(), Vec::new())
                .await?
        } else {
            login.user
        };
        let session =
            Session::from_user_value(&identity).map_err(|error| self.client.report(error))?;

        if let Err(error) = self.credentials.save(&login.access_token).await {
            warn!(error = %error, "failed to persist credentials");
        }

        Ok(session)
    }

    async fn discard_credentials(&self) {
        self.client.auth().clear();
        if let Err(error) = self.credentials.clear().await {
            warn!(error = %error, "failed to clear stored credentials");
        }
        self.publish(AuthState::Unauthenticated);
    }

    fn reconcile(&self) {
        let revoked = matches!(*self.state.borrow(), AuthState::Authenticated(_))
            && !self.client.auth().is_authenticated();
        if revoked {
            self.publish(AuthState::Unauthenticated);
        }
    }

    fn publish(&self, state: AuthState) {
        self.state.send_replace(state);
    }
}
