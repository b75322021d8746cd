//! Single point of request egress.
//!
//! Attaches the bearer credential, maps response statuses onto [`AppError`],
//! and turns every failure into exactly one toast. A 401 on an authenticated
//! call ends the session instead: credentials are cleared, the shell is sent
//! to the login screen, and no toast is shown. There is no retry here; the
//! query cache retries through a quiet path and reports only the failure it
//! gives up on.

use std::sync::Arc;

use fundline_core::{AppError, AppResult};
use fundline_domain::{QueryKey, Toast};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth_context::AuthContext;
use crate::client_ports::{
    CredentialStore, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm,
    Navigator, Notifier, RequestBody, Route,
};

mod errors;


use errors::error_from_response;

/// Binary download with its advertised file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File contents.
    pub bytes: Vec<u8>,
    /// File name from `Content-Disposition`.
    pub filename: Option<String>,
    /// MIME type.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reporting {
    Toast,
    Quiet,
}

/// Configured API client shared by every service.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    auth: AuthContext,
    notifier: Arc<dyn Notifier>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Creates a client over the given ports.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        auth: AuthContext,
        notifier: Arc<dyn Notifier>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            auth,
            notifier,
            credentials,
            navigator,
        }
    }

    /// Returns the shared credential context.
    #[must_use]
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Returns the toast port, for services that confirm successful actions.
    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Sends a request with the current bearer token.
    pub async fn execute(&self, mut request: HttpRequest) -> AppResult<HttpResponse> {
        request.bearer = self.auth.token();
        self.dispatch(request, true, Reporting::Toast).await
    }

    /// Sends a request without credentials. A 401 is reported like any other
    /// client error and does not end the session.
    pub async fn execute_anonymous(&self, mut request: HttpRequest) -> AppResult<HttpResponse> {
        request.bearer = None;
        self.dispatch(request, false, Reporting::Toast).await
    }

    /// `GET` returning JSON.
    pub async fn get_json(&self, path: &str, query: Vec<(String, String)>) -> AppResult<Value> {
        let request = HttpRequest::new(HttpMethod::Get, path).with_query(query);
        let response = self.execute(request).await?;
        self.decode_json(&response)
    }

    /// `GET` for a cache key that leaves failures unreported. A 401 still
    /// ends the session.
    pub(crate) async fn get_key_quietly(&self, key: &QueryKey) -> AppResult<Value> {
        let mut request =
            HttpRequest::new(HttpMethod::Get, key.path()).with_query(key.params().to_vec());
        request.bearer = self.auth.token();
        let response = self.dispatch(request, true, Reporting::Quiet).await?;
        response.json_value()
    }

    /// `POST` with a JSON body.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> AppResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = self.encode(body)?;
        self.send_json(HttpMethod::Post, path, RequestBody::Json(body))
            .await
    }

    /// `POST` without a body, used for actions such as agent start and stop.
    pub async fn post_empty(&self, path: &str) -> AppResult<Value> {
        self.send_json(HttpMethod::Post, path, RequestBody::Empty)
            .await
    }

    /// `PUT` with a JSON body.
    pub async fn put_json<B>(&self, path: &str, body: &B) -> AppResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = self.encode(body)?;
        self.send_json(HttpMethod::Put, path, RequestBody::Json(body))
            .await
    }

    /// `DELETE`.
    pub async fn delete(&self, path: &str) -> AppResult<Value> {
        self.send_json(HttpMethod::Delete, path, RequestBody::Empty)
            .await
    }

    /// Multipart `POST`.
    pub async fn upload(&self, path: &str, form: MultipartForm) -> AppResult<Value> {
        self.send_json(HttpMethod::Post, path, RequestBody::Multipart(form))
            .await
    }

    /// `GET` returning raw bytes.
    pub async fn download(&self, path: &str, query: Vec<(String, String)>) -> AppResult<Download> {
        let request = HttpRequest::new(HttpMethod::Get, path).with_query(query);
        let response = self.execute(request).await?;

        Ok(Download {
            bytes: response.body,
            filename: response.filename,
            content_type: response.content_type,
        })
    }

    /// Reports a failure that happened outside a request, such as a decode error.
    pub(crate) fn report(&self, error: AppError) -> AppError {
        self.notifier.notify(Toast::from(&error));
        error
    }

    fn surface(&self, error: AppError, reporting: Reporting) -> AppError {
        match reporting {
            Reporting::Toast => self.report(error),
            Reporting::Quiet => error,
        }
    }

    async fn send_json(&self, method: HttpMethod, path: &str, body: RequestBody) -> AppResult<Value> {
        let request = HttpRequest::new(method, path).with_body(body);
        let response = self.execute(request).await?;
        self.decode_json(&response)
    }

    fn encode<B>(&self, body: &B) -> AppResult<Value>
    where
        B: Serialize + ?Sized,
    {
        serde_json::to_value(body).map_err(|error| {
            self.report(AppError::Internal(format!(
                "failed to encode request body: {error}"
            )))
        })
    }

    fn decode_json(&self, response: &HttpResponse) -> AppResult<Value> {
        response.json_value().map_err(|error| self.report(error))
    }

    async fn dispatch(
        &self,
        request: HttpRequest,
        session_bound: bool,
        reporting: Reporting,
    ) -> AppResult<HttpResponse> {
        let method = request.method;
        let path = request.path.clone();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%method, %path, error = %error, "api request failed without a response");
                return Err(self.surface(error, reporting));
            }
        };

        debug!(%method, %path, status = response.status, "api request completed");

        if response.is_success() {
            return Ok(response);
        }

        let error = error_from_response(&response);
        if session_bound && error.is_unauthorized() {
            self.end_session().await;
            return Err(error);
        }

        warn!(%method, %path, status = response.status, error = %error, "api request rejected");
        Err(self.surface(error, reporting))
    }

    async fn end_session(&self) {
        let had_token = self.auth.clear();
        if let Err(error) = self.credentials.clear().await {
            warn!(error = %error, "failed to clear stored credentials after 401");
        }

        warn!(had_token, "session rejected by backend, returning to login");
        self.navigator.navigate(Route::Login);
    }
}
