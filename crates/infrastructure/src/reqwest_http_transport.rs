use std::time::{Duration, Instant};

use async_trait::async_trait;
use fundline_application::{
    HttpRequest, HttpResponse, HttpTransport, MultipartForm, MultipartPart, RequestBody,
};
use fundline_core::{AppError, AppResult};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use tracing::debug;
use url::Url;

#[cfg(test)]
mod tests;

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport over `reqwest`, rooted at the API prefix.
#[derive(Clone)]
pub struct ReqwestHttpTransport {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ReqwestHttpTransport {
    /// Creates a transport for `base_url`, such as `http://localhost:8000/api/v1`.
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Self::with_client(http_client, base_url)
    }

    /// Creates a transport over an existing client.
    pub fn with_client(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        Ok(Self {
            http_client,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// API prefix every path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Validates an API prefix and strips its trailing slash.
pub(crate) fn parse_base_url(value: &str) -> AppResult<Url> {
    let url = Url::parse(value.trim().trim_end_matches('/'))
        .map_err(|error| AppError::Validation(format!("invalid API base URL '{value}': {error}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "API base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Joins `path` onto the API prefix and appends `query`.
pub(crate) fn endpoint_url(base_url: &Url, path: &str, query: &[(String, String)]) -> AppResult<Url> {
    let joined = format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(joined.as_str())
        .map_err(|error| AppError::Validation(format!("invalid request path '{path}': {error}")))?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    Ok(url)
}

pub(crate) fn transport_error(path: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Transport(format!("request to '{path}' timed out"))
    } else {
        AppError::Transport(format!("request to '{path}' failed: {error}"))
    }
}

fn multipart_body(form: MultipartForm) -> AppResult<reqwest::multipart::Form> {
    let mut multipart = reqwest::multipart::Form::new();

    for part in form.parts {
        multipart = match part {
            MultipartPart::Text { name, value } => multipart.text(name, value),
            MultipartPart::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                let mut file = reqwest::multipart::Part::bytes(bytes).file_name(filename);
                if let Some(content_type) = content_type {
                    file = file.mime_str(content_type.as_str()).map_err(|error| {
                        AppError::Validation(format!(
                            "invalid content type '{content_type}': {error}"
                        ))
                    })?;
                }
                multipart.part(name, file)
            }
        };
    }

    Ok(multipart)
}

fn header_text(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Extracts the file name from a `Content-Disposition` header value.
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|parameter| {
        let (name, raw) = parameter.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let filename = raw.trim().trim_matches('"');
        (!filename.is_empty()).then(|| filename.to_owned())
    })
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let url = endpoint_url(&self.base_url, request.path.as_str(), &request.query)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|error| AppError::Internal(format!("invalid HTTP method: {error}")))?;
        let request_id = uuid::Uuid::new_v4();

        let mut builder = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header("X-Request-Id", request_id.to_string());

        if let Some(bearer) = &request.bearer {
            builder = builder.header(AUTHORIZATION, bearer.header_value());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(multipart_body(form)?),
        };

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(request.path.as_str(), &error))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|error| transport_error(request.path.as_str(), &error))?;

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            %request_id,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "backend request completed"
        );

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
            content_type: header_text(&headers, CONTENT_TYPE),
            filename: header_text(&headers, CONTENT_DISPOSITION)
                .as_deref()
                .and_then(disposition_filename),
        })
    }
}
