use fundline_core::AppError;
use serde_json::Value;

use crate::client_ports::HttpResponse;

/// Maps a non-2xx response onto the error taxonomy.
pub(crate) fn error_from_response(response: &HttpResponse) -> AppError {
    let message = server_message(response).unwrap_or_default();

    match response.status {
        401 => AppError::Unauthorized(message),
        403 => AppError::Forbidden(message),
        404 => AppError::NotFound(message),
        409 => AppError::Conflict(message),
        500..=599 => AppError::Server(if message.is_empty() {
            format!("status {}", response.status)
        } else {
            message
        }),
        _ => AppError::Validation(message),
    }
}

/// Extracts the backend's message from `detail`, `message` or `error`.
///
/// FastAPI validation failures carry `detail` as a list of `{ msg }` objects;
/// their messages are joined.
fn server_message(response: &HttpResponse) -> Option<String> {
    let body = response.json_value().ok()?;
    let object = body.as_object()?;

    ["detail", "message", "error"]
        .iter()
        .filter_map(|field| object.get(*field))
        .find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Object(object) => object
                    .get("msg")
                    .or_else(|| object.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(object) => object
            .get("message")
            .or_else(|| object.get("msg"))
            .and_then(Value::as_str)?
            .trim()
            .to_owned(),
        _ => return None,
    };

    (!text.is_empty()).then_some(text)
}
