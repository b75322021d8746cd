//! Shared primitives for all Rust crates in Fundline.

#![forbid(unsafe_code)]

/// Authentication primitives shared across crates.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::BearerToken;

/// Result type used across Fundline crates.
pub type AppResult<T> = Result<T, AppError>;

/// Toast text shown for server faults and transport failures.
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// Toast text shown for client errors that carry no server message.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed. Please check your input and try again.";

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Cloneable so one failed request can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid input, rejected either locally or by the backend (4xx).
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Session missing, expired, or rejected by the backend.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the required permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Backend answered with a 5xx status.
    #[error("server error: {0}")]
    Server(String),

    /// Request never produced a response (connect failure, timeout, broken body).
    #[error("transport error: {0}")]
    Transport(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true for failures that end the current session.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns the single user-facing message for this failure.
    ///
    /// Server faults and transport failures share one generic message;
    /// client errors surface the backend message when one was provided.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server(_) | Self::Transport(_) | Self::Internal(_) => {
                SERVER_ERROR_MESSAGE.to_owned()
            }
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Forbidden(message)
            | Self::Unauthorized(message) => {
                if message.trim().is_empty() {
                    REQUEST_FAILED_MESSAGE.to_owned()
                } else {
                    message.clone()
                }
            }
        }
    }
}
