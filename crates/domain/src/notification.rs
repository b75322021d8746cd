//! User-facing toast notifications.

use fundline_core::AppError;

use crate::wire_enum::wire_enum;

wire_enum! {
    /// Severity of a toast.
    pub enum ToastLevel {
        /// Completed action.
        Success => "success",
        /// Neutral information.
        Info => "info",
        /// Something needs attention.
        Warning => "warning",
        /// Failed action.
        Error => "error",
    }
}

impl ToastLevel {
    /// Parses a backend level leniently; unknown levels are informational.
    #[must_use]
    pub fn lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "warning" | "warn" => Self::Warning,
            "error" | "critical" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Text.
    pub message: String,
}

impl Toast {
    /// Success toast.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    /// Informational toast.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    /// Error toast.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&AppError> for Toast {
    fn from(error: &AppError) -> Self {
        Self::error(error.user_message())
    }
}
