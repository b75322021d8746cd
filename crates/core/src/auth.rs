use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Opaque bearer credential issued by the backend login endpoint.
///
/// The raw value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BearerToken(String);

impl BearerToken {
    /// Creates a bearer token from the raw credential string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Unauthorized(
                "bearer token must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Unauthorized(
                "bearer token must not contain whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the raw credential.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl TryFrom<String> for BearerToken {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BearerToken> for String {
    fn from(value: BearerToken) -> Self {
        value.0
    }
}

impl Debug for BearerToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BearerToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::BearerToken;

    #[test]
    fn debug_output_redacts_token() {
        let token = BearerToken::new("test-token-12345");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("test-token-12345"));
    }

    #[test]
    fn header_value_uses_bearer_scheme() {
        let token = BearerToken::new(" abc ").map(|token| token.header_value());
        assert_eq!(token.ok().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn rejects_blank_token() {
        assert!(BearerToken::new("  ").is_err());
    }
}
