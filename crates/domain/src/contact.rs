//! Contact value objects shared by party and messaging forms.

use fundline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated, lowercased email address.
    ///
    /// Structural check only: one `@`, non-empty local part, dotted domain.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "Please enter a valid email address.".to_owned(),
            ));
        };

        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(AppError::Validation(
                "Please enter a valid email address.".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Phone number kept as entered, validated by digit count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accepts 7 to 15 digits with optional `+`, spaces, dashes, dots and parentheses.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = 0_usize;
        for character in body.chars() {
            match character {
                '0'..='9' => digits += 1,
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => {
                    return Err(AppError::Validation(
                        "Please enter a valid phone number.".to_owned(),
                    ));
                }
            }
        }

        if !(7..=15).contains(&digits) {
            return Err(AppError::Validation(
                "Please enter a valid phone number.".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailAddress, PhoneNumber};

    #[test]
    fn email_is_lowercased_and_trimmed() {
        let email = EmailAddress::new("  Admin@Example.com ");
        assert_eq!(
            email.map(String::from).ok().as_deref(),
            Some("admin@example.com")
        );
    }

    #[test]
    fn email_requires_dotted_domain() {
        assert!(EmailAddress::new("admin@localhost").is_err());
        assert!(EmailAddress::new("@example.com").is_err());
        assert!(EmailAddress::new("a@b@example.com").is_err());
    }

    #[test]
    fn phone_accepts_common_formats() {
        assert!(PhoneNumber::new("+1-555-0123").is_ok());
        assert!(PhoneNumber::new("(555) 010 2000").is_ok());
        assert!(PhoneNumber::new("555").is_err());
        assert!(PhoneNumber::new("555-CALL-NOW").is_err());
    }
}
