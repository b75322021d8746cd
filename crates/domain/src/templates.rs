//! Template placeholder rendering and SMS length accounting.

use std::collections::{BTreeMap, BTreeSet};

use fundline_core::{AppError, AppResult};
use regex::{Captures, Regex};

use crate::records::MessageTemplate;

/// Characters per SMS segment.
pub const SMS_SEGMENT_LENGTH: usize = 160;

/// Longest message the providers accept, in segments.
pub const SMS_MAX_SEGMENTS: usize = 3;

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";

/// Template output ready to be placed into a compose form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Rendered subject, for email templates.
    pub subject: Option<String>,
    /// Rendered body.
    pub body: String,
}

fn placeholder_regex() -> AppResult<Regex> {
    Regex::new(PLACEHOLDER_PATTERN)
        .map_err(|error| AppError::Internal(format!("invalid placeholder pattern: {error}")))
}

fn render_text(
    regex: &Regex,
    text: &str,
    values: &BTreeMap<String, String>,
    missing: &mut BTreeSet<String>,
) -> String {
    regex
        .replace_all(text, |captures: &Captures<'_>| {
            let name = &captures[1];
            match values.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.insert(name.to_owned());
                    String::new()
                }
            }
        })
        .into_owned()
}

impl MessageTemplate {
    /// Returns the distinct placeholder names used by subject and body.
    pub fn placeholders(&self) -> AppResult<BTreeSet<String>> {
        let regex = placeholder_regex()?;
        let subject = self.subject.as_deref().unwrap_or_default();

        Ok(regex
            .captures_iter(subject)
            .chain(regex.captures_iter(self.content.as_str()))
            .map(|captures| captures[1].to_owned())
            .collect())
    }

    /// Substitutes every `{{ name }}` placeholder.
    ///
    /// Fails listing all placeholders that have no value.
    pub fn render(&self, values: &BTreeMap<String, String>) -> AppResult<RenderedMessage> {
        let regex = placeholder_regex()?;
        let mut missing = BTreeSet::new();

        let subject = self
            .subject
            .as_deref()
            .map(|subject| render_text(&regex, subject, values, &mut missing));
        let body = render_text(&regex, self.content.as_str(), values, &mut missing);

        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(String::as_str).collect();
            return Err(AppError::Validation(format!(
                "missing template values: {}",
                names.join(", ")
            )));
        }

        Ok(RenderedMessage { subject, body })
    }
}

/// Number of SMS segments needed for `body`.
#[must_use]
pub fn sms_segments(body: &str) -> usize {
    body.chars().count().div_ceil(SMS_SEGMENT_LENGTH).max(1)
}

/// Validated SMS text within the provider segment limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsBody(String);

impl SmsBody {
    /// Creates an SMS body of at most [`SMS_MAX_SEGMENTS`] segments.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("SMS text must not be empty".to_owned()));
        }

        let segments = sms_segments(trimmed);
        if segments > SMS_MAX_SEGMENTS {
            return Err(AppError::Validation(format!(
                "SMS text needs {segments} segments; the limit is {SMS_MAX_SEGMENTS}"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the number of segments the text occupies.
    #[must_use]
    pub fn segments(&self) -> usize {
        sms_segments(self.0.as_str())
    }
}
