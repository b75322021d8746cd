//! Synchronous form validation run before any request is sent.

use chrono::NaiveDate;
use fundline_core::{AppError, AppResult};
use serde::Serialize;

use crate::choices::{CaseStatus, CaseType, Channel, Priority};
use crate::contact::{EmailAddress, PhoneNumber};
use crate::records::RecordId;
use crate::templates::SmsBody;

/// Message shown when a required form field is blank.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";

fn required(values: &[&str]) -> AppResult<()> {
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(AppError::Validation(REQUIRED_FIELDS_MESSAGE.to_owned()));
    }

    Ok(())
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn optional_amount(value: &str, label: &str) -> AppResult<Option<f64>> {
    let Some(text) = optional_text(value) else {
        return Ok(None);
    };

    let amount = text
        .replace([',', '$'], "")
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("{label} must be a number")))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::Validation(format!(
            "{label} must be zero or greater"
        )));
    }

    Ok(Some(amount))
}

fn optional_date(value: &str, label: &str) -> AppResult<Option<NaiveDate>> {
    optional_text(value)
        .map(|text| {
            NaiveDate::parse_from_str(text.as_str(), "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("{label} must be a date in YYYY-MM-DD format"))
            })
        })
        .transpose()
}

/// Raw case modal input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseForm {
    /// Plaintiff selector value. Required.
    pub plaintiff_id: String,
    /// Law firm selector value. Required.
    pub law_firm_id: String,
    /// Case type selector value. Required.
    pub case_type: String,
    /// Title input.
    pub title: String,
    /// Description textarea.
    pub description: String,
    /// Priority selector value; blank means normal.
    pub priority: String,
    /// Status selector value; blank means pending.
    pub status: String,
    /// Requested funding amount.
    pub funding_amount_requested: String,
    /// Incident date input (`YYYY-MM-DD`).
    pub incident_date: String,
}

/// Validated case body for create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CasePayload {
    /// Plaintiff reference.
    pub plaintiff_id: RecordId,
    /// Law firm reference.
    pub law_firm_id: RecordId,
    /// Case type.
    pub case_type: CaseType,
    /// Pipeline status.
    pub status: CaseStatus,
    /// Priority.
    pub priority: Priority,
    /// Optional title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional requested funding amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_amount_requested: Option<f64>,
    /// Optional incident date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<NaiveDate>,
}

impl CaseForm {
    /// Validates the form. Blank required fields fail before any format check.
    pub fn validate(&self) -> AppResult<CasePayload> {
        required(&[
            self.plaintiff_id.as_str(),
            self.law_firm_id.as_str(),
            self.case_type.as_str(),
        ])?;

        let status = match optional_text(&self.status) {
            Some(value) => value.to_ascii_lowercase().parse()?,
            None => CaseStatus::Pending,
        };
        let priority = match optional_text(&self.priority) {
            Some(value) => value.to_ascii_lowercase().parse()?,
            None => Priority::Normal,
        };

        Ok(CasePayload {
            plaintiff_id: RecordId::from(self.plaintiff_id.trim()),
            law_firm_id: RecordId::from(self.law_firm_id.trim()),
            case_type: self.case_type.trim().to_ascii_lowercase().parse()?,
            status,
            priority,
            title: optional_text(&self.title),
            description: optional_text(&self.description),
            funding_amount_requested: optional_amount(
                &self.funding_amount_requested,
                "Funding amount",
            )?,
            incident_date: optional_date(&self.incident_date, "Incident date")?,
        })
    }
}

/// Raw plaintiff modal input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaintiffForm {
    /// Given name. Required.
    pub first_name: String,
    /// Family name. Required.
    pub last_name: String,
    /// Email. Required.
    pub email: String,
    /// Phone.
    pub phone: String,
    /// Postal address.
    pub address: String,
}

/// Validated plaintiff body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaintiffPayload {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email.
    pub email: EmailAddress,
    /// Phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneNumber>,
    /// Address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl PlaintiffForm {
    /// Validates the form.
    pub fn validate(&self) -> AppResult<PlaintiffPayload> {
        required(&[
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
        ])?;

        Ok(PlaintiffPayload {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: EmailAddress::new(self.email.as_str())?,
            phone: optional_text(&self.phone).map(PhoneNumber::new).transpose()?,
            address: optional_text(&self.address),
        })
    }
}

/// Raw law firm modal input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LawFirmForm {
    /// Firm name. Required.
    pub name: String,
    /// Email. Required.
    pub email: String,
    /// Primary contact.
    pub contact_person: String,
    /// Phone.
    pub phone: String,
    /// Postal address.
    pub address: String,
}

/// Validated law firm body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LawFirmPayload {
    /// Firm name.
    pub name: String,
    /// Email.
    pub email: EmailAddress,
    /// Primary contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    /// Phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneNumber>,
    /// Address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl LawFirmForm {
    /// Validates the form.
    pub fn validate(&self) -> AppResult<LawFirmPayload> {
        required(&[self.name.as_str(), self.email.as_str()])?;

        Ok(LawFirmPayload {
            name: self.name.trim().to_owned(),
            email: EmailAddress::new(self.email.as_str())?,
            contact_person: optional_text(&self.contact_person),
            phone: optional_text(&self.phone).map(PhoneNumber::new).transpose()?,
            address: optional_text(&self.address),
        })
    }
}

/// Raw compose modal input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageForm {
    /// `email` or `sms`. Required.
    pub channel: String,
    /// Email address or phone number. Required.
    pub recipient: String,
    /// Subject; required for email.
    pub subject: String,
    /// Body. Required.
    pub body: String,
    /// Linked case.
    pub case_id: String,
    /// Template the body was rendered from.
    pub template_id: String,
}

/// Validated outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Channel.
    #[serde(rename = "type")]
    pub channel: Channel,
    /// Recipient address or number.
    pub recipient: String,
    /// Email subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Body.
    pub content: String,
    /// Linked case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<RecordId>,
    /// Template reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<RecordId>,
}

impl MessageForm {
    /// Validates the form for sending. Drafts use [`MessageForm::validate_draft`].
    pub fn validate(&self) -> AppResult<OutboundMessage> {
        required(&[
            self.channel.as_str(),
            self.recipient.as_str(),
            self.body.as_str(),
        ])?;

        let channel: Channel = self.channel.trim().to_ascii_lowercase().parse()?;
        let (recipient, subject, content) = match channel {
            Channel::Email => {
                required(&[self.subject.as_str()])?;
                (
                    String::from(EmailAddress::new(self.recipient.as_str())?),
                    optional_text(&self.subject),
                    self.body.trim().to_owned(),
                )
            }
            Channel::Sms => (
                String::from(PhoneNumber::new(self.recipient.as_str())?),
                None,
                SmsBody::new(self.body.as_str())?.as_str().to_owned(),
            ),
            Channel::PhoneCall | Channel::Letter => {
                return Err(AppError::Validation(format!(
                    "{channel} messages cannot be sent from the composer"
                )));
            }
        };

        Ok(OutboundMessage {
            channel,
            recipient,
            subject,
            content,
            case_id: optional_text(&self.case_id).map(|id| RecordId::from(id.as_str())),
            template_id: optional_text(&self.template_id).map(|id| RecordId::from(id.as_str())),
        })
    }

    /// Validates the form for saving as a draft: only the channel is required.
    pub fn validate_draft(&self) -> AppResult<OutboundMessage> {
        required(&[self.channel.as_str()])?;

        Ok(OutboundMessage {
            channel: self.channel.trim().to_ascii_lowercase().parse()?,
            recipient: self.recipient.trim().to_owned(),
            subject: optional_text(&self.subject),
            content: self.body.trim().to_owned(),
            case_id: optional_text(&self.case_id).map(|id| RecordId::from(id.as_str())),
            template_id: optional_text(&self.template_id).map(|id| RecordId::from(id.as_str())),
        })
    }
}
