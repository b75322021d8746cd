//! Closed value sets used by list filters and forms.

use std::str::FromStr;

use fundline_core::{AppError, AppResult};

use crate::wire_enum::wire_enum;

wire_enum! {
    /// Case pipeline status as filtered on the cases screen.
    pub enum CaseStatus {
        /// Open case being worked.
        Active => "active",
        /// Intake received, not yet qualified.
        Pending => "pending",
        /// Underwriting in progress.
        UnderReview => "under_review",
        /// Funding approved, not yet disbursed.
        Approved => "approved",
        /// Funds disbursed.
        Funded => "funded",
        /// Case settled.
        Settled => "settled",
        /// Case closed.
        Closed => "closed",
        /// Funding declined.
        Rejected => "rejected",
    }
}

wire_enum! {
    /// Legal case category.
    pub enum CaseType {
        /// Personal injury.
        PersonalInjury => "personal_injury",
        /// Medical malpractice.
        MedicalMalpractice => "medical_malpractice",
        /// Workers compensation.
        WorkersCompensation => "workers_compensation",
        /// Product liability.
        ProductLiability => "product_liability",
        /// Wrongful death.
        WrongfulDeath => "wrongful_death",
        /// Auto accident.
        AutoAccident => "auto_accident",
        /// Slip and fall.
        SlipAndFall => "slip_and_fall",
        /// Employment dispute.
        Employment => "employment",
        /// Anything else.
        Other => "other",
    }
}

wire_enum! {
    /// Case and message priority.
    pub enum Priority {
        /// Low priority.
        Low => "low",
        /// Default priority.
        Normal => "normal",
        /// High priority.
        High => "high",
        /// Needs attention now.
        Urgent => "urgent",
    }
}

wire_enum! {
    /// Lifecycle state shared by plaintiffs and law firms.
    pub enum PartyStatus {
        /// Currently engaged.
        Active => "active",
        /// No longer engaged.
        Inactive => "inactive",
        /// Awaiting onboarding.
        Pending => "pending",
    }
}

wire_enum! {
    /// Uploaded document category.
    pub enum DocumentType {
        /// Medical record.
        MedicalRecord => "medical_record",
        /// Police report.
        PoliceReport => "police_report",
        /// Case summary.
        CaseSummary => "case_summary",
        /// Insurance claim.
        InsuranceClaim => "insurance_claim",
        /// Funding contract.
        Contract => "contract",
        /// Correspondence.
        Correspondence => "correspondence",
        /// Court filing.
        LegalFiling => "legal_filing",
        /// Financial statement.
        FinancialStatement => "financial_statement",
        /// Identification document.
        Identification => "identification",
        /// Witness statement.
        WitnessStatement => "witness_statement",
        /// Expert report.
        ExpertReport => "expert_report",
        /// Settlement agreement.
        SettlementAgreement => "settlement_agreement",
        /// Anything else.
        Other => "other",
    }
}

wire_enum! {
    /// Document processing state.
    pub enum DocumentStatus {
        /// Stored, not yet processed.
        Uploaded => "uploaded",
        /// Being analysed.
        Processing => "processing",
        /// Analysis finished.
        Processed => "processed",
        /// Reviewed by staff.
        Reviewed => "reviewed",
        /// Accepted.
        Approved => "approved",
        /// Rejected.
        Rejected => "rejected",
        /// Archived.
        Archived => "archived",
        /// Processing failed.
        Error => "error",
    }
}

wire_enum! {
    /// Communication channel.
    pub enum Channel {
        /// Email.
        Email => "email",
        /// SMS text message.
        Sms => "sms",
        /// Phone call log.
        PhoneCall => "phone_call",
        /// Postal letter.
        Letter => "letter",
    }
}

wire_enum! {
    /// Communication delivery state.
    pub enum CommunicationStatus {
        /// Saved, not sent.
        Draft => "draft",
        /// Queued for later.
        Scheduled => "scheduled",
        /// Sent to the provider.
        Sent => "sent",
        /// Provider confirmed delivery.
        Delivered => "delivered",
        /// Recipient opened it.
        Read => "read",
        /// Recipient replied.
        Replied => "replied",
        /// Delivery failed.
        Failed => "failed",
    }
}

wire_enum! {
    /// Communication direction.
    pub enum Direction {
        /// Received from a contact.
        Inbound => "inbound",
        /// Sent to a contact.
        Outbound => "outbound",
        /// Staff-only note.
        Internal => "internal",
    }
}

wire_enum! {
    /// Aggregation window for reports.
    pub enum ReportPeriod {
        /// Last 7 days.
        Week => "week",
        /// Last 30 days.
        Month => "month",
        /// Last quarter.
        Quarter => "quarter",
        /// Last year.
        Year => "year",
    }
}

wire_enum! {
    /// File format of a report export.
    pub enum ExportFormat {
        /// Comma-separated values.
        Csv => "csv",
        /// PDF document.
        Pdf => "pdf",
        /// Excel workbook.
        Excel => "xlsx",
    }
}

wire_enum! {
    /// Agent lifecycle controls exposed by the backend.
    pub enum AgentCommand {
        /// Start a stopped agent.
        Start => "start",
        /// Stop a running agent.
        Stop => "stop",
        /// Stop then start.
        Restart => "restart",
    }
}

/// Parses a filter dropdown value where blank or `All` means "no filter".
pub fn parse_choice<T>(value: &str) -> AppResult<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }

    trimmed.to_ascii_lowercase().parse::<T>().map(Some)
}

#[cfg(test)]
mod tests {
    use super::{CaseStatus, Channel, parse_choice};

    #[test]
    fn all_means_no_filter() {
        assert_eq!(parse_choice::<CaseStatus>("All").ok(), Some(None));
        assert_eq!(parse_choice::<CaseStatus>("  ").ok(), Some(None));
    }

    #[test]
    fn display_labels_parse_case_insensitively() {
        assert_eq!(
            parse_choice::<CaseStatus>("Active").ok(),
            Some(Some(CaseStatus::Active))
        );
    }

    #[test]
    fn unknown_choice_is_rejected() {
        assert!(parse_choice::<Channel>("carrier_pigeon").is_err());
    }

    #[test]
    fn wire_values_round_trip() {
        for status in CaseStatus::all() {
            assert_eq!(status.as_str().parse::<CaseStatus>().ok(), Some(*status));
        }
    }
}
