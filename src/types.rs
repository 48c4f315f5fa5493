//! Core types for datafile-portal

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

/// A logical data-file category within one submission
///
/// Declaration order is the natural order used when listing sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    /// Active case data (TANF, SSP, Tribal)
    #[serde(rename = "Active Case Data")]
    ActiveCaseData,
    /// Closed case data (TANF, SSP, Tribal)
    #[serde(rename = "Closed Case Data")]
    ClosedCaseData,
    /// Aggregate data (TANF, SSP, Tribal)
    #[serde(rename = "Aggregate Data")]
    AggregateData,
    /// Stratum data (TANF, SSP, Tribal)
    #[serde(rename = "Stratum Data")]
    StratumData,
    /// Work outcomes of TANF exiters
    #[serde(rename = "Work Outcomes of TANF Exiters")]
    WorkOutcomesOfTanfExiters,
    /// Secondary school attainment
    #[serde(rename = "Secondary School Attainment")]
    SecondarySchoolAttainment,
    /// Supplemental work outcomes
    #[serde(rename = "Supplemental Work Outcomes")]
    SupplementalWorkOutcomes,
    /// Canonical section for quarterly program audit uploads
    #[serde(rename = "Program Integrity Audit")]
    ProgramAudit,
    /// Feedback report bundle
    #[serde(rename = "Feedback Report")]
    FeedbackReport,
}

/// Legacy and shorthand labels, already normalized
const SECTION_ALIASES: &[(&str, Section)] = &[
    ("active", Section::ActiveCaseData),
    ("closed", Section::ClosedCaseData),
    ("aggregate", Section::AggregateData),
    ("stratum", Section::StratumData),
    ("work outcomes for tanf exiters", Section::WorkOutcomesOfTanfExiters),
    ("exiters", Section::WorkOutcomesOfTanfExiters),
    ("program audit", Section::ProgramAudit),
    ("audit", Section::ProgramAudit),
    ("feedback reports", Section::FeedbackReport),
    ("feedback", Section::FeedbackReport),
];

impl Section {
    /// All sections in natural order
    pub const ALL: [Self; 9] = [
        Self::ActiveCaseData,
        Self::ClosedCaseData,
        Self::AggregateData,
        Self::StratumData,
        Self::WorkOutcomesOfTanfExiters,
        Self::SecondarySchoolAttainment,
        Self::SupplementalWorkOutcomes,
        Self::ProgramAudit,
        Self::FeedbackReport,
    ];

    /// Canonical server label
    pub const fn label(self) -> &'static str {
        match self {
            Self::ActiveCaseData => "Active Case Data",
            Self::ClosedCaseData => "Closed Case Data",
            Self::AggregateData => "Aggregate Data",
            Self::StratumData => "Stratum Data",
            Self::WorkOutcomesOfTanfExiters => "Work Outcomes of TANF Exiters",
            Self::SecondarySchoolAttainment => "Secondary School Attainment",
            Self::SupplementalWorkOutcomes => "Supplemental Work Outcomes",
            Self::ProgramAudit => "Program Integrity Audit",
            Self::FeedbackReport => "Feedback Report",
        }
    }

    /// Map a server or user label onto a section
    ///
    /// Matching ignores case and treats runs of whitespace, `-` and `_` as a
    /// single space, so `active-case-data` and `Active  Case Data` both map
    /// to [`Section::ActiveCaseData`].
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|s| normalize_label(s.label()) == wanted)
            .or_else(|| {
                SECTION_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == wanted)
                    .map(|(_, section)| *section)
            })
    }
}

fn normalize_label(label: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[\s_-]+").expect("hardcoded regex is valid"));
    re.replace_all(label.trim(), " ").to_lowercase()
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s).ok_or_else(|| Error::Parse(format!("unknown section: {s}")))
    }
}

/// Fiscal quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    /// October - December (of the previous calendar year)
    Q1,
    /// January - March
    Q2,
    /// April - June
    Q3,
    /// July - September
    Q4,
}

impl Quarter {
    /// All quarters in order
    pub const ALL: [Self; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// Human-readable calendar period for this quarter of `fiscal_year`
    pub fn calendar_period(self, fiscal_year: i32) -> String {
        match self {
            Self::Q1 => format!("Oct 1 - Dec 31, {}", fiscal_year - 1),
            Self::Q2 => format!("Jan 1 - Mar 31, {fiscal_year}"),
            Self::Q3 => format!("Apr 1 - Jun 30, {fiscal_year}"),
            Self::Q4 => format!("Jul 1 - Sep 30, {fiscal_year}"),
        }
    }

    /// Fiscal year and quarter containing `date`
    pub fn for_date(date: NaiveDate) -> (i32, Self) {
        match date.month() {
            10..=12 => (date.year() + 1, Self::Q1),
            1..=3 => (date.year(), Self::Q2),
            4..=6 => (date.year(), Self::Q3),
            _ => (date.year(), Self::Q4),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        };
        f.write_str(s)
    }
}

impl FromStr for Quarter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().trim_start_matches('Q') {
            "1" => Ok(Self::Q1),
            "2" => Ok(Self::Q2),
            "3" => Ok(Self::Q3),
            "4" => Ok(Self::Q4),
            _ => Err(Error::Parse(format!("invalid quarter: {s}"))),
        }
    }
}

/// Reporting program the session submits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramType {
    /// Temporary Assistance for Needy Families
    Tanf,
    /// Separate State Programs
    Ssp,
    /// Tribal TANF
    Tribal,
    /// Work outcomes reporting
    WorkOutcomes,
    /// Quarterly program integrity audit
    ProgramAudit,
    /// Feedback report bundles (administrators)
    FeedbackReports,
}

/// What a program type accepts for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRules {
    /// Accepted file extensions, lowercase, without the dot
    pub allowed_extensions: &'static [&'static str],
    /// Whether a "date extracted on" value must accompany the file
    pub requires_date_extracted: bool,
}

const CASE_DATA_SECTIONS: [Section; 4] = [
    Section::ActiveCaseData,
    Section::ClosedCaseData,
    Section::AggregateData,
    Section::StratumData,
];

const WORK_OUTCOME_SECTIONS: [Section; 3] = [
    Section::WorkOutcomesOfTanfExiters,
    Section::SecondarySchoolAttainment,
    Section::SupplementalWorkOutcomes,
];

impl ProgramType {
    /// Short code sent to the server
    pub const fn api_code(self) -> &'static str {
        match self {
            Self::Tanf => "TAN",
            Self::Ssp => "SSP",
            Self::Tribal => "TRIBAL",
            Self::WorkOutcomes => "FRA",
            Self::ProgramAudit => "PIA",
            Self::FeedbackReports => "FEEDBACK",
        }
    }

    /// Whether uploads are staged per quarter instead of per section
    pub const fn uses_quarter_slots(self) -> bool {
        matches!(self, Self::ProgramAudit)
    }

    /// Staging slots offered, in natural order
    pub fn slots(self) -> Vec<SlotId> {
        match self {
            Self::Tanf | Self::Ssp | Self::Tribal => {
                CASE_DATA_SECTIONS.into_iter().map(SlotId::Section).collect()
            }
            Self::WorkOutcomes => WORK_OUTCOME_SECTIONS.into_iter().map(SlotId::Section).collect(),
            Self::ProgramAudit => Quarter::ALL.into_iter().map(SlotId::Quarter).collect(),
            Self::FeedbackReports => vec![SlotId::Section(Section::FeedbackReport)],
        }
    }

    /// Upload rules for this program type
    pub const fn upload_rules(self) -> UploadRules {
        match self {
            Self::Tanf | Self::Ssp | Self::Tribal => UploadRules {
                allowed_extensions: &["txt", "csv", "dat"],
                requires_date_extracted: false,
            },
            Self::WorkOutcomes | Self::ProgramAudit => UploadRules {
                allowed_extensions: &["csv", "xlsx"],
                requires_date_extracted: false,
            },
            Self::FeedbackReports => UploadRules {
                allowed_extensions: &["zip"],
                requires_date_extracted: true,
            },
        }
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tanf => "TANF",
            Self::Ssp => "SSP-MOE",
            Self::Tribal => "Tribal TANF",
            Self::WorkOutcomes => "Work Outcomes",
            Self::ProgramAudit => "Program Integrity Audit",
            Self::FeedbackReports => "Feedback Reports",
        };
        f.write_str(s)
    }
}

impl FromStr for ProgramType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tanf" | "tan" => Ok(Self::Tanf),
            "ssp" | "ssp-moe" => Ok(Self::Ssp),
            "tribal" => Ok(Self::Tribal),
            "work-outcomes" | "fra" => Ok(Self::WorkOutcomes),
            "program-audit" | "audit" | "pia" => Ok(Self::ProgramAudit),
            "feedback-reports" | "feedback" => Ok(Self::FeedbackReports),
            _ => Err(Error::Parse(format!("unknown program type: {s}"))),
        }
    }
}

/// Key of a staging slot or a history bucket
///
/// Section slots sort before quarter slots; within each kind the natural
/// order applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SlotId {
    /// One slot per section
    Section(Section),
    /// One slot per quarter (quarterly audit uploads)
    Quarter(Quarter),
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section(section) => fmt::Display::fmt(section, f),
            Self::Quarter(quarter) => fmt::Display::fmt(quarter, f),
        }
    }
}

impl FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(quarter) = s.parse::<Quarter>() {
            return Ok(Self::Quarter(quarter));
        }
        s.parse::<Section>()
            .map(Self::Section)
            .map_err(|_| Error::Parse(format!("unknown slot: {s}")))
    }
}

/// Server-side processing status of a submitted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Still being processed
    #[default]
    Pending,
    /// Accepted without errors
    Accepted,
    /// Accepted, errors reported
    #[serde(rename = "Accepted with Errors")]
    AcceptedWithErrors,
    /// Only part of the file was accepted
    #[serde(rename = "Partially Accepted with Errors")]
    PartiallyAcceptedWithErrors,
    /// Rejected
    Rejected,
    /// Client-side: polling gave up before the server finished
    #[serde(rename = "Timed Out")]
    TimedOut,
}

impl Status {
    /// Whether polling can stop at this status
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the status came from the server (everything but `TimedOut`)
    pub const fn is_natural(self) -> bool {
        !matches!(self, Self::TimedOut)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::AcceptedWithErrors => "Accepted with Errors",
            Self::PartiallyAcceptedWithErrors => "Partially Accepted with Errors",
            Self::Rejected => "Rejected",
            Self::TimedOut => "Timed Out",
        };
        f.write_str(s)
    }
}

/// The logical bucket that staged and submitted files belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionSession {
    /// Fiscal year
    pub year: i32,
    /// Fiscal quarter
    pub quarter: Quarter,
    /// Program type
    pub program_type: ProgramType,
    /// Organization (state, tribe or territory) id
    pub organization_id: u64,
}

/// A file picked by the user, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Local path of the file
    pub path: PathBuf,
    /// Companion "date extracted on" value, when the rules require one
    pub date_extracted_on: Option<NaiveDate>,
}

impl StagedFile {
    /// A file without companion fields
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            date_extracted_on: None,
        }
    }

    /// Attach the "date extracted on" companion value
    #[must_use]
    pub const fn with_date_extracted_on(mut self, date: NaiveDate) -> Self {
        self.date_extracted_on = Some(date);
        self
    }
}

/// A validated file occupying one staging slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSlot {
    /// Slot the file occupies
    pub slot: SlotId,
    /// File name (last path component)
    pub file_name: String,
    /// MIME type derived from the extension
    pub mime_type: String,
    /// When the file was staged
    pub staged_at: DateTime<Utc>,
    /// Local path of the file
    pub path: PathBuf,
    /// Companion "date extracted on" value
    pub date_extracted_on: Option<NaiveDate>,
    /// Server id once submitted
    pub server_record_id: Option<u64>,
}

impl FileSlot {
    /// Whether the file still needs submitting
    pub const fn is_unsubmitted(&self) -> bool {
        self.server_record_id.is_none()
    }

    /// Whether this entry is still the unsubmitted file `sent` describes
    pub fn is_same_upload(&self, sent: &Self) -> bool {
        self.is_unsubmitted()
            && self.slot == sent.slot
            && self.staged_at == sent.staged_at
            && self.path == sent.path
    }
}

/// A server record created by a submission
///
/// This is a read-only projection of server state; only the status poller
/// changes `status` and `error_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRecord {
    /// Server id
    pub id: u64,
    /// Section label as provided by the server
    pub section: String,
    /// Fiscal quarter
    pub quarter: Quarter,
    /// Fiscal year
    pub year: i32,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Who submitted the file
    pub submitted_by: String,
    /// Original file name
    #[serde(alias = "original_filename", default)]
    pub file_name: String,
    /// Processing status
    #[serde(default)]
    pub status: Status,
    /// Number of parser errors reported
    #[serde(default)]
    pub error_count: u32,
}

/// Metadata sent along with a new record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    /// Canonical section
    pub section: Section,
    /// Fiscal quarter
    pub quarter: Quarter,
    /// Fiscal year
    pub year: i32,
    /// Program type
    pub program_type: ProgramType,
    /// Organization id
    pub organization_id: u64,
}

/// Server response to a record creation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedRecord {
    /// New record id
    pub id: u64,
    /// Creation time, if the server reports it
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Submitting user, if the server reports it
    #[serde(default)]
    pub submitted_by: Option<String>,
}

impl CreatedRecord {
    /// Response carrying only the id
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            created_at: None,
            submitted_by: None,
        }
    }
}

/// Server response to a status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusReport {
    /// Current status
    pub status: Status,
    /// Number of parser errors, if known yet
    #[serde(default)]
    pub error_count: Option<u32>,
}

/// Filters for listing records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilters {
    /// Fiscal year
    pub year: i32,
    /// Program type
    pub program_type: ProgramType,
    /// Organization id
    pub organization_id: u64,
    /// Restrict to one quarter
    pub quarter: Option<Quarter>,
    /// Restrict to one section
    pub section: Option<Section>,
}

impl RecordFilters {
    /// Filters matching every record of a session's year, program and organization
    pub const fn for_session(session: &SubmissionSession) -> Self {
        Self {
            year: session.year,
            program_type: session.program_type,
            organization_id: session.organization_id,
            quarter: None,
            section: None,
        }
    }
}
