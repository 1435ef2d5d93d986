//! Validation Service wire types
//!
//! Field names follow what the service emits: camelCase at the top level,
//! spreadsheet column headers ("Extracted Value", "Allowed Range", ...) for
//! each term result row.
//!
//! Every top-level field is optional on the wire. Absent or `null` fields
//! decode to `None` so that the caller decides what "missing" means.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ========================================
// Term Status
// ========================================

/// Verdict for one term
///
/// Closed set. The service encodes these as emoji markers; any other
/// marker is a contract violation and has no `TermStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermStatus {
    Valid,
    Invalid,
    Unknown,
}

impl TermStatus {
    pub const VALID_MARKER: &'static str = "✅";
    pub const INVALID_MARKER: &'static str = "❌";
    pub const UNKNOWN_MARKER: &'static str = "❓";

    /// Map a wire marker to a status, `None` if the marker is not one of the three
    ///
    /// # Examples
    ///
    /// ```
    /// use tsv_common::TermStatus;
    ///
    /// assert_eq!(TermStatus::from_marker("✅"), Some(TermStatus::Valid));
    /// assert_eq!(TermStatus::from_marker("maybe"), None);
    /// ```
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim() {
            Self::VALID_MARKER => Some(TermStatus::Valid),
            Self::INVALID_MARKER => Some(TermStatus::Invalid),
            Self::UNKNOWN_MARKER => Some(TermStatus::Unknown),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            TermStatus::Valid => Self::VALID_MARKER,
            TermStatus::Invalid => Self::INVALID_MARKER,
            TermStatus::Unknown => Self::UNKNOWN_MARKER,
        }
    }
}

impl fmt::Display for TermStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermStatus::Valid => f.write_str("Valid"),
            TermStatus::Invalid => f.write_str("Invalid"),
            TermStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

// ========================================
// Response Body
// ========================================

/// Body of a successful `POST /api/validate`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponseBody {
    #[serde(default)]
    pub success: Option<bool>,

    /// Master sheet rows, column name → cell value, in sheet order
    #[serde(default)]
    pub master_sheet_data: Option<Vec<Map<String, Value>>>,

    #[serde(default)]
    pub validation_results: Option<Vec<TermResultRecord>>,

    /// Terms the service extracted from the term sheet (free-form)
    #[serde(default)]
    pub extracted_terms: Option<Map<String, Value>>,

    #[serde(default)]
    pub summary: Option<SummaryStats>,

    /// Raw extracted text, truncated by the service
    #[serde(default)]
    pub extracted_text: Option<String>,

    /// HTML report reference, used verbatim
    #[serde(default, alias = "htmlReportReference")]
    pub html_report: Option<String>,

    /// Server-side file name of the PDF report
    #[serde(default)]
    pub pdf_report: Option<String>,

    /// Server-side file name of the Excel report
    #[serde(default)]
    pub excel_report: Option<String>,
}

/// One row of `validationResults`
///
/// `status` is kept as the raw marker; mapping to [`TermStatus`] happens in
/// decomposition where violations are recorded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermResultRecord {
    #[serde(rename = "Term", alias = "term", default, deserialize_with = "lenient_string")]
    pub term: String,

    #[serde(
        rename = "Extracted Value",
        alias = "extractedValue",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub extracted_value: Option<String>,

    #[serde(rename = "Status", alias = "status", default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(
        rename = "Expected Value",
        alias = "expectedValue",
        default,
        deserialize_with = "lenient_string"
    )]
    pub expected_value: String,

    #[serde(
        rename = "Allowed Range",
        alias = "allowedRange",
        default,
        deserialize_with = "lenient_string"
    )]
    pub allowed_range: String,

    #[serde(rename = "Notes", alias = "notes", default, deserialize_with = "lenient_string")]
    pub notes: String,
}

/// Summary counts computed by the service
///
/// Counts are passed through as received, never recomputed client-side.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_terms: u64,
    pub valid_terms: u64,
    pub invalid_terms: u64,
    pub unknown_terms: u64,
    pub valid_percent: f64,
    pub invalid_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_percent: Option<f64>,
}

impl SummaryStats {
    /// `valid + invalid + unknown == total`
    pub fn counts_add_up(&self) -> bool {
        self.valid_terms
            .checked_add(self.invalid_terms)
            .and_then(|n| n.checked_add(self.unknown_terms))
            == Some(self.total_terms)
    }

    /// Every percentage lies in [0, 100]
    pub fn percents_in_range(&self) -> bool {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        in_range(self.valid_percent)
            && in_range(self.invalid_percent)
            && self.unknown_percent.map_or(true, in_range)
    }

    pub fn is_consistent(&self) -> bool {
        self.counts_add_up() && self.percents_in_range()
    }
}

// ========================================
// Error Body
// ========================================

/// Body the service sends with a non-2xx status
///
/// Only used to pull a readable message out of the raw body; the raw body
/// itself is always kept for diagnosis.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub traceback: Option<String>,
}

impl ServiceErrorBody {
    /// Parse `{"error": ..., "traceback": ...}`, `None` if the body is not that shape
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(|body| body.error.is_some())
    }
}

// ========================================
// Lenient cell decoding
// ========================================

// Spreadsheet cells come back as strings, numbers or null depending on the sheet
fn cell_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(cell_to_string(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(cell_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}
