//! Typed result of one successful validation cycle

use serde::Serialize;
use serde_json::{Map, Value};
use tsv_common::api::SummaryStats;
use tsv_common::TermStatus;

/// Marker the service appends when it truncates `extractedText`
pub const TRUNCATION_MARKER: &str = "...";

/// Characters of extracted text the service keeps before the marker
pub const EXTRACTED_TEXT_LIMIT: usize = 5000;

/// Master sheet row, column name → cell value in sheet order
pub type MasterSheetRow = Map<String, Value>;

/// Verdict for one term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermResult {
    pub term: String,
    pub extracted_value: Option<String>,
    pub status: TermStatus,
    pub expected_value: String,
    pub allowed_range: String,
    pub notes: String,
}

/// A value the service sent outside its documented contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractViolation {
    /// Index into `validationResults`, `None` for top-level fields
    pub row: Option<usize>,
    pub field: String,
    pub value: String,
}

/// Decomposed ValidationResponse
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationOutcome {
    pub master_sheet_data: Vec<MasterSheetRow>,
    pub validation_results: Vec<TermResult>,
    pub extracted_terms: Map<String, Value>,
    pub summary: Option<SummaryStats>,
    pub extracted_text: String,
    pub html_report: Option<String>,
    pub pdf_report_name: Option<String>,
    pub excel_report_name: Option<String>,
    pub violations: Vec<ContractViolation>,
}

impl ValidationOutcome {
    /// Column names of the master sheet, in first-seen order
    pub fn master_sheet_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for row in &self.master_sheet_data {
            for key in row.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key.as_str());
                }
            }
        }
        columns
    }

    pub fn results_with_status(&self, status: TermStatus) -> impl Iterator<Item = &TermResult> {
        self.validation_results
            .iter()
            .filter(move |r| r.status == status)
    }

    pub fn extracted_text_truncated(&self) -> bool {
        self.extracted_text.ends_with(TRUNCATION_MARKER)
            && self.extracted_text.chars().count() == EXTRACTED_TEXT_LIMIT + TRUNCATION_MARKER.len()
    }
}
