//! Response decomposition
//!
//! Turns the raw body of a 2xx `POST /api/validate` into a
//! [`ValidationOutcome`]. Pure and deterministic: the same body always
//! yields an equal outcome.
//!
//! Absent fields decode to empty values rather than errors. Only a body
//! that is not a JSON object, or a present field with the wrong shape, is
//! rejected as malformed.

use crate::error::ValidationError;
use crate::models::{ContractViolation, TermResult, ValidationOutcome};
use serde_json::Value;
use tracing::warn;
use tsv_common::api::{TermResultRecord, ValidationResponseBody};
use tsv_common::TermStatus;

/// Decompose raw response bytes
pub fn decompose_bytes(body: &[u8]) -> Result<ValidationOutcome, ValidationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::MalformedResponse(format!("body is not JSON: {}", e)))?;
    decompose(&value)
}

/// Decompose a parsed response body
pub fn decompose(body: &Value) -> Result<ValidationOutcome, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(body)
        )));
    }

    let wire: ValidationResponseBody = serde_json::from_value(body.clone())
        .map_err(|e| ValidationError::MalformedResponse(e.to_string()))?;

    let mut violations = Vec::new();

    let validation_results = wire
        .validation_results
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(row, record)| term_result(row, record, &mut violations))
        .collect();

    if let Some(summary) = &wire.summary {
        if !summary.is_consistent() {
            warn!(
                total = summary.total_terms,
                valid = summary.valid_terms,
                invalid = summary.invalid_terms,
                unknown = summary.unknown_terms,
                "Service summary is inconsistent, passing through unchanged"
            );
            violations.push(ContractViolation {
                row: None,
                field: "summary".to_string(),
                value: serde_json::to_string(summary).unwrap_or_default(),
            });
        }
    }

    Ok(ValidationOutcome {
        master_sheet_data: wire.master_sheet_data.unwrap_or_default(),
        validation_results,
        extracted_terms: wire.extracted_terms.unwrap_or_default(),
        summary: wire.summary,
        extracted_text: wire.extracted_text.unwrap_or_default(),
        html_report: wire.html_report,
        pdf_report_name: wire.pdf_report,
        excel_report_name: wire.excel_report,
        violations,
    })
}

// Rows with a status outside the closed set are dropped and recorded
fn term_result(
    row: usize,
    record: TermResultRecord,
    violations: &mut Vec<ContractViolation>,
) -> Option<TermResult> {
    match TermStatus::from_marker(&record.status) {
        Some(status) => Some(TermResult {
            term: record.term,
            extracted_value: record.extracted_value,
            status,
            expected_value: record.expected_value,
            allowed_range: record.allowed_range,
            notes: record.notes,
        }),
        None => {
            warn!(
                row,
                term = %record.term,
                status = %record.status,
                "Term result has a status outside the contract"
            );
            violations.push(ContractViolation {
                row: Some(row),
                field: "Status".to_string(),
                value: record.status,
            });
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
