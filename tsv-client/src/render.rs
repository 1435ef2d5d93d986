//! Plain-text rendering of a validation cycle
//!
//! Consumers only read [`ValidationOutcome`] / [`ReportReferences`]
//! snapshots; nothing here touches orchestrator state.

use crate::error::ValidationError;
use crate::models::{ReportReferences, ValidationOutcome};
use std::fmt::Write;
use tsv_common::api::SummaryStats;

const TERM_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 20;

pub fn render_summary(summary: Option<&SummaryStats>) -> String {
    let Some(s) = summary else {
        return "Summary: not provided by the service\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  Total terms:   {}", s.total_terms);
    let _ = writeln!(out, "  Valid:         {} ({:.1}%)", s.valid_terms, s.valid_percent);
    let _ = writeln!(out, "  Invalid:       {} ({:.1}%)", s.invalid_terms, s.invalid_percent);
    match s.unknown_percent {
        Some(p) => {
            let _ = writeln!(out, "  Unknown:       {} ({:.1}%)", s.unknown_terms, p);
        }
        None => {
            let _ = writeln!(out, "  Unknown:       {}", s.unknown_terms);
        }
    }
    if !s.counts_add_up() {
        let _ = writeln!(out, "  (counts reported by the service do not add up)");
    }
    out
}

pub fn render_results(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();
    if outcome.validation_results.is_empty() {
        let _ = writeln!(out, "No term results");
        return out;
    }

    let _ = writeln!(
        out,
        "   {:<tw$} {:<vw$} {:<vw$} {:<vw$} Notes",
        "Term",
        "Extracted",
        "Expected",
        "Allowed Range",
        tw = TERM_WIDTH,
        vw = VALUE_WIDTH
    );
    for r in &outcome.validation_results {
        let _ = writeln!(
            out,
            "{}  {:<tw$} {:<vw$} {:<vw$} {:<vw$} {}",
            r.status.marker(),
            clip(&r.term, TERM_WIDTH),
            clip(r.extracted_value.as_deref().unwrap_or("-"), VALUE_WIDTH),
            clip(&r.expected_value, VALUE_WIDTH),
            clip(&r.allowed_range, VALUE_WIDTH),
            r.notes,
            tw = TERM_WIDTH,
            vw = VALUE_WIDTH
        );
    }

    for v in &outcome.violations {
        match v.row {
            Some(row) => {
                let _ = writeln!(out, "!  row {}: unexpected {} '{}'", row, v.field, v.value);
            }
            None => {
                let _ = writeln!(out, "!  unexpected {}: {}", v.field, v.value);
            }
        }
    }
    out
}

pub fn render_master_sheet(outcome: &ValidationOutcome) -> String {
    let columns = outcome.master_sheet_columns();
    format!(
        "Master sheet: {} rows, columns: {}\n",
        outcome.master_sheet_data.len(),
        if columns.is_empty() {
            "(none)".to_string()
        } else {
            columns.join(", ")
        }
    )
}

pub fn render_reports(reports: &ReportReferences) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reports");
    let _ = writeln!(out, "  PDF:   {}", reports.pdf);
    let _ = writeln!(out, "  Excel: {}", reports.excel);
    match &reports.html {
        Some(html) => {
            let _ = writeln!(out, "  HTML:  {} bytes inline", html.len());
        }
        None => {
            let _ = writeln!(out, "  HTML:  not provided");
        }
    }
    out
}

pub fn render_extracted_text(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Extracted text");
    let _ = writeln!(out, "{}", outcome.extracted_text);
    if outcome.extracted_text_truncated() {
        let _ = writeln!(out, "(truncated by the service)");
    }
    out
}

/// Full report for one successful cycle
pub fn render_outcome(
    outcome: &ValidationOutcome,
    reports: &ReportReferences,
    show_text: bool,
) -> String {
    let mut out = String::new();
    out.push_str(&render_summary(outcome.summary.as_ref()));
    out.push('\n');
    out.push_str(&render_results(outcome));
    out.push('\n');
    out.push_str(&render_master_sheet(outcome));
    out.push('\n');
    out.push_str(&render_reports(reports));
    if show_text {
        out.push('\n');
        out.push_str(&render_extracted_text(outcome));
    }
    out
}

/// Operator-facing failure text; server errors carry the raw body
pub fn render_error(error: &ValidationError) -> String {
    match error {
        // Without a service message the display text already is the body
        ValidationError::Server { .. } if error.service_message().is_none() => {
            format!("{}\n", error)
        }
        ValidationError::Server { body, .. } => format!("{}\nResponse body: {}\n", error, body.trim()),
        other => format!("{}\n", other),
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
