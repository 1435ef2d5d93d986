//! Validation cycle state machine
//!
//! Idle → Submitting → {Success, Failed}. Success and Failed both allow a
//! new submission, which re-enters Submitting.

use crate::error::ValidationError;
use crate::models::{FileBlob, FileSlot, SlotKind, ValidationOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tsv_common::api::ReportKind;
use tsv_common::ServiceEndpoints;

/// Phase of the current validation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Idle,
    Submitting,
    Success,
    Failed,
}

impl CyclePhase {
    /// Whether `submit` may start a new cycle from this phase
    pub fn can_submit(&self) -> bool {
        !matches!(self, CyclePhase::Submitting)
    }
}

/// Recorded phase change
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub old_phase: CyclePhase,
    pub new_phase: CyclePhase,
    pub transitioned_at: DateTime<Utc>,
}

/// Both files of one submission
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub term_sheet: FileBlob,
    pub master_sheet: FileBlob,
}

impl ValidationRequest {
    /// Build a request from the two slots, naming any that are empty
    pub fn from_slots(term: &FileSlot, master: &FileSlot) -> Result<Self, ValidationError> {
        match (&term.file, &master.file) {
            (Some(term_sheet), Some(master_sheet)) => Ok(Self {
                term_sheet: term_sheet.clone(),
                master_sheet: master_sheet.clone(),
            }),
            (term_file, master_file) => {
                let mut missing = Vec::new();
                if term_file.is_none() {
                    missing.push(SlotKind::TermSheet);
                }
                if master_file.is_none() {
                    missing.push(SlotKind::MasterSheet);
                }
                Err(ValidationError::Precondition { missing })
            }
        }
    }

    /// Files in multipart order with their field identifiers
    pub fn parts(&self) -> [(SlotKind, &FileBlob); 2] {
        [
            (SlotKind::TermSheet, &self.term_sheet),
            (SlotKind::MasterSheet, &self.master_sheet),
        ]
    }
}

/// Where the reports of the latest successful cycle can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportReferences {
    pub pdf: String,
    pub excel: String,
    /// Taken verbatim from the response, `None` when the service sent none
    pub html: Option<String>,
}

impl ReportReferences {
    pub fn derive(endpoints: &ServiceEndpoints, outcome: &ValidationOutcome) -> Self {
        Self {
            pdf: endpoints.download(ReportKind::Pdf).to_string(),
            excel: endpoints.download(ReportKind::Excel).to_string(),
            html: outcome.html_report.clone(),
        }
    }

    pub fn for_kind(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Pdf => &self.pdf,
            ReportKind::Excel => &self.excel,
        }
    }
}

/// Output of a successful cycle
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub outcome: Arc<ValidationOutcome>,
    pub reports: ReportReferences,
}

/// Result of one `submit` call
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Cycle reached Success
    Success(CycleResult),
    /// Cycle reached Failed with this classification
    Failed(ValidationError),
    /// Refused before any state change; always `ValidationError::Precondition`
    PreconditionNotMet(ValidationError),
    /// Another cycle is in flight; nothing was sent
    AlreadyInFlight,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            SubmitOutcome::Failed(e) | SubmitOutcome::PreconditionNotMet(e) => Some(e),
            _ => None,
        }
    }
}

/// Read-only view of the orchestrator for rendering
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    pub phase: CyclePhase,
    /// Latest successful outcome; survives later failures
    pub outcome: Option<Arc<ValidationOutcome>>,
    /// Cleared when a new submission starts
    pub reports: Option<ReportReferences>,
    /// Classification of the latest failed cycle
    pub last_error: Option<ValidationError>,
    pub transitions: Vec<StateTransition>,
}
