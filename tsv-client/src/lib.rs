//! tsv-client - Term sheet validation client
//!
//! Collects a term sheet and a master sheet, submits both to the remote
//! Validation Service in one multipart request, and decomposes the verdict
//! into typed results and report references.

pub mod error;
pub mod models;
pub mod render;
pub mod services;

pub use error::ValidationError;
pub use models::{CyclePhase, FileCandidate, FileSlot, IntakeSlots, SlotKind, SubmitOutcome};
pub use services::{ServiceClient, ValidationOrchestrator, ValidationTransport};
