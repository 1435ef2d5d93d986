//! Data models for the validation client
//!
//! - Intake slots for the two input documents
//! - Validation cycle state machine and request
//! - Decomposed validation outcome

pub mod file_slot;
pub mod outcome;
pub mod validation_cycle;

pub use file_slot::{FileBlob, FileCandidate, FileSlot, IntakeSlots, SlotKind};
pub use outcome::{ContractViolation, MasterSheetRow, TermResult, ValidationOutcome};
pub use validation_cycle::{
    CyclePhase, CycleResult, CycleSnapshot, ReportReferences, StateTransition, SubmitOutcome,
    ValidationRequest,
};
