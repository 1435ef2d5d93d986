//! Validation request orchestrator
//!
//! Owns the state of the current validation cycle:
//! Idle → Submitting → {Success, Failed} → Submitting → ...
//!
//! At most one request is in flight. The cycle lock is held only while
//! checking or recording state, never across the network call, so a
//! concurrent `submit` sees Submitting and returns without dispatching.
//! A `submit` future dropped mid-flight settles the cycle as Failed.

use crate::error::ValidationError;
use crate::models::{
    CyclePhase, CycleResult, CycleSnapshot, FileSlot, ReportReferences, StateTransition,
    SubmitOutcome, ValidationOutcome, ValidationRequest,
};
use crate::services::decomposer::decompose_bytes;
use crate::services::service_client::ValidationTransport;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transitions kept for inspection; older entries are dropped
const TRANSITION_HISTORY: usize = 64;

#[derive(Debug)]
struct CycleState {
    phase: CyclePhase,
    outcome: Option<Arc<ValidationOutcome>>,
    reports: Option<ReportReferences>,
    last_error: Option<ValidationError>,
    transitions: Vec<StateTransition>,
}

impl CycleState {
    fn new() -> Self {
        Self {
            phase: CyclePhase::Idle,
            outcome: None,
            reports: None,
            last_error: None,
            transitions: Vec::new(),
        }
    }

    fn transition_to(&mut self, new_phase: CyclePhase) {
        let transition = StateTransition {
            old_phase: self.phase,
            new_phase,
            transitioned_at: Utc::now(),
        };
        debug!(from = ?transition.old_phase, to = ?new_phase, "Validation cycle transition");

        self.phase = new_phase;
        if self.transitions.len() == TRANSITION_HISTORY {
            self.transitions.remove(0);
        }
        self.transitions.push(transition);
    }
}

// Never held across an await, so a plain mutex is enough and Drop can take it
fn lock_state(state: &Mutex<CycleState>) -> MutexGuard<'_, CycleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Armed while a dispatch is outstanding
///
/// If the owning `submit` future is dropped before the result is recorded,
/// the cycle moves to Failed with [`ValidationError::Abandoned`]. Prior
/// results are left in place.
struct InFlightGuard<'a> {
    state: &'a Mutex<CycleState>,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn arm(state: &'a Mutex<CycleState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_state(self.state);
        if state.phase == CyclePhase::Submitting {
            warn!("Validation abandoned while in flight");
            state.last_error = Some(ValidationError::Abandoned);
            state.transition_to(CyclePhase::Failed);
        }
    }
}

/// Drives validation cycles against one transport
pub struct ValidationOrchestrator<T> {
    transport: T,
    cycle_timeout: Option<Duration>,
    state: Mutex<CycleState>,
}

impl<T: ValidationTransport> ValidationOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cycle_timeout: None,
            state: Mutex::new(CycleState::new()),
        }
    }

    /// Fail a cycle as `Timeout` once this bound expires
    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = Some(timeout);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn phase(&self) -> CyclePhase {
        lock_state(&self.state).phase
    }

    /// Read-only copy of the cycle state for rendering
    pub async fn snapshot(&self) -> CycleSnapshot {
        let state = lock_state(&self.state);
        CycleSnapshot {
            phase: state.phase,
            outcome: state.outcome.clone(),
            reports: state.reports.clone(),
            last_error: state.last_error.clone(),
            transitions: state.transitions.clone(),
        }
    }

    /// Run one validation cycle for the two slots
    ///
    /// Never returns an error: every failure is classified into the
    /// returned [`SubmitOutcome`] and recorded on the cycle.
    pub async fn submit(&self, term_slot: &FileSlot, master_slot: &FileSlot) -> SubmitOutcome {
        let request = {
            let mut state = lock_state(&self.state);

            if !state.phase.can_submit() {
                debug!("Validation already in flight, ignoring submit");
                return SubmitOutcome::AlreadyInFlight;
            }

            let request = match ValidationRequest::from_slots(term_slot, master_slot) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Submit refused");
                    return SubmitOutcome::PreconditionNotMet(e);
                }
            };

            state.reports = None;
            state.transition_to(CyclePhase::Submitting);
            request
        };
        let guard = InFlightGuard::arm(&self.state);

        info!(
            term_sheet = %request.term_sheet.name,
            master_sheet = %request.master_sheet.name,
            "Submitting documents for validation"
        );

        let result = match self.cycle_timeout {
            Some(bound) => match tokio::time::timeout(bound, self.transport.dispatch(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ValidationError::Timeout { after: bound }),
            },
            None => self.transport.dispatch(&request).await,
        }
        .and_then(|body| decompose_bytes(&body));

        let mut state = lock_state(&self.state);
        guard.disarm();
        match result {
            Ok(outcome) => {
                let outcome = Arc::new(outcome);
                let reports = ReportReferences::derive(self.transport.endpoints(), &outcome);

                info!(
                    terms = outcome.validation_results.len(),
                    violations = outcome.violations.len(),
                    "Validation succeeded"
                );

                state.outcome = Some(Arc::clone(&outcome));
                state.reports = Some(reports.clone());
                state.last_error = None;
                state.transition_to(CyclePhase::Success);

                SubmitOutcome::Success(CycleResult { outcome, reports })
            }
            Err(e) => {
                // Results of an earlier Success stay visible
                warn!(kind = e.kind(), error = %e, "Validation failed");
                state.last_error = Some(e.clone());
                state.transition_to(CyclePhase::Failed);
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Drop displayed results and return to Idle
    ///
    /// Ignored while a cycle is in flight.
    pub async fn clear(&self) -> bool {
        let mut state = lock_state(&self.state);
        if !state.phase.can_submit() {
            return false;
        }
        state.outcome = None;
        state.reports = None;
        state.last_error = None;
        if state.phase != CyclePhase::Idle {
            state.transition_to(CyclePhase::Idle);
        }
        true
    }
}
