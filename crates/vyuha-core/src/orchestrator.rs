//! The decide-validate-retry loop.
//!
//! One cycle runs to a terminal status once started. The ledger is touched at
//! most once per cycle, and only after the gate approved the last attempt.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::commander::Proposer;
use crate::error::{Result, VyuhaError};
use crate::events::{Event, EventStore};
use crate::gate::{format_rejection_message, ValidationGate};
use crate::ledger::StateLedger;
use crate::types::{ActionCycle, Attempt, CycleStatus, ProposedCommand, RiskAssessment};

#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// Generated when absent.
    pub session_id: Option<String>,
    /// Replace the proposal for attempt #1 with the synthetic threat command.
    pub inject_threat: bool,
}

pub struct RetryOrchestrator {
    proposer: Arc<dyn Proposer>,
    gate: ValidationGate,
    ledger: Arc<StateLedger>,
    events: Arc<EventStore>,
    max_retries: u32,
    cycle_lock: Mutex<()>,
}

pub fn new_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

impl RetryOrchestrator {
    pub fn new(
        proposer: Arc<dyn Proposer>,
        gate: ValidationGate,
        ledger: Arc<StateLedger>,
        events: Arc<EventStore>,
        max_retries: u32,
    ) -> Self {
        Self {
            proposer,
            gate,
            ledger,
            events,
            max_retries: max_retries.max(1),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run one bounded cycle for `risk`. The risk status is not consulted:
    /// SAFE and CRITICAL inputs take the same path.
    ///
    /// Errors are limited to invalid input and persistence failures; oracle
    /// trouble is absorbed into the attempts.
    pub fn run_action_cycle(
        &self,
        risk: RiskAssessment,
        options: CycleOptions,
    ) -> Result<ActionCycle> {
        risk.validate()?;

        let _cycle = self
            .cycle_lock
            .lock()
            .map_err(|_| VyuhaError::LedgerPoisoned)?;

        let cycle_id = Uuid::new_v4();
        let session_id = options
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(new_session_id);
        let started = Instant::now();

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut rejection_reason: Option<String> = None;
        let mut maneuver = None;

        for sequence_number in 1..=self.max_retries {
            let proposal_start = Instant::now();
            let injected = options.inject_threat && sequence_number == 1;
            let command = if injected {
                ProposedCommand::synthetic_threat()
            } else {
                self.propose(&risk, rejection_reason.as_deref(), &session_id)
            };
            let latency_ms = elapsed_ms(proposal_start);

            let validation_start = Instant::now();
            let validation = self.gate.validate(&command, &session_id);
            let validation_latency_ms = elapsed_ms(validation_start);

            tracing::debug!(
                session_id = %session_id,
                attempt = sequence_number,
                action = %command.action,
                approved = validation.approved,
                source = %validation.source,
                "attempt validated"
            );

            let approved = validation.approved;
            let tags = validation.violation_tags.clone();
            attempts.push(Attempt {
                sequence_number,
                command: command.clone(),
                validation,
                latency_ms,
                validation_latency_ms,
                injected,
            });

            if approved {
                maneuver = Some(self.ledger.apply(cycle_id, &risk, &command)?);
                break;
            }

            tracing::info!(
                session_id = %session_id,
                attempt = sequence_number,
                max_retries = self.max_retries,
                violations = ?tags,
                "attempt blocked"
            );
            rejection_reason = Some(format_rejection_message(&tags));
        }

        let final_status = if maneuver.is_some() {
            CycleStatus::Executed
        } else {
            CycleStatus::ManualOverrideRequired
        };

        let cycle = ActionCycle {
            cycle_id,
            session_id,
            risk,
            attempts,
            final_status,
            total_latency_ms: elapsed_ms(started),
            maneuver,
            completed_at: Utc::now(),
        };

        self.events.append(&Event::act(cycle.clone()))?;

        tracing::info!(
            cycle_id = %cycle.cycle_id,
            session_id = %cycle.session_id,
            status = %cycle.final_status,
            attempts = cycle.attempts.len(),
            "action cycle complete"
        );
        Ok(cycle)
    }

    fn propose(
        &self,
        risk: &RiskAssessment,
        rejection_reason: Option<&str>,
        session_id: &str,
    ) -> ProposedCommand {
        match self.proposer.propose(risk, rejection_reason) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(
                    session_id,
                    error = %e,
                    "proposer failed; substituting safe default"
                );
                ProposedCommand::safe_default()
            }
        }
    }
}
