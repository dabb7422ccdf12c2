use super::{Phase, RunStatus, ShutdownReason};
use crate::error::LifecycleError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// How a single bounded call ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum CallOutcome {
    Completed,
    DeadlineExceeded,
    Failed(String),
}

/// One start or stop call issued during the run
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub service: String,
    pub phase: Phase,
    #[serde(flatten)]
    pub outcome: CallOutcome,
    pub elapsed_ms: u64,
}

/// Everything observed during one lifecycle run, including the aggregated
/// status that decides the process exit code.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub shutdown_reason: Option<ShutdownReason>,
    pub calls: Vec<CallRecord>,
    pub status: RunStatus,
}

impl LifecycleReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            shutdown_reason: None,
            calls: Vec::new(),
            status: RunStatus::Ok,
        }
    }

    /// Record a call result, marking the run failed if the call failed
    pub fn record(
        &mut self,
        service: &str,
        phase: Phase,
        result: &Result<(), LifecycleError>,
        elapsed: Duration,
    ) {
        let outcome = match result {
            Ok(()) => CallOutcome::Completed,
            Err(LifecycleError::DeadlineExceeded { .. }) => CallOutcome::DeadlineExceeded,
            Err(e @ LifecycleError::OperationFailed { .. }) => CallOutcome::Failed(e.to_string()),
        };

        if outcome != CallOutcome::Completed {
            self.status.record_failure();
        }

        self.calls.push(CallRecord {
            service: service.to_string(),
            phase,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Names of services that received a call in `phase`, in call order
    pub fn services_called(&self, phase: Phase) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|call| call.phase == phase)
            .map(|call| call.service.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CallRecord> {
        self.calls
            .iter()
            .filter(|call| call.outcome != CallOutcome::Completed)
    }
}

impl Default for LifecycleReport {
    fn default() -> Self {
        Self::new()
    }
}
