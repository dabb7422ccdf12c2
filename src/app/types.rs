use serde::Serialize;
use std::fmt;

/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
    StartupFailed,
}

/// Which capability operation a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::Stop => f.write_str("stop"),
        }
    }
}

/// Where the orchestrator is in its single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecyclePhase {
    Idle,
    Starting,
    Started,
    Failed,
    ShuttingDown,
    Finished,
}

/// Aggregated outcome of the run. Once `Failed`, it stays `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Ok,
    Failed,
}

impl RunStatus {
    pub fn record_failure(&mut self) {
        *self = RunStatus::Failed;
    }

    pub fn is_failed(&self) -> bool {
        *self == RunStatus::Failed
    }

    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::Failed => 1,
        }
    }
}
