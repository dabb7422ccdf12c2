//! Service lifecycle orchestration.
//!
//! ```text
//! start():    A.start → B.start → C.start      (first failure: rollback, run ends)
//! run():      wait for SIGINT / SIGTERM / ShutdownTrigger
//! shutdown(): C.stop → B.stop → A.stop         (failures logged, never short-circuit)
//! ```
//!
//! Every call is bounded by its own deadline, see [`invoker::invoke`].

pub mod invoker;

mod orchestrator;
mod report;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::ServiceOrchestrator;
pub use report::{CallOutcome, CallRecord, LifecycleReport};
pub use runtime::ShutdownTrigger;
pub use types::{ComponentState, LifecyclePhase, Phase, RunStatus, ShutdownReason};
