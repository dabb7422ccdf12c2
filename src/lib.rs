pub mod app;
pub mod config;
pub mod error;
pub mod mock;
pub mod service;

pub use app::{
    CallOutcome, CallRecord, ComponentState, LifecyclePhase, LifecycleReport, Phase, RunStatus,
    ServiceOrchestrator, ShutdownReason, ShutdownTrigger,
};
pub use config::{LifecycleConfig, LoggingConfig, ServiceConfig, StartStopConfig};
pub use error::{LifecycleError, Result, ServiceError, StartStopError};
pub use mock::MockService;
pub use service::{CallContext, Service};
