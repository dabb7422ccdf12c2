use crate::app::Phase;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StartStopError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("System error: {message}")]
    System { message: String },
}

impl StartStopError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Failure of a single bounded start/stop call as seen by the orchestrator
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("deadline of {deadline:?} exceeded during {phase} of service {service}")]
    DeadlineExceeded {
        service: String,
        phase: Phase,
        deadline: Duration,
    },

    #[error("service {service} failed during {phase}: {cause}")]
    OperationFailed {
        service: String,
        phase: Phase,
        #[source]
        cause: ServiceError,
    },
}

impl LifecycleError {
    pub fn deadline_exceeded<S: Into<String>>(service: S, phase: Phase, deadline: Duration) -> Self {
        Self::DeadlineExceeded {
            service: service.into(),
            phase,
            deadline,
        }
    }

    pub fn operation_failed<S: Into<String>>(service: S, phase: Phase, cause: ServiceError) -> Self {
        Self::OperationFailed {
            service: service.into(),
            phase,
            cause,
        }
    }

    /// Name of the service the failed call was issued to
    pub fn service(&self) -> &str {
        match self {
            Self::DeadlineExceeded { service, .. } | Self::OperationFailed { service, .. } => {
                service
            }
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::DeadlineExceeded { phase, .. } | Self::OperationFailed { phase, .. } => *phase,
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}

/// Failure reason reported by a service implementation
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Failed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StartStopError>;
