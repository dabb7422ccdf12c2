use super::report::LifecycleReport;
use super::runtime::ShutdownTrigger;
use super::types::{ComponentState, LifecyclePhase, ShutdownReason};
use crate::config::{LifecycleConfig, StartStopConfig};
use crate::error::Result;
use crate::mock::MockService;
use crate::service::Service;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// A service in the managed list together with the orchestrator's view of it
pub(super) struct ManagedService {
    pub(super) service: Arc<dyn Service>,
    pub(super) state: ComponentState,
}

impl ManagedService {
    pub(super) fn name(&self) -> &str {
        self.service.name()
    }
}

/// Drives an ordered list of services through one start, run, stop cycle
pub struct ServiceOrchestrator {
    pub(super) lifecycle: LifecycleConfig,

    // Declaration order is start order; stop order is its reverse
    pub(super) services: Vec<ManagedService>,

    pub(super) phase: LifecyclePhase,
    pub(super) report: LifecycleReport,

    pub(super) shutdown_trigger: ShutdownTrigger,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
}

impl ServiceOrchestrator {
    /// Create an orchestrator managing the simulated services described in `config`
    pub fn new(config: StartStopConfig) -> Result<Self> {
        config.validate()?;

        let services = config
            .services
            .iter()
            .map(|service| Arc::new(MockService::from_config(service)) as Arc<dyn Service>)
            .collect();

        Ok(Self::with_services(config.lifecycle, services))
    }

    /// Create an orchestrator over an arbitrary ordered list of services
    pub fn with_services(lifecycle: LifecycleConfig, services: Vec<Arc<dyn Service>>) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        info!(
            "Managing {} services (start timeout {:?}, stop timeout {:?})",
            services.len(),
            lifecycle.start_timeout(),
            lifecycle.stop_timeout()
        );

        Self {
            lifecycle,
            services: services
                .into_iter()
                .map(|service| ManagedService {
                    service,
                    state: ComponentState::NotStarted,
                })
                .collect(),
            phase: LifecyclePhase::Idle,
            report: LifecycleReport::new(),
            shutdown_trigger: ShutdownTrigger::new(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
        }
    }

    /// Handle that ends the running phase when fired
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown_trigger.clone()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Report of everything that happened so far in this run
    pub fn report(&self) -> &LifecycleReport {
        &self.report
    }

    /// Consume the orchestrator, returning the final report
    pub fn into_report(mut self) -> LifecycleReport {
        if self.report.finished_at.is_none() {
            self.report.finish();
        }
        self.report
    }
}
