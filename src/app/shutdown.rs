use super::invoker::invoke;
use super::{ComponentState, LifecyclePhase, Phase, ServiceOrchestrator, ShutdownReason};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

impl ServiceOrchestrator {
    /// Perform graceful shutdown of all running services, returning the exit code
    pub async fn shutdown(&mut self) -> i32 {
        info!("Beginning graceful shutdown");
        self.phase = LifecyclePhase::ShuttingDown;

        self.stop_running().await;

        self.phase = LifecyclePhase::Finished;
        self.report.finish();

        let exit_code = self.report.exit_code();
        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }

    /// Undo a partial startup. Only services that reached `Running` are stopped.
    pub(super) async fn rollback(&mut self) {
        warn!(
            "Startup aborted, rolling back {} started services",
            self.running_count()
        );
        self.report.shutdown_reason = Some(ShutdownReason::StartupFailed);

        self.stop_running().await;

        self.report.finish();
        info!(
            "Rollback completed with exit code: {}",
            self.report.exit_code()
        );
    }

    /// Stop every running service in reverse declaration order. Never short-circuits.
    async fn stop_running(&mut self) {
        let deadline = self.lifecycle.stop_timeout();

        for index in (0..self.services.len()).rev() {
            if self.services[index].state != ComponentState::Running {
                continue;
            }
            self.stop_component(index, deadline).await;
        }
    }

    /// Stop a specific component, logging rather than propagating failure
    async fn stop_component(&mut self, index: usize, deadline: Duration) {
        let service = Arc::clone(&self.services[index].service);
        let name = service.name().to_string();

        info!("Stopping {} component", name);
        self.set_component_state(index, ComponentState::Stopping);

        let began = Instant::now();
        let result = invoke(service, Phase::Stop, deadline).await;
        self.report.record(&name, Phase::Stop, &result, began.elapsed());

        match result {
            Ok(()) => {
                self.set_component_state(index, ComponentState::Stopped);
                info!("{} component stopped", name);
            }
            Err(e) => {
                self.set_component_state(index, ComponentState::Failed);
                error!("Can't stop service: {}", e);
            }
        }
    }
}
