use super::invoker::invoke;
use super::{ComponentState, LifecyclePhase, Phase, ServiceOrchestrator};
use crate::error::{Result, StartStopError};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};

impl ServiceOrchestrator {
    /// Start all services in declaration order.
    ///
    /// Stops at the first service that fails or misses the start deadline,
    /// rolls back every service already running in reverse order, and
    /// returns that service's error. Later services are never started.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase != LifecyclePhase::Idle {
            return Err(StartStopError::system(format!(
                "Services can only be started once (current phase: {:?})",
                self.phase
            )));
        }

        info!(
            "Starting {} services (run {})",
            self.services.len(),
            self.report.run_id
        );
        self.phase = LifecyclePhase::Starting;
        let deadline = self.lifecycle.start_timeout();

        for index in 0..self.services.len() {
            let service = Arc::clone(&self.services[index].service);
            let name = service.name().to_string();
            self.set_component_state(index, ComponentState::Starting);

            let began = Instant::now();
            let result = invoke(service, Phase::Start, deadline).await;
            self.report
                .record(&name, Phase::Start, &result, began.elapsed());

            if let Err(e) = result {
                self.set_component_state(index, ComponentState::Failed);
                error!("Can't start service: {}", e);
                self.phase = LifecyclePhase::Failed;
                self.rollback().await;
                return Err(e.into());
            }

            self.set_component_state(index, ComponentState::Running);
            info!("Service {} started", name);
        }

        self.phase = LifecyclePhase::Started;
        info!("All services started successfully");
        Ok(())
    }
}
