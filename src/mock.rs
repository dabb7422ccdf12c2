use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::service::{CallContext, Service};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Simulated service whose start and stop take a configurable amount of time.
///
/// Tracks whether it is running so that `stop` on a service that never
/// started is a no-op. Failures can be injected per phase. A cooperative
/// mock gives up as soon as its call context is cancelled; a
/// non-cooperative one keeps going and may mark itself running after the
/// orchestrator has already moved on.
pub struct MockService {
    name: String,
    start_delay: Duration,
    stop_delay: Duration,
    fail_start: bool,
    fail_stop: bool,
    cooperative: bool,
    running: Mutex<bool>,
}

impl MockService {
    /// Create a mock that stops one second slower than it starts
    pub fn new(name: impl Into<String>, start_delay: Duration) -> Self {
        Self {
            name: name.into(),
            start_delay,
            stop_delay: start_delay + Duration::from_secs(1),
            fail_start: false,
            fail_stop: false,
            cooperative: true,
            running: Mutex::new(false),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            name: config.name.clone(),
            start_delay: Duration::from_millis(config.start_delay_ms),
            stop_delay: Duration::from_millis(config.effective_stop_delay_ms()),
            fail_start: config.fail_start,
            fail_stop: config.fail_stop,
            cooperative: config.cooperative,
            running: Mutex::new(false),
        }
    }

    pub fn with_stop_delay(mut self, stop_delay: Duration) -> Self {
        self.stop_delay = stop_delay;
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn with_stop_failure(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn uncooperative(mut self) -> Self {
        self.cooperative = false;
        self
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    async fn simulate_work(&self, delay: Duration, ctx: &CallContext) -> Result<(), ServiceError> {
        if !self.cooperative {
            sleep(delay).await;
            return Ok(());
        }

        tokio::select! {
            _ = sleep(delay) => Ok(()),
            _ = ctx.cancelled() => {
                warn!("Service {} abandoned its work after cancellation", self.name);
                Err(ServiceError::Cancelled)
            }
        }
    }
}

#[async_trait::async_trait]
impl Service for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CallContext) -> Result<(), ServiceError> {
        info!("Starting service {}...", self.name);
        self.simulate_work(self.start_delay, &ctx).await?;

        if self.fail_start {
            return Err(ServiceError::failed(format!(
                "service {} refused to start",
                self.name
            )));
        }

        *self.running.lock() = true;
        Ok(())
    }

    async fn stop(&self, ctx: CallContext) -> Result<(), ServiceError> {
        if !self.is_running() {
            debug!("Service {} was never started, nothing to stop", self.name);
            return Ok(());
        }

        info!("Stopping service {}...", self.name);
        self.simulate_work(self.stop_delay, &ctx).await?;

        if self.fail_stop {
            return Err(ServiceError::failed(format!(
                "service {} refused to stop",
                self.name
            )));
        }

        *self.running.lock() = false;
        Ok(())
    }
}
