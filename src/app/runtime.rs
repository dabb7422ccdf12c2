use super::{LifecyclePhase, ServiceOrchestrator, ShutdownReason};
use crate::error::{Result, StartStopError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Delivers the termination notification to a running orchestrator.
///
/// Clones share one underlying channel, so only the first `trigger` call
/// across all clones has any effect.
#[derive(Clone)]
pub struct ShutdownTrigger {
    sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
}

impl ShutdownTrigger {
    pub(super) fn new(sender: oneshot::Sender<ShutdownReason>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Returns true if this call delivered the notification
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl ServiceOrchestrator {
    /// Full lifecycle: start everything, wait for the termination signal,
    /// then stop everything. Returns the process exit code.
    ///
    /// A failed startup has already been rolled back by the time this
    /// returns, and the termination signal is not awaited in that case.
    pub async fn execute(&mut self) -> Result<i32> {
        match self.start().await {
            Ok(()) => self.run().await,
            Err(StartStopError::Lifecycle(e)) => {
                error!("Startup aborted: {}", e);
                Ok(self.report.exit_code())
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for the termination signal and then shut down
    pub async fn run(&mut self) -> Result<i32> {
        match self.phase {
            LifecyclePhase::Started => {}
            LifecyclePhase::Failed => {
                info!("Startup failed, not waiting for termination signal");
                return Ok(self.report.exit_code());
            }
            other => {
                return Err(StartStopError::system(format!(
                    "Cannot run from phase {:?}",
                    other
                )));
            }
        }

        info!("All services running, waiting for termination signal");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| StartStopError::system("Shutdown receiver already taken"))?;

        let shutdown_reason = match shutdown_receiver.await {
            Ok(reason) => reason,
            Err(_) => {
                warn!("Shutdown channel closed unexpectedly, shutting down");
                ShutdownReason::Error("shutdown channel closed".to_string())
            }
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);
        self.report.shutdown_reason = Some(shutdown_reason);

        Ok(self.shutdown().await)
    }

    /// Route SIGINT and SIGTERM to the shutdown trigger.
    ///
    /// Handlers are registered before this returns, so a signal that arrives
    /// during startup is held until startup has finished.
    pub fn install_signal_handlers(&self) -> Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            let trigger = self.shutdown_trigger();
            tokio::spawn(async move {
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    trigger.trigger(ShutdownReason::Signal("SIGTERM".to_string()));
                }
            });

            let trigger = self.shutdown_trigger();
            tokio::spawn(async move {
                if sigint.recv().await.is_some() {
                    info!("Received SIGINT signal (Ctrl+C)");
                    trigger.trigger(ShutdownReason::Signal("SIGINT".to_string()));
                }
            });
        }

        #[cfg(not(unix))]
        {
            let trigger = self.shutdown_trigger();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Received Ctrl+C");
                        trigger.trigger(ShutdownReason::Signal("SIGINT".to_string()));
                    }
                    Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                }
            });
        }

        Ok(())
    }
}
