use super::Phase;
use crate::error::{LifecycleError, ServiceError};
use crate::service::{CallContext, Service};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Run one `start` or `stop` call on its own task and wait for it at most
/// `deadline`.
///
/// The deadline is measured from the moment this function is entered. When
/// it elapses the call context is cancelled and the task is detached, not
/// aborted: the operation may still finish in the background and its result
/// is dropped.
pub async fn invoke(
    service: Arc<dyn Service>,
    phase: Phase,
    deadline: Duration,
) -> Result<(), LifecycleError> {
    let ctx = CallContext::new(deadline);
    let name = service.name().to_string();

    let task_ctx = ctx.clone();
    let handle = tokio::spawn(async move {
        match phase {
            Phase::Start => service.start(task_ctx).await,
            Phase::Stop => service.stop(task_ctx).await,
        }
    });

    match timeout(deadline, handle).await {
        Ok(Ok(Ok(()))) => {
            debug!("{} of service {} completed", phase, name);
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(LifecycleError::operation_failed(name, phase, e)),
        Ok(Err(join_error)) => Err(LifecycleError::operation_failed(
            name,
            phase,
            ServiceError::failed(format!("task ended abnormally: {}", join_error)),
        )),
        Err(_) => {
            ctx.cancel();
            warn!(
                "{} of service {} still outstanding after {:?}, abandoning it",
                phase, name, deadline
            );
            Err(LifecycleError::deadline_exceeded(name, phase, deadline))
        }
    }
}
