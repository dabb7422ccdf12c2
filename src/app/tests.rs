use super::*;
use crate::config::{LifecycleConfig, ServiceConfig, StartStopConfig};
use crate::error::{LifecycleError, ServiceError, StartStopError};
use crate::mock::MockService;
use crate::service::{CallContext, Service};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

type Journal = Arc<Mutex<Vec<String>>>;

/// Service that writes every call it receives into a shared journal
struct ProbeService {
    name: String,
    start_delay: Duration,
    stop_delay: Duration,
    fail_start: bool,
    fail_stop: bool,
    running: Mutex<bool>,
    journal: Journal,
}

impl ProbeService {
    fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            start_delay: Duration::from_millis(10),
            stop_delay: Duration::from_millis(10),
            fail_start: false,
            fail_stop: false,
            running: Mutex::new(false),
            journal: Arc::clone(journal),
        }
    }

    fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    fn boxed(self) -> Arc<dyn Service> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl Service for ProbeService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, _ctx: CallContext) -> Result<(), ServiceError> {
        self.journal.lock().push(format!("start:{}", self.name));
        sleep(self.start_delay).await;
        if self.fail_start {
            return Err(ServiceError::failed("boom"));
        }
        *self.running.lock() = true;
        Ok(())
    }

    async fn stop(&self, _ctx: CallContext) -> Result<(), ServiceError> {
        self.journal.lock().push(format!("stop:{}", self.name));
        if !*self.running.lock() {
            return Ok(());
        }
        sleep(self.stop_delay).await;
        if self.fail_stop {
            return Err(ServiceError::failed("stuck"));
        }
        *self.running.lock() = false;
        Ok(())
    }
}

fn lifecycle(start_ms: u64, stop_ms: u64) -> LifecycleConfig {
    LifecycleConfig {
        start_timeout_ms: start_ms,
        stop_timeout_ms: stop_ms,
    }
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

#[tokio::test(start_paused = true)]
async fn test_clean_run_stops_in_reverse_order() {
    let journal = Journal::default();
    let services = ["A", "B", "C"]
        .iter()
        .map(|name| ProbeService::new(name, &journal).boxed())
        .collect();
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.phase(), LifecyclePhase::Started);
    assert_eq!(orchestrator.running_count(), 3);

    orchestrator
        .shutdown_trigger()
        .trigger(ShutdownReason::UserRequest);
    let exit_code = orchestrator.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(
        entries(&journal),
        vec!["start:A", "start:B", "start:C", "stop:C", "stop:B", "stop:A"]
    );
    assert_eq!(orchestrator.phase(), LifecyclePhase::Finished);

    let report = orchestrator.into_report();
    assert_eq!(report.services_called(Phase::Stop), vec!["C", "B", "A"]);
    assert_eq!(report.shutdown_reason, Some(ShutdownReason::UserRequest));
    assert_eq!(report.status, RunStatus::Ok);
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_rolls_back_started_services_only() {
    let journal = Journal::default();
    let services = vec![
        ProbeService::new("A", &journal).boxed(),
        ProbeService::new("B", &journal).boxed(),
        ProbeService::new("C", &journal).failing_start().boxed(),
        ProbeService::new("D", &journal).boxed(),
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    let err = orchestrator.start().await.unwrap_err();
    assert!(matches!(
        err,
        StartStopError::Lifecycle(LifecycleError::OperationFailed { ref service, .. }) if service == "C"
    ));

    assert_eq!(
        entries(&journal),
        vec!["start:A", "start:B", "start:C", "stop:B", "stop:A"]
    );
    assert_eq!(orchestrator.phase(), LifecyclePhase::Failed);
    assert_eq!(
        orchestrator.get_component_state("C"),
        Some(ComponentState::Failed)
    );
    assert_eq!(
        orchestrator.get_component_state("D"),
        Some(ComponentState::NotStarted)
    );
    assert_eq!(orchestrator.report().exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_never_waits_for_termination_signal() {
    let journal = Journal::default();
    let services = vec![
        ProbeService::new("A", &journal).boxed(),
        ProbeService::new("B", &journal).failing_start().boxed(),
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);
    let trigger = orchestrator.shutdown_trigger();

    let exit_code = timeout(Duration::from_secs(60), orchestrator.execute())
        .await
        .expect("execute must not wait for a signal after a failed startup")
        .unwrap();

    assert_eq!(exit_code, 1);
    assert!(!trigger.is_triggered());
    assert_eq!(entries(&journal), vec!["start:A", "start:B", "stop:A"]);

    // A second run() after the failure returns immediately as well
    assert_eq!(orchestrator.run().await.unwrap(), 1);
    assert_eq!(
        orchestrator.report().shutdown_reason,
        Some(ShutdownReason::StartupFailed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_deadline_triggers_rollback() {
    let journal = Journal::default();
    let services = vec![
        ProbeService::new("A", &journal)
            .start_delay(Duration::from_secs(1))
            .boxed(),
        ProbeService::new("B", &journal)
            .start_delay(Duration::from_secs(1))
            .boxed(),
        ProbeService::new("C", &journal)
            .start_delay(Duration::from_secs(3))
            .boxed(),
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 5000), services);

    let began = Instant::now();
    let exit_code = orchestrator.execute().await.unwrap();

    assert_eq!(exit_code, 1);
    // A and B take 1s each, C is abandoned at its 2s deadline, B and A stop in 10ms each
    assert_eq!(began.elapsed(), Duration::from_millis(4020));
    assert_eq!(
        entries(&journal),
        vec!["start:A", "start:B", "start:C", "stop:B", "stop:A"]
    );

    let report = orchestrator.into_report();
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.service, "C");
    assert_eq!(failure.outcome, CallOutcome::DeadlineExceeded);
    assert_eq!(failure.elapsed_ms, 2000);
}

#[tokio::test(start_paused = true)]
async fn test_each_call_gets_a_fresh_deadline() {
    let journal = Journal::default();
    let services = ["A", "B", "C"]
        .iter()
        .map(|name| {
            ProbeService::new(name, &journal)
                .start_delay(Duration::from_millis(1500))
                .stop_delay(Duration::from_millis(1500))
                .boxed()
        })
        .collect();
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.shutdown().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_failure_does_not_skip_remaining_services() {
    let journal = Journal::default();
    let services = vec![
        ProbeService::new("A", &journal).boxed(),
        ProbeService::new("B", &journal).failing_stop().boxed(),
        ProbeService::new("C", &journal)
            .stop_delay(Duration::from_secs(10))
            .boxed(),
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    orchestrator.start().await.unwrap();
    let exit_code = orchestrator.shutdown().await;

    assert_eq!(exit_code, 1);
    assert_eq!(
        entries(&journal),
        vec!["start:A", "start:B", "start:C", "stop:C", "stop:B", "stop:A"]
    );
    assert_eq!(
        orchestrator.get_all_component_states(),
        vec![
            ("A".to_string(), ComponentState::Stopped),
            ("B".to_string(), ComponentState::Failed),
            ("C".to_string(), ComponentState::Failed),
        ]
    );

    let report = orchestrator.into_report();
    let failed: Vec<_> = report.failures().map(|call| call.service.as_str()).collect();
    assert_eq!(failed, vec!["C", "B"]);
}

#[tokio::test(start_paused = true)]
async fn test_signal_during_startup_is_held_until_startup_completes() {
    let journal = Journal::default();
    let services = vec![
        ProbeService::new("A", &journal)
            .start_delay(Duration::from_secs(1))
            .boxed(),
        ProbeService::new("B", &journal)
            .start_delay(Duration::from_secs(1))
            .boxed(),
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    let trigger = orchestrator.shutdown_trigger();
    tokio::spawn(async move {
        sleep(Duration::from_millis(500)).await;
        trigger.trigger(ShutdownReason::Signal("SIGTERM".to_string()));
    });

    let exit_code = orchestrator.execute().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(
        entries(&journal),
        vec!["start:A", "start:B", "stop:B", "stop:A"]
    );
    assert_eq!(
        orchestrator.report().shutdown_reason,
        Some(ShutdownReason::Signal("SIGTERM".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_waits_for_trigger() {
    let journal = Journal::default();
    let services = vec![ProbeService::new("A", &journal).boxed()];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);
    orchestrator.start().await.unwrap();

    let trigger = orchestrator.shutdown_trigger();
    tokio::spawn(async move {
        sleep(Duration::from_secs(30)).await;
        trigger.trigger(ShutdownReason::UserRequest);
    });

    let began = Instant::now();
    assert_eq!(orchestrator.run().await.unwrap(), 0);
    assert!(began.elapsed() >= Duration::from_secs(30));
    assert_eq!(entries(&journal), vec!["start:A", "stop:A"]);
}

#[tokio::test]
async fn test_start_can_only_run_once() {
    let journal = Journal::default();
    let services = vec![ProbeService::new("A", &journal).boxed()];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    orchestrator.start().await.unwrap();
    let err = orchestrator.start().await.unwrap_err();

    assert!(matches!(err, StartStopError::System { .. }));
    assert_eq!(entries(&journal), vec!["start:A"]);
}

#[tokio::test]
async fn test_run_before_start_is_rejected() {
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), Vec::new());

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, StartStopError::System { .. }));
}

#[tokio::test]
async fn test_empty_service_list() {
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), Vec::new());
    orchestrator
        .shutdown_trigger()
        .trigger(ShutdownReason::UserRequest);

    assert_eq!(orchestrator.execute().await.unwrap(), 0);
    assert!(orchestrator.report().calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_uncooperative_start_may_finish_after_deadline() {
    let slow = Arc::new(MockService::new("C", Duration::from_secs(3)).uncooperative());
    let services: Vec<Arc<dyn Service>> = vec![
        Arc::new(
            MockService::new("A", Duration::from_secs(1))
                .with_stop_delay(Duration::from_millis(100)),
        ),
        Arc::clone(&slow) as Arc<dyn Service>,
    ];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 5000), services);

    assert!(orchestrator.start().await.is_err());
    assert!(!slow.is_running());

    // The abandoned start completes on its own and the orchestrator never stops it
    sleep(Duration::from_secs(5)).await;
    assert!(slow.is_running());
    assert_eq!(
        orchestrator.get_component_state("C"),
        Some(ComponentState::Failed)
    );
    assert_eq!(orchestrator.report().services_called(Phase::Stop), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_cooperative_start_is_cancelled_at_deadline() {
    let slow = Arc::new(MockService::new("C", Duration::from_secs(3)));
    let services: Vec<Arc<dyn Service>> = vec![Arc::clone(&slow) as Arc<dyn Service>];
    let mut orchestrator = ServiceOrchestrator::with_services(lifecycle(2000, 2000), services);

    assert!(orchestrator.start().await.is_err());

    sleep(Duration::from_secs(5)).await;
    assert!(!slow.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_orchestrator_from_config() {
    let mut config = StartStopConfig::default();
    config.services = vec![
        ServiceConfig::new("A", 1000),
        ServiceConfig::new("B", 2000),
        ServiceConfig::new("C", 1000),
    ];

    config.lifecycle.stop_timeout_ms = 2500;

    let mut orchestrator = ServiceOrchestrator::new(config).unwrap();
    orchestrator
        .shutdown_trigger()
        .trigger(ShutdownReason::UserRequest);

    // Stop delays default to start + 1s: C and A need 2s, B needs 3s and misses the deadline
    let exit_code = orchestrator.execute().await.unwrap();
    let report = orchestrator.into_report();

    assert_eq!(report.services_called(Phase::Start), vec!["A", "B", "C"]);
    assert_eq!(report.services_called(Phase::Stop), vec!["C", "B", "A"]);
    assert_eq!(exit_code, 1);
    let failed: Vec<_> = report.failures().map(|call| call.service.as_str()).collect();
    assert_eq!(failed, vec!["B"]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = StartStopConfig::default();
    config.services.push(ServiceConfig::new("A", 0));

    assert!(matches!(
        ServiceOrchestrator::new(config),
        Err(StartStopError::Config(_))
    ));
}
