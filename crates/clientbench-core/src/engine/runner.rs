use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::engine::aggregator::summarize;
use crate::engine::recorder::{record_attempt, AttemptTiming};
use crate::engine::sampler::ResourceSampler;
use crate::engine::{RunEvent, RunState};
use crate::error::BenchError;
use crate::results::{AttemptRecord, StrategySummary};
use crate::strategy::{AsyncClient, BlockingClient, ClientStrategy, SendParams};
use crate::workload::{Next, WorkloadScope, WorkloadSource};

// ---------------------------------------------------------------------------
// Event emission
// ---------------------------------------------------------------------------

/// Publishes [`RunEvent`]s when a channel is attached. Send failures (a
/// dropped receiver) are ignored.
#[derive(Clone)]
struct Emitter {
    strategy: String,
    tx: Option<mpsc::Sender<RunEvent>>,
}

impl Emitter {
    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }

    /// Only valid off the async runtime (inside `spawn_blocking`).
    fn emit_blocking(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.blocking_send(event);
        }
    }

    fn attempt(&self, index: u64, record: &AttemptRecord) -> RunEvent {
        RunEvent::Attempt {
            strategy: self.strategy.clone(),
            index,
            record: record.clone(),
        }
    }
}

fn log_attempt(strategy: &str, index: u64, record: &AttemptRecord) {
    if record.succeeded {
        tracing::debug!(
            strategy,
            index,
            status = ?record.status_code,
            total_ms = record.total_duration_ms,
            "attempt succeeded"
        );
    } else {
        tracing::warn!(
            strategy,
            index,
            status = ?record.status_code,
            error = record.error_message.as_deref().unwrap_or(""),
            "attempt failed"
        );
    }
}

/// A panicking send becomes a failed attempt instead of unwinding out of
/// the run.
fn send_panicked(payload: Box<dyn Any + Send>) -> BenchError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    BenchError::Internal(format!("send panicked: {message}"))
}

// ---------------------------------------------------------------------------
// BenchmarkRunner
// ---------------------------------------------------------------------------

/// Drives one strategy through a sequential workload and summarizes it.
///
/// A runner executes exactly one run: [`run`](Self::run) consumes it. Nothing
/// escapes a run; a summary with `total_count == 0` means the strategy could
/// not be set up.
pub struct BenchmarkRunner {
    source: Arc<dyn WorkloadSource>,
    pacing: Duration,
    events: Option<mpsc::Sender<RunEvent>>,
    sampler: ResourceSampler,
    state: RunState,
}

impl BenchmarkRunner {
    pub fn new(source: Arc<dyn WorkloadSource>) -> Self {
        Self {
            source,
            pacing: Duration::ZERO,
            events: None,
            sampler: ResourceSampler::new(),
            state: RunState::Idle,
        }
    }

    /// Delay inserted between consecutive attempts.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Publish progress on `tx`. The receiver must be drained, since sends
    /// wait for channel capacity.
    pub fn events(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub async fn run(
        mut self,
        strategy: ClientStrategy,
        operation_count: u64,
        params: SendParams,
    ) -> StrategySummary {
        let emitter = Emitter {
            strategy: strategy.name().to_string(),
            tx: self.events.clone(),
        };
        tracing::info!(
            strategy = strategy.name(),
            model = %strategy.execution_model(),
            operations = operation_count,
            workload = %self.source.describe(),
            "starting benchmark run"
        );

        self.sampler.start();
        self.transition(&emitter, RunState::ResourceOpen).await;

        let attempts = match &strategy {
            ClientStrategy::Suspending(client) => {
                self.run_suspending(&emitter, client.clone(), operation_count, &params)
                    .await
            }
            ClientStrategy::Blocking(client) => {
                self.run_blocking(&emitter, client.clone(), operation_count, params)
                    .await
            }
        };

        // Setup failures already closed the window; the sampler then hands
        // back its frozen snapshot.
        let resources = if self.sampler.is_open() {
            self.sampler.stop()
        } else {
            self.sampler.snapshot()
        };
        let workflow = summarize(&attempts, &resources);
        self.transition(&emitter, RunState::Complete).await;

        tracing::info!(
            strategy = strategy.name(),
            attempts = workflow.total_count,
            successful = workflow.successful_count,
            success_rate = workflow.success_rate_percent,
            avg_total_s = workflow.total.avg_s,
            "benchmark run finished"
        );
        emitter
            .emit(RunEvent::Finished {
                strategy: strategy.name().to_string(),
                workflow: workflow.clone(),
            })
            .await;

        StrategySummary {
            name: strategy.name().to_string(),
            version: strategy.version(),
            execution_model: strategy.execution_model(),
            attempts,
            workflow,
            resources,
        }
    }

    async fn transition(&mut self, emitter: &Emitter, state: RunState) {
        tracing::debug!(strategy = %emitter.strategy, from = %self.state, to = %state, "run state change");
        self.state = state;
        emitter
            .emit(RunEvent::StateChange {
                strategy: emitter.strategy.clone(),
                state,
            })
            .await;
    }

    /// Close the sampler window after a fatal setup error.
    fn abort_setup(&mut self) {
        self.sampler.stop();
    }

    async fn run_suspending(
        &mut self,
        emitter: &Emitter,
        client: Arc<dyn AsyncClient>,
        operation_count: u64,
        params: &SendParams,
    ) -> Vec<AttemptRecord> {
        let name = client.name().to_string();

        let session = match client.prepare_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(strategy = %name, error = %e, "session setup failed, skipping run");
                self.abort_setup();
                return Vec::new();
            }
        };
        self.transition(emitter, RunState::SessionOpen).await;

        let mut scope = match self.source.open_scope(&name).await {
            Ok(scope) => scope,
            Err(e) => {
                tracing::error!(strategy = %name, error = %e, "workload scope failed to open, skipping run");
                self.abort_setup();
                self.transition(emitter, RunState::Teardown).await;
                client.teardown_session(session).await;
                return Vec::new();
            }
        };
        self.transition(emitter, RunState::Iterating).await;

        let mut attempts = Vec::new();
        for index in 0..operation_count {
            let started = Instant::now();
            let next = scope.next().await;
            let fetched = Instant::now();

            let record = match next {
                Ok(Next::Exhausted) => {
                    tracing::info!(strategy = %name, completed = index, "workload exhausted");
                    break;
                }
                Ok(Next::Unit(unit)) => {
                    let outcome = AssertUnwindSafe(session.send(&unit, params))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| Err(send_panicked(payload)));
                    let finished = Instant::now();
                    record_attempt(AttemptTiming { started, fetched, finished }, outcome)
                }
                Err(e) => record_attempt(AttemptTiming::fetch_only(started, fetched), Err(e)),
            };

            log_attempt(&name, index, &record);
            emitter.emit(emitter.attempt(index, &record)).await;
            attempts.push(record);

            if !self.pacing.is_zero() && index + 1 < operation_count {
                tokio::time::sleep(self.pacing).await;
            }
        }

        self.sampler.stop();
        self.transition(emitter, RunState::Teardown).await;
        scope.close().await;
        client.teardown_session(session).await;
        attempts
    }

    async fn run_blocking(
        &mut self,
        emitter: &Emitter,
        client: Arc<dyn BlockingClient>,
        operation_count: u64,
        params: SendParams,
    ) -> Vec<AttemptRecord> {
        let name = client.name().to_string();

        let scope = match self.source.open_scope(&name).await {
            Ok(scope) => scope,
            Err(e) => {
                tracing::error!(strategy = %name, error = %e, "workload scope failed to open, skipping run");
                self.abort_setup();
                return Vec::new();
            }
        };
        self.transition(emitter, RunState::Iterating).await;

        let handle = Handle::current();
        let pacing = self.pacing;
        let thread_emitter = emitter.clone();
        let joined = tokio::task::spawn_blocking(move || {
            blocking_loop(
                &handle,
                &thread_emitter,
                client.as_ref(),
                scope,
                operation_count,
                &params,
                pacing,
            )
        })
        .await;

        match joined {
            Ok((scope, attempts)) => {
                self.sampler.stop();
                self.transition(emitter, RunState::Teardown).await;
                scope.close().await;
                attempts
            }
            Err(e) => {
                // Only a panicking workload fetch gets here; sends are caught
                // per attempt. The scope went down with the worker.
                tracing::error!(strategy = %name, error = %e, "blocking worker did not complete");
                self.sampler.stop();
                self.transition(emitter, RunState::Teardown).await;
                Vec::new()
            }
        }
    }
}

/// The iteration loop for blocking strategies. Runs on a dedicated blocking
/// thread; workload fetches are driven on the runtime through `handle`.
fn blocking_loop(
    handle: &Handle,
    emitter: &Emitter,
    client: &dyn BlockingClient,
    mut scope: Box<dyn WorkloadScope>,
    operation_count: u64,
    params: &SendParams,
    pacing: Duration,
) -> (Box<dyn WorkloadScope>, Vec<AttemptRecord>) {
    let name = client.name();
    let mut attempts = Vec::new();

    for index in 0..operation_count {
        let started = Instant::now();
        let next = handle.block_on(scope.next());
        let fetched = Instant::now();

        let record = match next {
            Ok(Next::Exhausted) => {
                tracing::info!(strategy = name, completed = index, "workload exhausted");
                break;
            }
            Ok(Next::Unit(unit)) => {
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| client.send(&unit, params)))
                        .unwrap_or_else(|payload| Err(send_panicked(payload)));
                let finished = Instant::now();
                record_attempt(AttemptTiming { started, fetched, finished }, outcome)
            }
            Err(e) => record_attempt(AttemptTiming::fetch_only(started, fetched), Err(e)),
        };

        log_attempt(name, index, &record);
        emitter.emit_blocking(emitter.attempt(index, &record));
        attempts.push(record);

        if !pacing.is_zero() && index + 1 < operation_count {
            std::thread::sleep(pacing);
        }
    }

    (scope, attempts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::strategy::{AsyncSession, ExecutionModel, SendOutcome};
    use crate::workload::{MemoryWorkload, WorkloadUnit};

    // -----------------------------------------------------------------------
    // Mock strategies and sources
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct Counters {
        prepared: AtomicUsize,
        closed: AtomicUsize,
        sent: AtomicUsize,
    }

    struct MockAsync {
        counters: Arc<Counters>,
        fail_prepare: bool,
        fail_sends: bool,
        panic_sends: bool,
    }

    impl MockAsync {
        fn new(counters: Arc<Counters>) -> Self {
            Self {
                counters,
                fail_prepare: false,
                fail_sends: false,
                panic_sends: false,
            }
        }
    }

    struct MockSession {
        counters: Arc<Counters>,
        fail_sends: bool,
        panic_sends: bool,
    }

    #[async_trait]
    impl AsyncClient for MockAsync {
        fn name(&self) -> &str {
            "mock-async"
        }

        fn version(&self) -> String {
            "0.1".to_string()
        }

        async fn prepare_session(&self) -> Result<Box<dyn AsyncSession>, BenchError> {
            if self.fail_prepare {
                return Err(BenchError::Session("refused".to_string()));
            }
            self.counters.prepared.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockSession {
                counters: self.counters.clone(),
                fail_sends: self.fail_sends,
                panic_sends: self.panic_sends,
            }))
        }
    }

    #[async_trait]
    impl AsyncSession for MockSession {
        async fn send(
            &self,
            unit: &WorkloadUnit,
            _params: &SendParams,
        ) -> Result<SendOutcome, BenchError> {
            self.counters.sent.fetch_add(1, Ordering::SeqCst);
            if self.panic_sends {
                panic!("session bug");
            }
            if self.fail_sends {
                return Err(BenchError::Session("connection reset".to_string()));
            }
            Ok(SendOutcome {
                status_code: Some(200),
                body: format!("{{\"ok\":true,\"text\":\"{}\"}}", unit.payload),
                size_bytes: 20,
                succeeded: true,
                error: None,
            })
        }

        async fn close(self: Box<Self>) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockBlocking {
        fail_every_other: bool,
        sent: AtomicUsize,
    }

    impl BlockingClient for MockBlocking {
        fn name(&self) -> &str {
            "mock-blocking"
        }

        fn version(&self) -> String {
            "2.0".to_string()
        }

        fn send(&self, unit: &WorkloadUnit, _params: &SendParams) -> Result<SendOutcome, BenchError> {
            let n = self.sent.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            if self.fail_every_other && n % 2 == 1 {
                return Ok(SendOutcome {
                    status_code: Some(429),
                    body: "{\"ok\":false,\"description\":\"Too Many Requests\"}".to_string(),
                    size_bytes: 47,
                    succeeded: false,
                    error: Some("Too Many Requests".to_string()),
                });
            }
            Ok(SendOutcome {
                status_code: Some(200),
                body: unit.payload.clone(),
                size_bytes: unit.payload.len() as u64,
                succeeded: true,
                error: None,
            })
        }
    }

    struct PanickingBlocking;

    impl BlockingClient for PanickingBlocking {
        fn name(&self) -> &str {
            "panicky"
        }

        fn version(&self) -> String {
            "0.0".to_string()
        }

        fn send(&self, _: &WorkloadUnit, _: &SendParams) -> Result<SendOutcome, BenchError> {
            panic!("library bug");
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl WorkloadSource for BrokenSource {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        async fn open_scope(&self, _label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
            Err(BenchError::Workload("database unreachable".to_string()))
        }
    }

    /// Fails the first fetch, then yields two units.
    struct FlakySource;

    struct FlakyScope {
        calls: u32,
    }

    #[async_trait]
    impl WorkloadScope for FlakyScope {
        async fn next(&mut self) -> Result<Next, BenchError> {
            self.calls += 1;
            match self.calls {
                1 => Err(BenchError::Workload("row locked".to_string())),
                2 | 3 => Ok(Next::Unit(WorkloadUnit::new(self.calls.to_string(), "hi"))),
                _ => Ok(Next::Exhausted),
            }
        }
    }

    #[async_trait]
    impl WorkloadSource for FlakySource {
        fn describe(&self) -> String {
            "flaky".to_string()
        }

        async fn open_scope(&self, _label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
            Ok(Box::new(FlakyScope { calls: 0 }))
        }
    }

    /// A fixed list whose scopes count how often they were closed.
    struct TrackedSource {
        messages: Vec<&'static str>,
        closed: Arc<AtomicUsize>,
    }

    struct TrackedScope {
        remaining: std::vec::IntoIter<&'static str>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WorkloadScope for TrackedScope {
        async fn next(&mut self) -> Result<Next, BenchError> {
            Ok(match self.remaining.next() {
                Some(payload) => Next::Unit(WorkloadUnit::new(payload, payload)),
                None => Next::Exhausted,
            })
        }

        async fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl WorkloadSource for TrackedSource {
        fn describe(&self) -> String {
            "tracked".to_string()
        }

        async fn open_scope(&self, _label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
            Ok(Box::new(TrackedScope {
                remaining: self.messages.clone().into_iter(),
                closed: self.closed.clone(),
            }))
        }
    }

    fn tracked(messages: Vec<&'static str>) -> (Arc<dyn WorkloadSource>, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let source = TrackedSource {
            messages,
            closed: closed.clone(),
        };
        (Arc::new(source), closed)
    }

    fn three_messages() -> Arc<dyn WorkloadSource> {
        Arc::new(MemoryWorkload::new(["one", "two", "three"]))
    }

    fn assert_counts_consistent(summary: &StrategySummary, requested: u64) {
        let w = &summary.workflow;
        assert_eq!(w.successful_count + w.failed_count, w.total_count);
        assert_eq!(w.total_count, summary.attempts.len() as u64);
        assert!(w.total_count <= requested);
    }

    // -----------------------------------------------------------------------
    // Suspending runs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn exhaustion_stops_early_without_failure() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters.clone()));
        let summary = BenchmarkRunner::new(three_messages())
            .run(strategy, 5, SendParams::new())
            .await;

        assert_counts_consistent(&summary, 5);
        assert_eq!(summary.workflow.total_count, 3);
        assert_eq!(summary.workflow.successful_count, 3);
        assert_eq!(summary.workflow.success_rate_percent, 100.0);
        assert_eq!(summary.execution_model, ExecutionModel::Suspending);
        assert_eq!(summary.version, "0.1");
        assert_eq!(counters.prepared.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_recorded_in_iteration_order() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters));
        let summary = BenchmarkRunner::new(three_messages())
            .run(strategy, 3, SendParams::new())
            .await;

        let snippets: Vec<String> = summary
            .attempts
            .iter()
            .map(|a| a.response_snippet.clone().unwrap_or_default())
            .collect();
        assert!(snippets[0].contains("one"));
        assert!(snippets[1].contains("two"));
        assert!(snippets[2].contains("three"));
    }

    #[tokio::test]
    async fn every_send_failing_yields_zero_stats() {
        let counters = Arc::new(Counters::default());
        let mut client = MockAsync::new(counters.clone());
        client.fail_sends = true;
        let summary = BenchmarkRunner::new(three_messages())
            .run(ClientStrategy::suspending(client), 3, SendParams::new())
            .await;

        assert_counts_consistent(&summary, 3);
        assert_eq!(summary.workflow.total_count, 3);
        assert_eq!(summary.workflow.failed_count, 3);
        assert_eq!(summary.workflow.success_rate_percent, 0.0);
        assert_eq!(summary.workflow.total.avg_s, 0.0);
        assert_eq!(summary.workflow.total.p99_s, 0.0);
        assert!(summary.attempts.iter().all(|a| a.error_message.is_some()));
        assert_eq!(counters.sent.load(Ordering::SeqCst), 3);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scope_failure_yields_empty_summary_and_tears_down_once() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters.clone()));
        let summary = BenchmarkRunner::new(Arc::new(BrokenSource))
            .run(strategy, 5, SendParams::new())
            .await;

        assert_eq!(summary.workflow.total_count, 0);
        assert!(summary.attempts.is_empty());
        assert!(!summary.was_benchmarked());
        assert!(summary.resources.started_at.is_some());
        assert_eq!(counters.prepared.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_failure_yields_empty_summary() {
        let counters = Arc::new(Counters::default());
        let mut client = MockAsync::new(counters.clone());
        client.fail_prepare = true;
        let summary = BenchmarkRunner::new(three_messages())
            .run(ClientStrategy::suspending(client), 5, SendParams::new())
            .await;

        assert_eq!(summary.workflow.total_count, 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_error_counts_as_failed_attempt() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters.clone()));
        let summary = BenchmarkRunner::new(Arc::new(FlakySource))
            .run(strategy, 10, SendParams::new())
            .await;

        assert_counts_consistent(&summary, 10);
        assert_eq!(summary.workflow.total_count, 3);
        assert_eq!(summary.workflow.failed_count, 1);
        assert!(!summary.attempts[0].succeeded);
        assert!(summary.attempts[0]
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("row locked")));
        assert_eq!(counters.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_operations_runs_nothing() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters.clone()));
        let summary = BenchmarkRunner::new(three_messages())
            .run(strategy, 0, SendParams::new())
            .await;
        assert_eq!(summary.workflow.total_count, 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pacing_spaces_attempts() {
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters));
        let summary = BenchmarkRunner::new(three_messages())
            .pacing(Duration::from_millis(20))
            .run(strategy, 3, SendParams::new())
            .await;
        // Two gaps between three attempts.
        assert!(summary.resources.duration_seconds >= 0.04);
    }

    #[tokio::test]
    async fn events_follow_state_machine() {
        let (tx, mut rx) = mpsc::channel(64);
        let counters = Arc::new(Counters::default());
        let strategy = ClientStrategy::suspending(MockAsync::new(counters));
        let summary = BenchmarkRunner::new(three_messages())
            .events(tx)
            .run(strategy, 2, SendParams::new())
            .await;
        assert_eq!(summary.workflow.total_count, 2);

        let mut states = Vec::new();
        let mut attempts = 0;
        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                RunEvent::StateChange { state, .. } => states.push(state),
                RunEvent::Attempt { .. } => attempts += 1,
                RunEvent::Finished { .. } => finished = true,
            }
        }
        assert_eq!(
            states,
            vec![
                RunState::ResourceOpen,
                RunState::SessionOpen,
                RunState::Iterating,
                RunState::Teardown,
                RunState::Complete,
            ]
        );
        assert_eq!(attempts, 2);
        assert!(finished);
    }

    #[tokio::test]
    async fn panicking_send_is_recorded_and_session_torn_down() {
        let counters = Arc::new(Counters::default());
        let mut client = MockAsync::new(counters.clone());
        client.panic_sends = true;
        let (source, scope_closed) = tracked(vec!["a", "b"]);

        let summary = tokio::spawn(
            BenchmarkRunner::new(source).run(ClientStrategy::suspending(client), 2, SendParams::new()),
        )
        .await
        .expect("run should not unwind");

        assert_counts_consistent(&summary, 2);
        assert_eq!(summary.workflow.failed_count, 2);
        assert!(summary.attempts.iter().all(|a| a
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("session bug"))));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(scope_closed.load(Ordering::SeqCst), 1);
    }

    // -----------------------------------------------------------------------
    // Blocking runs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn blocking_strategy_runs_on_worker_thread() {
        let (tx, mut rx) = mpsc::channel(64);
        let client = MockBlocking {
            fail_every_other: true,
            sent: AtomicUsize::new(0),
        };
        let summary = BenchmarkRunner::new(three_messages())
            .events(tx)
            .run(ClientStrategy::blocking(client), 3, SendParams::new())
            .await;

        assert_counts_consistent(&summary, 3);
        assert_eq!(summary.execution_model, ExecutionModel::Blocking);
        assert_eq!(summary.workflow.total_count, 3);
        assert_eq!(summary.workflow.successful_count, 2);
        assert_eq!(summary.attempts[1].status_code, Some(429));
        assert!(summary.workflow.total.avg_s > 0.0);

        let mut states = Vec::new();
        let mut attempts = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                RunEvent::StateChange { state, .. } => states.push(state),
                RunEvent::Attempt { .. } => attempts += 1,
                RunEvent::Finished { .. } => {}
            }
        }
        assert_eq!(
            states,
            vec![
                RunState::ResourceOpen,
                RunState::Iterating,
                RunState::Teardown,
                RunState::Complete,
            ]
        );
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn blocking_scope_failure_yields_empty_summary() {
        let client = MockBlocking {
            fail_every_other: false,
            sent: AtomicUsize::new(0),
        };
        let summary = BenchmarkRunner::new(Arc::new(BrokenSource))
            .run(ClientStrategy::blocking(client), 4, SendParams::new())
            .await;
        assert_eq!(summary.workflow.total_count, 0);
        assert!(summary.resources.stopped_at.is_some());
    }

    #[tokio::test]
    async fn blocking_exhaustion_stops_early_and_closes_scope() {
        let client = MockBlocking {
            fail_every_other: false,
            sent: AtomicUsize::new(0),
        };
        let (source, scope_closed) = tracked(vec!["x", "y"]);
        let summary = BenchmarkRunner::new(source)
            .run(ClientStrategy::blocking(client), 5, SendParams::new())
            .await;

        assert_counts_consistent(&summary, 5);
        assert_eq!(summary.workflow.total_count, 2);
        assert_eq!(summary.workflow.success_rate_percent, 100.0);
        assert_eq!(scope_closed.load(Ordering::SeqCst), 1);
        assert!(summary.resources.stopped_at.is_some());
    }

    #[tokio::test]
    async fn blocking_panic_is_recorded_per_attempt() {
        let (source, scope_closed) = tracked(vec!["a", "b", "c"]);
        let summary = BenchmarkRunner::new(source)
            .run(ClientStrategy::blocking(PanickingBlocking), 3, SendParams::new())
            .await;

        assert_eq!(summary.name, "panicky");
        assert_eq!(summary.workflow.total_count, 3);
        assert_eq!(summary.workflow.failed_count, 3);
        assert_eq!(
            summary.attempts[0].error_message.as_deref(),
            Some("Internal error: send panicked: library bug")
        );
        assert_eq!(scope_closed.load(Ordering::SeqCst), 1);
    }
}
