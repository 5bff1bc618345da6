//! Report scheduler
//!
//! Drives the report cycle (collect, submit, retry or abandon) on a tick whose
//! period the server can renegotiate, and runs the fixed-cadence sampling
//! task next to it.
//!
//! The traffic buffer is cleared only after a confirmed submission, and only
//! of the samples that submission carried; an abandoned cycle leaves it
//! untouched so the next cycle carries the backlog.

use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::collectors::network::{CounterSource, NetworkCollector, SAMPLE_INTERVAL};
use crate::collectors::{Collector, CollectorOutput};
use crate::config::MAX_REPORT_INTERVAL;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::reporter::client::ReportSubmitter;
use crate::reporter::payload::ReportPayload;
use crate::reporter::retry::{RetryPolicy, RetryState};

/// Wait before exiting on a rejected token
pub const AUTH_GRACE_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Collecting,
    Submitting,
    Success,
    Retrying,
    Abandoned,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Collecting => "collecting",
            CycleState::Submitting => "submitting",
            CycleState::Success => "success",
            CycleState::Retrying => "retrying",
            CycleState::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// How a single report cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Server accepted the report; `new_interval` is set when a change was signalled
    Success { new_interval: Option<u64> },
    /// Every attempt failed; buffered samples are kept
    Abandoned { attempts: u32 },
    /// Token rejected, the agent must stop
    Unauthorized,
    /// Shutdown requested during a backoff wait
    Interrupted,
}

pub struct ReportScheduler {
    ctx: Arc<AgentContext>,
    network: NetworkCollector,
    collectors: Vec<Arc<dyn Collector>>,
    submitter: Arc<dyn ReportSubmitter>,
    retry: RetryPolicy,
    auth_grace: Duration,
    sample_interval: Duration,
    /// Current report interval in seconds
    report_interval: u64,
    interval_tx: mpsc::Sender<u64>,
    interval_rx: mpsc::Receiver<u64>,
    shutdown: watch::Receiver<bool>,
    state: CycleState,
}

impl ReportScheduler {
    pub fn new(
        ctx: Arc<AgentContext>,
        network: NetworkCollector,
        submitter: Arc<dyn ReportSubmitter>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        // one slot: an update not yet applied makes later ones drop
        let (interval_tx, interval_rx) = mpsc::channel(1);
        let report_interval = ctx.config.report_interval.clamp(1, MAX_REPORT_INTERVAL);
        let collectors: Vec<Arc<dyn Collector>> = vec![Arc::new(network.clone())];

        Self {
            ctx,
            network,
            collectors,
            submitter,
            retry: RetryPolicy::default(),
            auth_grace: AUTH_GRACE_PERIOD,
            sample_interval: SAMPLE_INTERVAL,
            report_interval,
            interval_tx,
            interval_rx,
            shutdown,
            state: CycleState::Idle,
        }
    }

    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_auth_grace(mut self, grace: Duration) -> Self {
        self.auth_grace = grace;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    fn set_state(&mut self, state: CycleState) {
        trace!("Report cycle: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Runs until shutdown or a rejected token.
    ///
    /// Sends one report immediately, then one per report tick. Returns
    /// `Err(AgentError::Unauthorized)` after the grace period when the server
    /// rejects the token.
    pub async fn run(mut self, counters: Box<dyn CounterSource>) -> Result<(), AgentError> {
        info!(
            "Starting reporter with interval: {} seconds ({} collectors)",
            self.report_interval,
            self.collectors.len()
        );

        let sampling = self.spawn_sampling_task(counters);

        // prompt connectivity confirmation
        info!("Sending initial report");
        let outcome = self.run_cycle().await;
        if let Some(result) = self.finish_if_terminal(&outcome).await {
            sampling.abort();
            return result;
        }

        let mut ticker = report_ticker(self.report_interval());

        let result = loop {
            tokio::select! {
                Some(secs) = self.interval_rx.recv() => {
                    info!(
                        "Updating report interval from {} to {} seconds",
                        self.report_interval, secs
                    );
                    self.report_interval = secs;
                    ticker = report_ticker(self.report_interval());
                }
                _ = ticker.tick() => {
                    let outcome = self.run_cycle().await;
                    if let Some(result) = self.finish_if_terminal(&outcome).await {
                        break result;
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Stopping reporter");
                        break Ok(());
                    }
                }
            }
        };

        if result.is_ok() {
            if let Err(e) = sampling.await {
                warn!("Sampling task ended abnormally: {}", e);
            }
        } else {
            sampling.abort();
        }
        result
    }

    /// `Some` when the run loop must end after this outcome.
    async fn finish_if_terminal(&mut self, outcome: &CycleOutcome) -> Option<Result<(), AgentError>> {
        match outcome {
            CycleOutcome::Unauthorized => {
                error!(
                    "Invalid token. Please check your configuration. Exiting in {} seconds",
                    self.auth_grace.as_secs()
                );
                let grace = self.auth_grace;
                self.sleep_or_shutdown(grace).await;
                Some(Err(AgentError::Unauthorized))
            }
            CycleOutcome::Interrupted => {
                info!("Stopping reporter during retry backoff");
                Some(Ok(()))
            }
            CycleOutcome::Success { .. } | CycleOutcome::Abandoned { .. } => None,
        }
    }

    fn spawn_sampling_task(&self, mut counters: Box<dyn CounterSource>) -> JoinHandle<()> {
        let network = self.network.clone();
        let mut shutdown = self.shutdown.clone();
        let period = self.sample_interval;

        tokio::spawn(async move {
            info!("Network sampler started (every {} seconds)", period.as_secs());
            // first tick completes immediately and seeds the counters
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match network.take_sample(counters.as_mut()) {
                            Ok(Some(sample)) => trace!("Buffered traffic sample at {}", sample.timestamp),
                            Ok(None) => {}
                            Err(e) => warn!("Failed to collect network sample: {}", e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Network sampler stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// One collect, submit, retry cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.set_state(CycleState::Collecting);
        let payload = self.collect().await;
        let reported = payload
            .network_traffic
            .as_ref()
            .map_or(0, |traffic| traffic.sample_count);

        let mut retry = RetryState::new(self.retry.clone());
        loop {
            self.set_state(CycleState::Submitting);
            let attempt = retry.attempt_count() + 1;

            match self.submitter.submit(&payload).await {
                Ok(directive) => {
                    if !directive.success {
                        warn!("Server accepted the report but returned success=false");
                    }
                    self.set_state(CycleState::Success);

                    let cleared = self.network.sampler().clear_reported(reported);
                    debug!("Cleared {} reported traffic samples", cleared);

                    let new_interval = directive.interval_change(self.report_interval);
                    if let Some(secs) = new_interval {
                        self.signal_interval(secs);
                    }

                    self.set_state(CycleState::Idle);
                    return CycleOutcome::Success { new_interval };
                }
                Err(e) if e.is_fatal() => {
                    error!("Report rejected: {}", e);
                    self.set_state(CycleState::Idle);
                    return CycleOutcome::Unauthorized;
                }
                Err(e) => {
                    warn!("Report attempt {} failed: {}", attempt, e);
                }
            }

            let Some(delay) = retry.next_delay() else {
                self.set_state(CycleState::Abandoned);
                error!(
                    "Failed to send report after {} attempts, keeping {} traffic samples for next cycle",
                    attempt,
                    self.network.sampler().len()
                );
                self.set_state(CycleState::Idle);
                return CycleOutcome::Abandoned { attempts: attempt };
            };

            self.set_state(CycleState::Retrying);
            info!(
                "Retrying in {} seconds (retry {}/{})",
                delay.as_secs(),
                retry.attempt_count(),
                self.retry.max_retries
            );
            if !self.sleep_or_shutdown(delay).await {
                self.set_state(CycleState::Idle);
                return CycleOutcome::Interrupted;
            }
        }
    }

    /// Builds the payload once; failing or empty sources are left out.
    async fn collect(&self) -> ReportPayload {
        let mut payload = ReportPayload::new();

        for collector in &self.collectors {
            match collector.collect().await {
                Ok(CollectorOutput::Empty) => {
                    debug!("Collector {} returned no data", collector.name());
                }
                Ok(output) => {
                    debug!("Collector {} returned {}", collector.name(), output.kind());
                    payload.merge(output);
                }
                Err(e) => warn!("Failed to collect from {}: {}", collector.name(), e),
            }
        }

        if payload.hostname.is_empty() {
            payload.hostname = self
                .ctx
                .config
                .hostname
                .clone()
                .or_else(System::host_name)
                .unwrap_or_default();
        }

        info!(
            "Collected report for {} ({} sections)",
            payload.hostname,
            payload.section_count()
        );
        payload
    }

    fn signal_interval(&self, secs: u64) {
        match self.interval_tx.try_send(secs) {
            Ok(()) => info!("Server requested report interval of {} seconds", secs),
            Err(TrySendError::Full(dropped)) => warn!(
                "Interval update to {} seconds dropped, previous update not applied yet",
                dropped
            ),
            Err(TrySendError::Closed(_)) => warn!("Interval update channel closed"),
        }
    }

    /// Sleeps for `delay`; returns false if shutdown was requested first.
    async fn sleep_or_shutdown(&mut self, delay: Duration) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }
}

fn report_ticker(period: Duration) -> Interval {
    let period = period.clamp(Duration::from_secs(1), Duration::from_secs(MAX_REPORT_INTERVAL));
    // the first report was sent at startup or just before the change
    let start = Instant::now()
        .checked_add(period)
        .unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::network::{CounterSnapshot, TrafficSampler};
    use crate::config::AgentConfig;
    use crate::error::{CollectorError, SubmitError};
    use crate::reporter::payload::ServerDirective;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::error::TryRecvError;

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Accept(Option<u64>),
        Fail(u16),
        Reject,
    }

    struct FakeSubmitter {
        replies: Mutex<VecDeque<Reply>>,
        fallback: Reply,
        calls: AtomicUsize,
        seen: Mutex<Vec<ReportPayload>>,
    }

    impl FakeSubmitter {
        fn new(replies: Vec<Reply>, fallback: Reply) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                fallback,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportSubmitter for FakeSubmitter {
        async fn submit(&self, payload: &ReportPayload) -> Result<ServerDirective, SubmitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(payload.clone());
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(self.fallback);
            match reply {
                Reply::Accept(interval) => Ok(ServerDirective {
                    success: true,
                    report_interval: interval,
                }),
                Reply::Fail(status) => Err(SubmitError::Transient {
                    status,
                    body: "unavailable".to_string(),
                }),
                Reply::Reject => Err(SubmitError::Unauthorized),
            }
        }
    }

    /// Counters that grow by a fixed amount per read
    struct RisingCounters {
        rx: u64,
        tx: u64,
    }

    impl CounterSource for RisingCounters {
        fn read_counters(&mut self) -> Result<Vec<CounterSnapshot>, CollectorError> {
            self.rx += 1000;
            self.tx += 100;
            Ok(vec![CounterSnapshot::new("eth0", self.rx, self.tx)])
        }
    }

    struct FailingCollector;

    #[async_trait]
    impl Collector for FailingCollector {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self) -> Result<CollectorOutput, CollectorError> {
            Err(CollectorError::Unavailable {
                collector: "broken",
                message: "no data source".to_string(),
            })
        }
    }

    fn context(interval: u64) -> Arc<AgentContext> {
        Arc::new(AgentContext::new(AgentConfig {
            server_url: "https://monitor.example.com".to_string(),
            token: "abcdef0123456789".to_string(),
            report_interval: interval,
            hostname: Some("test-host".to_string()),
        }))
    }

    fn scheduler(
        submitter: Arc<FakeSubmitter>,
    ) -> (ReportScheduler, Arc<TrafficSampler>, watch::Sender<bool>) {
        let sampler = Arc::new(TrafficSampler::new());
        let network = NetworkCollector::new(sampler.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = ReportScheduler::new(context(300), network, submitter, stop_rx);
        (scheduler, sampler, stop_tx)
    }

    fn buffer_two_samples(sampler: &TrafficSampler) {
        sampler.sample("eth0", 0, 0);
        sampler.sample("eth0", 1000, 100);
        sampler.sample("eth0", 2000, 300);
        assert_eq!(sampler.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_buffer_and_signals_interval_once() {
        let submitter = FakeSubmitter::new(vec![Reply::Accept(Some(120))], Reply::Accept(None));
        let (mut scheduler, sampler, _stop) = scheduler(submitter.clone());
        buffer_two_samples(&sampler);

        let outcome = scheduler.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Success { new_interval: Some(120) });
        assert!(sampler.is_empty());
        assert_eq!(scheduler.state(), CycleState::Idle);

        assert_eq!(scheduler.interval_rx.try_recv(), Ok(120));
        assert_eq!(scheduler.interval_rx.try_recv(), Err(TryRecvError::Empty));

        let seen = submitter.seen.lock().unwrap();
        let traffic = seen[0].network_traffic.as_ref().unwrap();
        assert_eq!(traffic.sample_count, 2);
        assert_eq!(seen[0].hostname, "test-host");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_interval_is_not_signalled() {
        let submitter = FakeSubmitter::new(vec![Reply::Accept(Some(300))], Reply::Accept(None));
        let (mut scheduler, _sampler, _stop) = scheduler(submitter);

        let outcome = scheduler.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Success { new_interval: None });
        assert_eq!(scheduler.interval_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_interval_update_drops_newer_one() {
        let submitter = FakeSubmitter::new(
            vec![Reply::Accept(Some(120)), Reply::Accept(Some(60))],
            Reply::Accept(None),
        );
        let (mut scheduler, _sampler, _stop) = scheduler(submitter);

        scheduler.run_cycle().await;
        scheduler.run_cycle().await;

        assert_eq!(scheduler.interval_rx.try_recv(), Ok(120));
        assert_eq!(scheduler.interval_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_keep_buffer() {
        let submitter = FakeSubmitter::new(Vec::new(), Reply::Fail(503));
        let (mut scheduler, sampler, _stop) = scheduler(submitter.clone());
        buffer_two_samples(&sampler);
        let before = sampler.drain();

        let start = Instant::now();
        let outcome = scheduler.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Abandoned { attempts: 6 });
        assert_eq!(submitter.calls(), 6);
        // 5 + 10 + 20 + 40 + 60
        assert_eq!(start.elapsed(), Duration::from_secs(135));
        assert_eq!(sampler.drain(), before);
        assert_eq!(scheduler.interval_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_resends_same_payload() {
        let submitter = FakeSubmitter::new(
            vec![Reply::Fail(502), Reply::Fail(500)],
            Reply::Accept(None),
        );
        let (mut scheduler, sampler, _stop) = scheduler(submitter.clone());
        buffer_two_samples(&sampler);

        let start = Instant::now();
        let outcome = scheduler.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Success { new_interval: None });
        assert_eq!(submitter.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert!(sampler.is_empty());

        let seen = submitter.seen.lock().unwrap();
        assert_eq!(seen[0], seen[2]);
    }

    /// Samples the buffer on the first retry, as the sampling task would
    struct SampleOnRetry {
        inner: Arc<FakeSubmitter>,
        sampler: Arc<TrafficSampler>,
    }

    #[async_trait]
    impl ReportSubmitter for SampleOnRetry {
        async fn submit(&self, payload: &ReportPayload) -> Result<ServerDirective, SubmitError> {
            if self.inner.calls() == 1 {
                self.sampler.sample("eth0", 9000, 900);
            }
            self.inner.submit(payload).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_taken_during_backoff_survives_success() {
        let inner = FakeSubmitter::new(vec![Reply::Fail(503)], Reply::Accept(None));
        let sampler = Arc::new(TrafficSampler::new());
        buffer_two_samples(&sampler);
        let submitter = Arc::new(SampleOnRetry {
            inner: inner.clone(),
            sampler: sampler.clone(),
        });
        let (_stop, stop_rx) = watch::channel(false);
        let mut scheduler = ReportScheduler::new(
            context(300),
            NetworkCollector::new(sampler.clone()),
            submitter,
            stop_rx,
        );

        let outcome = scheduler.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Success { new_interval: None });
        assert_eq!(inner.calls(), 2);

        // the sample appended after collection is carried by the next report
        let pending = sampler.drain().unwrap();
        assert_eq!(pending.sample_count, 1);
        assert_eq!(pending.samples[0].in_bytes, 7000);

        scheduler.run_cycle().await;
        let seen = inner.seen.lock().unwrap();
        assert_eq!(seen[0].network_traffic.as_ref().unwrap().sample_count, 2);
        assert_eq!(seen[2].network_traffic.as_ref().unwrap().sample_count, 1);
        assert!(sampler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_not_retried() {
        let submitter = FakeSubmitter::new(Vec::new(), Reply::Reject);
        let (mut scheduler, sampler, _stop) = scheduler(submitter.clone());
        buffer_two_samples(&sampler);

        let start = Instant::now();
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Unauthorized);
        assert_eq!(submitter.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(sampler.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_collector_does_not_abort_cycle() {
        let submitter = FakeSubmitter::new(Vec::new(), Reply::Accept(None));
        let (scheduler, _sampler, _stop) = scheduler(submitter.clone());
        let mut scheduler = scheduler.with_collector(Arc::new(FailingCollector));

        let outcome = scheduler.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Success { new_interval: None });

        let seen = submitter.seen.lock().unwrap();
        assert!(seen[0].network_traffic.is_none());
        assert_eq!(seen[0].section_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let submitter = FakeSubmitter::new(Vec::new(), Reply::Fail(503));
        let (mut scheduler, _sampler, stop) = scheduler(submitter.clone());

        let handle = tokio::spawn(async move { scheduler.run_cycle().await });
        tokio::time::sleep(Duration::from_secs(7)).await;
        stop.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), CycleOutcome::Interrupted);
        // initial attempt plus the retry after 5s
        assert_eq!(submitter.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_at_startup_and_on_renegotiated_tick() {
        let submitter = FakeSubmitter::new(vec![Reply::Accept(Some(60))], Reply::Accept(None));
        let (scheduler, _sampler, stop) = scheduler(submitter.clone());
        let handle = tokio::spawn(scheduler.run(Box::new(RisingCounters { rx: 0, tx: 0 })));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(submitter.calls(), 1);

        // new 60s interval replaces the configured 300s
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(submitter.calls(), 2);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(submitter.calls(), 3);

        stop.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_server_interval_keeps_running() {
        let submitter =
            FakeSubmitter::new(vec![Reply::Accept(Some(u64::MAX))], Reply::Accept(None));
        let (scheduler, _sampler, stop) = scheduler(submitter.clone());
        let handle = tokio::spawn(scheduler.run(Box::new(RisingCounters { rx: 0, tx: 0 })));

        // the configured 300s interval stays in effect
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(submitter.calls(), 2);

        stop.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_ticker_bounds_period() {
        let start = Instant::now();
        let mut ticker = report_ticker(Duration::MAX);
        assert_eq!(ticker.period(), Duration::from_secs(MAX_REPORT_INTERVAL));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(MAX_REPORT_INTERVAL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_after_auth_grace() {
        let submitter = FakeSubmitter::new(Vec::new(), Reply::Reject);
        let (scheduler, _sampler, _stop) = scheduler(submitter.clone());
        let scheduler = scheduler.with_auth_grace(Duration::from_secs(60));

        let start = Instant::now();
        let result = scheduler.run(Box::new(RisingCounters { rx: 0, tx: 0 })).await;

        assert!(matches!(result, Err(AgentError::Unauthorized)));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(submitter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_task_feeds_buffer_between_reports() {
        let submitter = FakeSubmitter::new(vec![Reply::Fail(500)], Reply::Accept(None));
        let (scheduler, sampler, stop) = scheduler(submitter.clone());
        let scheduler = scheduler
            .with_sample_interval(Duration::from_secs(10))
            .with_retry_policy(RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            });
        let handle = tokio::spawn(scheduler.run(Box::new(RisingCounters { rx: 0, tx: 0 })));

        // seed at t=0, samples at t=10, 20, 30; startup report was abandoned
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(submitter.calls(), 1);
        assert_eq!(sampler.len(), 3);

        stop.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
