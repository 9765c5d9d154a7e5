//! Reconciliation scheduler
//!
//! A single fixed-interval ticker. Discovery and population are launched once
//! at start-up; every tick launches discovery, population and pruning as
//! independent tasks (pruning after `prune_delay`). Ticks never wait for the
//! previous tick's jobs; overlapping runs are allowed unless `skip_if_busy` is
//! set, in which case a job whose previous run is still in flight is skipped.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::config::config::DiscoveryConfig;
use crate::error::Result;
use crate::observability::{HealthCheckResult, ObservabilityState};
use crate::services::context::JobContext;
use crate::services::discovery::DiscoveryReport;
use crate::services::population::PopulationReport;
use crate::services::pruning::PruneReport;
use crate::services::reconciler::{Job, Reconciler};

/// Outcome of a single job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobReport {
    Discovery(DiscoveryReport),
    Population(PopulationReport),
    Pruning(PruneReport),
}

impl Reconciler {
    /// Run one job to completion.
    pub async fn run(&self, job: Job, ctx: &JobContext) -> Result<JobReport> {
        match job {
            Job::Discovery => self.discover(ctx).await.map(JobReport::Discovery),
            Job::Population => self.populate_cache(ctx).await.map(JobReport::Population),
            Job::Pruning => self.prune_cache(ctx).await.map(JobReport::Pruning),
        }
    }
}

/// Per-job "already running" flags.
#[derive(Debug, Default)]
struct BusyFlags {
    flags: [Arc<AtomicBool>; 3],
}

impl BusyFlags {
    fn try_acquire(&self, job: Job) -> Option<BusyGuard> {
        let flag = &self.flags[job as usize];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: flag.clone() })
    }
}

struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    observability: Option<Arc<ObservabilityState>>,
    interval: Duration,
    prune_delay: Duration,
    io_timeout: Duration,
    skip_if_busy: bool,
    cancel: CancellationToken,
    tracker: TaskTracker,
    busy: BusyFlags,
}

impl Scheduler {
    pub fn new(
        reconciler: Arc<Reconciler>,
        config: &DiscoveryConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            observability: None,
            interval: config.interval(),
            prune_delay: config.prune_delay(),
            io_timeout: config.io_timeout(),
            skip_if_busy: config.skip_if_busy,
            cancel,
            tracker: TaskTracker::new(),
            busy: BusyFlags::default(),
        }
    }

    /// Report every job outcome as a health check.
    pub fn with_observability(mut self, state: Arc<ObservabilityState>) -> Self {
        self.observability = Some(state);
        self
    }

    /// Tick until cancelled. Launched jobs keep running after this returns;
    /// use [`Scheduler::shutdown`] to wait for them.
    pub async fn run(&self) {
        info!(
            interval = ?self.interval,
            prune_delay = ?self.prune_delay,
            skip_if_busy = self.skip_if_busy,
            "Reconciliation scheduler started"
        );

        self.launch(Job::Discovery, Duration::ZERO);
        self.launch(Job::Population, Duration::ZERO);

        let mut ticker = interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.launch(Job::Discovery, Duration::ZERO);
                    self.launch(Job::Population, Duration::ZERO);
                    self.launch(Job::Pruning, self.prune_delay);
                }
            }
        }

        info!("Reconciliation scheduler stopped issuing ticks");
    }

    /// Wait for every launched job to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        debug!(in_flight = self.tracker.len(), "Waiting for in-flight jobs");
        self.tracker.wait().await;
        info!("All reconciliation jobs finished");
    }

    /// Number of jobs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn launch(&self, job: Job, delay: Duration) {
        let guard = if self.skip_if_busy {
            match self.busy.try_acquire(job) {
                Some(guard) => Some(guard),
                None => {
                    debug!(%job, "Previous run still in flight, skipping");
                    self.reconciler
                        .metrics()
                        .job_skipped
                        .with_label_values(&[job.as_str()])
                        .inc();
                    return;
                }
            }
        } else {
            None
        };

        let reconciler = self.reconciler.clone();
        let observability = self.observability.clone();
        let ctx = JobContext::new(self.cancel.clone(), self.io_timeout);

        self.tracker.spawn(async move {
            let _guard = guard;
            if !delay.is_zero() {
                tokio::select! {
                    _ = ctx.cancel_token().cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            execute(&reconciler, job, &ctx, observability.as_deref()).await;
        });
    }
}

/// Run a job and record its outcome in logs, metrics and health checks.
async fn execute(
    reconciler: &Reconciler,
    job: Job,
    ctx: &JobContext,
    observability: Option<&ObservabilityState>,
) {
    let start = Instant::now();
    let result = reconciler.run(job, ctx).await;
    let elapsed = start.elapsed();

    let metrics = reconciler.metrics();
    metrics
        .job_duration
        .with_label_values(&[job.as_str()])
        .observe(elapsed.as_secs_f64());

    let (outcome, healthy, message) = match &result {
        Ok(report) => {
            debug!(%job, ?elapsed, ?report, "Job finished");
            ("ok", true, "ok".to_string())
        }
        Err(e) if e.is_cancelled() => {
            info!(%job, "Job cancelled: {}", e);
            ("cancelled", true, e.to_string())
        }
        Err(e) => {
            error!(%job, ?elapsed, "Job failed: {}", e);
            ("error", false, e.to_string())
        }
    };
    metrics
        .job_runs
        .with_label_values(&[job.as_str(), outcome])
        .inc();

    if let Some(state) = observability {
        state
            .add_health_check(HealthCheckResult {
                name: job.as_str().to_string(),
                healthy,
                message,
                latency_ms: elapsed.as_millis() as u64,
            })
            .await;
    }
}
