/// Job scheduler
///
/// Runs every registered [`Job`] on its own timer until shutdown.
///
/// # Architecture
///
/// ```text
/// Scheduler
///   ├─> job A: interval ─> run ─> interval ─> run ...
///   └─> job B: interval ─> run ─> interval ─> run ...
/// ```
///
/// Each job gets its own Tokio task. Within a job the body is awaited
/// before the next tick is taken, and missed ticks are delayed rather than
/// bursted, so a job never overlaps with itself. Different jobs run
/// concurrently.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use taskforge_shared::engine::Engine;
/// use taskforge_worker::jobs::InactivityReminderJob;
/// use taskforge_worker::scheduler::Scheduler;
///
/// # async fn example(engine: Engine) -> anyhow::Result<()> {
/// let mut scheduler = Scheduler::new();
/// scheduler.register(Arc::new(InactivityReminderJob::new(
///     engine,
///     Duration::from_secs(7 * 24 * 3600),
///     Duration::from_secs(60),
/// )));
///
/// let shutdown = scheduler.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// scheduler.run().await?;
/// # Ok(())
/// # }
/// ```

use crate::jobs::Job;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_token: CancellationToken,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            jobs: Vec::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn Job>) {
        tracing::info!(
            job = %job.name(),
            period_secs = job.period().as_secs(),
            "Registering job"
        );
        self.jobs.push(job);
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs all jobs until the shutdown token is cancelled
    ///
    /// Returns once every job loop has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if a job loop panicked
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(jobs = self.jobs.len(), "Scheduler starting");

        let handles: Vec<_> = self
            .jobs
            .into_iter()
            .map(|job| tokio::spawn(run_job(job, self.shutdown_token.clone())))
            .collect();

        for handle in handles {
            handle.await?;
        }

        tracing::info!("Scheduler shut down");
        Ok(())
    }
}

/// Tick loop for one job
async fn run_job(job: Arc<dyn Job>, shutdown: CancellationToken) {
    let mut ticker = interval(job.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match job.run(Utc::now(), &shutdown).await {
            Ok(report) => {
                if report.attempted > 0 {
                    tracing::info!(
                        job = %job.name(),
                        attempted = report.attempted,
                        delivered = report.delivered,
                        "Job tick finished"
                    );
                } else {
                    tracing::debug!(job = %job.name(), "Job tick found nothing to do");
                }
            }
            Err(e) if shutdown.is_cancelled() => {
                tracing::debug!(job = %job.name(), error = %e, "Job tick interrupted by shutdown");
                break;
            }
            Err(e) => {
                tracing::error!(job = %job.name(), error = %e, "Job tick failed");
            }
        }
    }

    tracing::info!(job = %job.name(), "Job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use taskforge_shared::engine::EngineError;
    use taskforge_shared::notify::FanoutReport;

    /// Counts ticks and tracks how many run at once
    struct ProbeJob {
        period: Duration,
        work: Duration,
        runs: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ProbeJob {
        fn new(period: Duration, work: Duration) -> Self {
            Self {
                period,
                work,
                runs: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Job for ProbeJob {
        fn name(&self) -> &str {
            "probe"
        }

        fn period(&self) -> Duration {
            self.period
        }

        async fn run(
            &self,
            _now: DateTime<Utc>,
            _shutdown: &CancellationToken,
        ) -> Result<FanoutReport, EngineError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.work).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(FanoutReport::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_every_period() {
        let job = Arc::new(ProbeJob::new(Duration::from_secs(10), Duration::ZERO));
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone());
        let shutdown = scheduler.shutdown_token();

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_secs(35)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        // Ticks at 0, 10, 20 and 30 seconds
        let runs = job.runs.load(Ordering::SeqCst);
        assert!((3..=4).contains(&runs), "unexpected run count {}", runs);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_job_never_overlaps_itself() {
        let job = Arc::new(ProbeJob::new(Duration::from_secs(1), Duration::from_secs(3)));
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone());
        let shutdown = scheduler.shutdown_token();

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_secs(20)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert!(job.runs.load(Ordering::SeqCst) >= 2);
        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_scheduler_stops_immediately() {
        let job = Arc::new(ProbeJob::new(Duration::from_secs(3600), Duration::ZERO));
        let mut scheduler = Scheduler::new();
        scheduler.register(job.clone());
        scheduler.shutdown_token().cancel();

        scheduler.run().await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }
}
