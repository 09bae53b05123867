/// "We miss you" reminders
///
/// Each tick looks at identities whose last session started in
/// `[now - threshold - period, now - threshold)`. Consecutive ticks scan
/// adjacent windows, so an identity crossing the threshold is reminded once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use taskforge_shared::engine::{Engine, EngineError};
use taskforge_shared::notify::FanoutReport;
use tokio_util::sync::CancellationToken;

use super::Job;

pub struct InactivityReminderJob {
    engine: Engine,
    threshold: Duration,
    period: Duration,
}

impl InactivityReminderJob {
    pub fn new(engine: Engine, threshold: Duration, period: Duration) -> Self {
        Self {
            engine,
            threshold,
            period,
        }
    }
}

#[async_trait]
impl Job for InactivityReminderJob {
    fn name(&self) -> &str {
        "inactivity_reminder"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run(
        &self,
        now: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<FanoutReport, EngineError> {
        self.engine
            .run_cancellable(
                shutdown,
                self.engine.remind_inactive(now, self.threshold, self.period),
            )
            .await
    }
}
