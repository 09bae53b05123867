/// Loyalty notices for long-standing identities
///
/// Selects verified identities that registered in
/// `[now - age - period, now - age)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use taskforge_shared::engine::{Engine, EngineError};
use taskforge_shared::notify::FanoutReport;
use tokio_util::sync::CancellationToken;

use super::Job;

pub struct AnniversaryNoticeJob {
    engine: Engine,
    age: Duration,
    period: Duration,
}

impl AnniversaryNoticeJob {
    pub fn new(engine: Engine, age: Duration, period: Duration) -> Self {
        Self { engine, age, period }
    }
}

#[async_trait]
impl Job for AnniversaryNoticeJob {
    fn name(&self) -> &str {
        "anniversary_notice"
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
                self.engine.notify_anniversaries(now, self.age, self.period),
            )
            .await
    }
}
