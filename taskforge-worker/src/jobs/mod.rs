/// Periodic jobs
///
/// A job is one scan the scheduler runs on its own timer. Jobs receive the
/// tick time and the worker's shutdown token; they pass the token to
/// [`Engine::run_cancellable`](taskforge_shared::engine::Engine::run_cancellable)
/// so a scan in flight stops at shutdown without sending anything further.
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use chrono::{DateTime, Utc};
/// use std::time::Duration;
/// use taskforge_shared::engine::EngineError;
/// use taskforge_shared::notify::FanoutReport;
/// use taskforge_worker::jobs::Job;
/// use tokio_util::sync::CancellationToken;
///
/// struct Noop;
///
/// #[async_trait]
/// impl Job for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     fn period(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     async fn run(
///         &self,
///         _now: DateTime<Utc>,
///         _shutdown: &CancellationToken,
///     ) -> Result<FanoutReport, EngineError> {
///         Ok(FanoutReport::default())
///     }
/// }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use taskforge_shared::engine::EngineError;
use taskforge_shared::notify::FanoutReport;
use tokio_util::sync::CancellationToken;

pub mod anniversary;
pub mod inactivity;

pub use anniversary::AnniversaryNoticeJob;
pub use inactivity::InactivityReminderJob;

/// Contract for a periodic scan
#[async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Time between ticks; also the width of the scanned window
    fn period(&self) -> Duration;

    /// Runs one tick
    async fn run(
        &self,
        now: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<FanoutReport, EngineError>;
}
