/// Periodic reminder scans
///
/// Each scan selects identities whose timestamp crossed a threshold during
/// the last period:
///
/// ```text
/// window = [now - threshold - period, now - threshold)
/// ```
///
/// Consecutive scans with the same period tile the timeline, so an
/// identity falls into exactly one window and is notified once.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{Engine, EngineError};
use crate::models::identity::Identity;
use crate::notify::{fan_out, FanoutReport, Notification};

/// Half-open window `[from, to)` ending `threshold` before `now`
pub fn window(
    now: DateTime<Utc>,
    threshold: Duration,
    period: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let threshold = chrono::Duration::from_std(threshold)
        .map_err(|_| EngineError::validation("threshold out of range"))?;
    let period = chrono::Duration::from_std(period)
        .map_err(|_| EngineError::validation("period out of range"))?;

    let to = now
        .checked_sub_signed(threshold)
        .ok_or_else(|| EngineError::validation("threshold out of range"))?;
    let from = to
        .checked_sub_signed(period)
        .ok_or_else(|| EngineError::validation("period out of range"))?;

    Ok((from, to))
}

impl Engine {
    /// Sends "we miss you" to identities that went quiet `threshold` ago
    pub async fn remind_inactive(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
        period: Duration,
    ) -> Result<FanoutReport, EngineError> {
        let (from, to) = window(now, threshold, period)?;
        let identities = self
            .bounded("remind_inactive", async {
                Ok(self.store.last_active_between(from, to).await?)
            })
            .await?;

        let report = self
            .send_each(&identities, |identity| {
                Notification::inactivity_reminder(&identity.email, &self.config.app_url)
            })
            .await;

        tracing::info!(
            %from,
            %to,
            attempted = report.attempted,
            delivered = report.delivered,
            "Inactivity reminders sent"
        );
        Ok(report)
    }

    /// Thanks identities that registered `age` ago
    pub async fn notify_anniversaries(
        &self,
        now: DateTime<Utc>,
        age: Duration,
        period: Duration,
    ) -> Result<FanoutReport, EngineError> {
        let (from, to) = window(now, age, period)?;
        let identities = self
            .bounded("notify_anniversaries", async {
                Ok(self.store.registered_between(from, to).await?)
            })
            .await?;

        let report = self
            .send_each(&identities, |identity| {
                Notification::anniversary(&identity.email, &self.config.app_url)
            })
            .await;

        tracing::info!(
            %from,
            %to,
            attempted = report.attempted,
            delivered = report.delivered,
            "Anniversary notices sent"
        );
        Ok(report)
    }

    async fn send_each<F>(&self, identities: &[Identity], build: F) -> FanoutReport
    where
        F: Fn(&Identity) -> Notification,
    {
        let messages = identities.iter().map(build).collect();
        fan_out(self.queue.as_ref(), messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let (from, to) = window(now, Duration::from_secs(3600), Duration::from_secs(60)).unwrap();

        assert_eq!(to, Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap());
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 3, 10, 10, 59, 0).unwrap());
    }

    #[test]
    fn test_consecutive_windows_tile() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let period = Duration::from_secs(60);
        let threshold = Duration::from_secs(7 * 24 * 3600);

        let (_, first_to) = window(now, threshold, period).unwrap();
        let (second_from, _) = window(now + chrono::Duration::seconds(60), threshold, period).unwrap();
        assert_eq!(first_to, second_from);
    }

    #[test]
    fn test_window_rejects_huge_threshold() {
        let now = Utc::now();
        assert!(window(now, Duration::from_secs(u64::MAX), Duration::from_secs(60)).is_err());
    }
}
