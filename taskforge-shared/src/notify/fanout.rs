/// Best-effort fan-out of notifications
///
/// Publishes run concurrently; each failure is logged and counted, never
/// returned. Ordering across recipients is not preserved.

use futures::future::join_all;

use super::{Notification, NotificationQueue};

/// Outcome of a fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Messages handed to the queue
    pub attempted: usize,

    /// Messages the queue acknowledged
    pub delivered: usize,
}

impl FanoutReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Publishes every message, swallowing failures
pub async fn fan_out(queue: &dyn NotificationQueue, messages: Vec<Notification>) -> FanoutReport {
    let attempted = messages.len();

    let results = join_all(messages.iter().map(|message| async move {
        match queue.publish(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(to = %message.to, error = %e, "Failed to publish notification");
                false
            }
        }
    }))
    .await;

    let report = FanoutReport {
        attempted,
        delivered: results.into_iter().filter(|ok| *ok).count(),
    };

    if report.failed() > 0 {
        tracing::warn!(
            attempted = report.attempted,
            delivered = report.delivered,
            "Notification fan-out partially failed"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DispatchError, MemoryNotificationQueue};
    use async_trait::async_trait;

    struct RejectingQueue {
        reject: &'static str,
    }

    #[async_trait]
    impl NotificationQueue for RejectingQueue {
        async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
            if notification.to == self.reject {
                Err(DispatchError::Backend("rejected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_fan_out_delivers_all() {
        let queue = MemoryNotificationQueue::new();
        let messages = vec![
            Notification::new("b@example.com", "s", "b"),
            Notification::new("c@example.com", "s", "b"),
        ];

        let report = fan_out(&queue, messages).await;

        assert_eq!(report, FanoutReport { attempted: 2, delivered: 2 });
        let mut to: Vec<String> = queue.sent().into_iter().map(|n| n.to).collect();
        to.sort();
        assert_eq!(to, vec!["b@example.com", "c@example.com"]);
    }

    #[tokio::test]
    async fn test_fan_out_swallows_failures() {
        let queue = RejectingQueue { reject: "b@example.com" };
        let messages = vec![
            Notification::new("b@example.com", "s", "b"),
            Notification::new("c@example.com", "s", "b"),
        ];

        let report = fan_out(&queue, messages).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_fan_out_empty() {
        let queue = MemoryNotificationQueue::new();
        assert_eq!(fan_out(&queue, Vec::new()).await, FanoutReport::default());
    }
}
