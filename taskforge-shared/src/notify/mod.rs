/// Outbound notifications
///
/// Notifications are email-like messages handed to a queue for delivery by
/// a separate mailer. Publishing is fire-and-forget from the engine's point
/// of view: callers log failures and move on, the primary write has
/// already committed.
///
/// # Wire Format
///
/// Each message is one JSON document:
///
/// ```json
/// {"to": "bob@example.com", "subject": "New task in Roadmap", "body": "..."}
/// ```
///
/// The Redis backend stores it in the `payload` field of a stream entry.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod fanout;

pub use fanout::{fan_out, FanoutReport};

/// Notification dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Message could not be encoded
    #[error("Failed to encode notification: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Queue backend rejected or never acknowledged the message
    #[error("Notification queue error: {0}")]
    Backend(String),
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Email verification link
    pub fn verification(to: &str, app_url: &str, code: &str) -> Self {
        Self::new(
            to,
            "Confirm your email",
            format!(
                "Follow this link to confirm your email address: {}/verification?code={}",
                app_url, code
            ),
        )
    }

    /// Project invitation link
    pub fn invitation(to: &str, app_url: &str, project_name: &str, code: &str) -> Self {
        Self::new(
            to,
            "Joining the project",
            format!(
                "You have been invited to join \"{}\". Accept the invitation: {}/projects/joining?code={}",
                project_name, app_url, code
            ),
        )
    }

    /// New task in a project the recipient belongs to
    pub fn task_created(
        to: &str,
        app_url: &str,
        project_name: &str,
        project_id: Uuid,
        task_name: &str,
    ) -> Self {
        Self::new(
            to,
            format!("New task in {}", project_name),
            format!(
                "Task \"{}\" was created in \"{}\": {}",
                task_name,
                project_name,
                project_link(app_url, project_id)
            ),
        )
    }

    /// Reminder for identities that stopped logging in
    pub fn inactivity_reminder(to: &str, app_url: &str) -> Self {
        Self::new(
            to,
            "We miss you",
            format!(
                "It has been a while since your last visit. Your projects are waiting: {}",
                app_url
            ),
        )
    }

    /// Registration anniversary notice
    pub fn anniversary(to: &str, app_url: &str) -> Self {
        Self::new(
            to,
            "Thank you for staying with us",
            format!(
                "You have been with TaskForge for a year. Thanks for building with us: {}",
                app_url
            ),
        )
    }
}

/// Link to a project page
pub fn project_link(app_url: &str, project_id: Uuid) -> String {
    format!("{}/projects/{}", app_url, project_id)
}

/// Outbound message queue
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Queue that keeps published messages in memory
///
/// Used by tests and by local runs without Redis.
#[derive(Debug, Default)]
pub struct MemoryNotificationQueue {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published so far, in publish order
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Drains the published messages
    pub fn take(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationQueue for MemoryNotificationQueue {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .map_err(|_| DispatchError::Backend("memory queue lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_json_shape() {
        let n = Notification::new("bob@example.com", "Hi", "Body");
        let json = serde_json::to_value(&n).unwrap();

        assert_eq!(json["to"], "bob@example.com");
        assert_eq!(json["subject"], "Hi");
        assert_eq!(json["body"], "Body");
    }

    #[test]
    fn test_links() {
        let verify = Notification::verification("a@example.com", "https://app.test", "abc");
        assert!(verify.body.contains("https://app.test/verification?code=abc"));

        let invite = Notification::invitation("a@example.com", "https://app.test", "Roadmap", "xyz");
        assert!(invite.body.contains("https://app.test/projects/joining?code=xyz"));

        let id = Uuid::new_v4();
        let task = Notification::task_created("a@example.com", "https://app.test", "Roadmap", id, "Draft");
        assert!(task.body.contains(&format!("https://app.test/projects/{}", id)));
        assert!(task.body.contains("Draft"));
    }

    #[tokio::test]
    async fn test_memory_queue_records_and_drains() {
        let queue = MemoryNotificationQueue::new();
        queue.publish(&Notification::new("a", "s", "b")).await.unwrap();
        queue.publish(&Notification::new("b", "s", "b")).await.unwrap();

        assert_eq!(queue.sent().len(), 2);
        assert_eq!(queue.take().len(), 2);
        assert!(queue.sent().is_empty());
    }
}
