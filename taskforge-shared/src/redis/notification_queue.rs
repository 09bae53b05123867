/// Redis Stream notification queue
///
/// Each notification is appended to one stream (default
/// `notifications:outbound`) with `XADD`, JSON-encoded in the `payload`
/// field. A mailer consumes the stream independently.
///
/// ```text
/// Engine ──publish()──> RedisNotificationQueue ──XADD──> notifications:outbound ──> mailer
/// ```
///
/// Writes retry with exponential backoff. Once retries are exhausted the
/// error is returned and the engine logs and drops the message.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::notify::{Notification, NotificationQueue};
/// use taskforge_shared::redis::client::{RedisClient, RedisConfig};
/// use taskforge_shared::redis::notification_queue::RedisNotificationQueue;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::from_env()?).await?;
/// let queue = RedisNotificationQueue::new(client, "notifications:outbound");
///
/// queue.publish(&Notification::new("bob@example.com", "Hello", "Welcome aboard")).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use redis::AsyncCommands;

use super::client::RedisClient;
use crate::notify::{DispatchError, Notification, NotificationQueue};

/// Stream field holding the JSON document
pub const PAYLOAD_FIELD: &str = "payload";

/// Retry behaviour for stream writes
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each attempt
    pub base_retry_delay_ms: u64,

    /// Upper bound for a single delay
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (1-based)
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_retry_delay_ms
            .saturating_mul(factor)
            .min(self.max_retry_delay_ms)
    }
}

#[derive(Clone)]
pub struct RedisNotificationQueue {
    client: RedisClient,
    stream_key: String,
    retry: RetryConfig,
}

impl RedisNotificationQueue {
    /// Creates a queue writing to `stream_key`, retrying `REDIS_MAX_RETRIES` times
    pub fn new(client: RedisClient, stream_key: impl Into<String>) -> Self {
        let retry = RetryConfig {
            max_retries: client.config().max_retries,
            ..Default::default()
        };
        Self::with_retry(client, stream_key, retry)
    }

    pub fn with_retry(client: RedisClient, stream_key: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            client,
            stream_key: stream_key.into(),
            retry,
        }
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    async fn xadd_with_retry(&self, payload: &str) -> Result<String, DispatchError> {
        let mut attempt = 0;

        loop {
            let mut conn = self.client.connection();
            let items = [(PAYLOAD_FIELD, payload)];
            let error = match self
                .client
                .bounded(conn.xadd::<_, _, _, _, String>(&self.stream_key, "*", &items[..]))
                .await
            {
                Ok(stream_id) => return Ok(stream_id),
                Err(e) => e.to_string(),
            };

            attempt += 1;
            if attempt > self.retry.max_retries {
                return Err(DispatchError::Backend(format!(
                    "XADD to {} failed after {} attempts: {}",
                    self.stream_key, attempt, error
                )));
            }

            let delay_ms = self.retry.delay_ms(attempt);
            tracing::warn!(
                stream_key = %self.stream_key,
                attempt = attempt,
                delay_ms = delay_ms,
                error = %error,
                "XADD failed, retrying"
            );
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
    }
}

#[async_trait]
impl NotificationQueue for RedisNotificationQueue {
    async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(notification)?;
        let stream_id = self.xadd_with_retry(&payload).await?;

        tracing::debug!(
            stream_key = %self.stream_key,
            stream_id = %stream_id,
            "Published notification"
        );
        Ok(())
    }
}
