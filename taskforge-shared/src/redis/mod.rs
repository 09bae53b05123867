/// Redis backends
///
/// - `client`: shared connection manager, config, health check
/// - `session_cache`: [`crate::session::SessionCache`] over `SET EX` / `GET` / `DEL`
/// - `notification_queue`: [`crate::notify::NotificationQueue`] over `XADD`
///
/// ```text
/// SessionResolver ──GET/SET EX/DEL──> session:{digest}   (TTL)
/// Engine fan-out  ──XADD────────────> notifications:outbound
/// ```

pub mod client;
pub mod notification_queue;
pub mod session_cache;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use notification_queue::RedisNotificationQueue;
pub use session_cache::RedisSessionCache;
