/// Authorization engine
///
/// The engine is the only component that talks to every backend. Hosts (the
/// HTTP API, the worker) resolve a session into a [`Principal`] once and then
/// pass that principal explicitly into each call; nothing is read from
/// request-scoped state.
///
/// # Operations
///
/// - identity: register, verify, resend verification, login, logout,
///   resolve, profile, identity by id, list, photo update, delete
/// - access: the four `can_*` checks over freshly loaded projects and tasks
/// - projects: create, get, list, update, delete, purge, invite, accept,
///   remove member
/// - tasks: create (with member fan-out), get, list, update, delete
/// - reminders: inactivity and anniversary scans used by the worker
///
/// # Deadlines and Cancellation
///
/// Every public operation runs under `operation_timeout`; expiry returns
/// [`EngineError::Transient`]. Callers holding a `CancellationToken` wrap the
/// call in [`Engine::run_cancellable`]. Dropping an operation's future rolls
/// back any open transaction, so an aborted call commits nothing.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskforge_shared::config::EngineConfig;
/// use taskforge_shared::engine::Engine;
/// use taskforge_shared::notify::MemoryNotificationQueue;
/// use taskforge_shared::session::MemorySessionCache;
/// use taskforge_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemorySessionCache::new()),
///     Arc::new(MemoryNotificationQueue::new()),
///     EngineConfig::default(),
/// );
///
/// engine.register("alice@example.com", "pw1").await?;
/// # Ok(())
/// # }
/// ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use validator::ValidateEmail;

use crate::auth::password::PasswordError;
use crate::config::EngineConfig;
use crate::models::identity::Principal;
use crate::notify::{Notification, NotificationQueue};
use crate::session::{SessionCache, SessionResolver};
use crate::store::{SessionLedger, Store, StoreError};

mod access;
mod identity;
mod projects;
mod reminders;
mod tasks;

pub use identity::IssuedSession;
pub use projects::ProjectDetail;
pub use reminders::window;
pub use tasks::CreateTask;

/// Errors surfaced by engine operations
///
/// Backend detail never leaks through these variants beyond a short
/// message; the full error is logged where it happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Email address not verified")]
    NotVerification,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Email already registered")]
    EmailExists,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Temporarily unavailable: {0}")]
    Transient(String),
}

impl EngineError {
    pub fn not_found(what: &str) -> Self {
        EngineError::NotFound(what.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::not_found("record"),
            StoreError::Conflict(detail) => {
                tracing::error!(error = %detail, "Unexpected store conflict");
                EngineError::Transient("conflicting write".to_string())
            }
            StoreError::Backend(detail) => {
                tracing::error!(error = %detail, "Store backend failure");
                EngineError::Transient("storage unavailable".to_string())
            }
        }
    }
}

impl From<PasswordError> for EngineError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "Password hashing failure");
        EngineError::Transient("credential check unavailable".to_string())
    }
}

/// The authorization and session core
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    sessions: SessionResolver,
    queue: Arc<dyn NotificationQueue>,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new<S>(
        store: Arc<S>,
        cache: Arc<dyn SessionCache>,
        queue: Arc<dyn NotificationQueue>,
        config: EngineConfig,
    ) -> Self
    where
        S: Store + 'static,
    {
        let ledger: Arc<dyn SessionLedger> = store.clone();
        let sessions = SessionResolver::new(cache, ledger, config.session_ttl);

        Self {
            store,
            sessions,
            queue,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    /// Runs `fut` unless `token` is cancelled first
    ///
    /// A token that is already cancelled wins without polling `fut` at all,
    /// so nothing is written.
    pub async fn run_cancellable<T, F>(
        &self,
        token: &CancellationToken,
        fut: F,
    ) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Engine operation cancelled");
                Err(EngineError::Transient("operation cancelled".to_string()))
            }
            result = fut => result,
        }
    }

    /// Applies the operation deadline
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, "Engine operation deadline exceeded");
                Err(EngineError::Transient("operation timed out".to_string()))
            }
        }
    }

    /// Publishes one notification, logging failures
    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.queue.publish(&notification).await {
            tracing::warn!(
                to = %notification.to,
                subject = %notification.subject,
                error = %e,
                "Failed to publish notification"
            );
        }
    }
}

/// Input limits
mod limits {
    pub const EMAIL_MAX: usize = 254;
    pub const PASSWORD_MAX: usize = 128;
    pub const PROJECT_NAME_MIN: usize = 5;
    pub const PROJECT_NAME_MAX: usize = 100;
    pub const TASK_NAME_MAX: usize = 100;
    pub const DESCRIPTION_MAX: usize = 2000;
    pub const PHOTO_MAX: usize = 2048;
}

fn validate_email(email: &str) -> Result<(), EngineError> {
    if email.is_empty() {
        return Err(EngineError::validation("email is required"));
    }
    if email.chars().count() > limits::EMAIL_MAX || !email.validate_email() {
        return Err(EngineError::validation("email is malformed"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), EngineError> {
    if password.is_empty() {
        return Err(EngineError::validation("password is required"));
    }
    if password.chars().count() > limits::PASSWORD_MAX {
        return Err(EngineError::validation("password is too long"));
    }
    Ok(())
}

fn validate_project_name(name: &str) -> Result<(), EngineError> {
    let len = name.chars().count();
    if !(limits::PROJECT_NAME_MIN..=limits::PROJECT_NAME_MAX).contains(&len) {
        return Err(EngineError::validation(format!(
            "project name must be {} to {} characters",
            limits::PROJECT_NAME_MIN,
            limits::PROJECT_NAME_MAX
        )));
    }
    Ok(())
}

fn validate_task_name(name: &str) -> Result<(), EngineError> {
    let len = name.chars().count();
    if len == 0 || len > limits::TASK_NAME_MAX {
        return Err(EngineError::validation(format!(
            "task name must be 1 to {} characters",
            limits::TASK_NAME_MAX
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), EngineError> {
    if description.chars().count() > limits::DESCRIPTION_MAX {
        return Err(EngineError::validation("description is too long"));
    }
    Ok(())
}

fn validate_photo(photo: &str) -> Result<(), EngineError> {
    if photo.is_empty() || photo.chars().count() > limits::PHOTO_MAX {
        return Err(EngineError::validation(format!(
            "photo reference must be 1 to {} characters",
            limits::PHOTO_MAX
        )));
    }
    Ok(())
}

/// Helper for `Option<Principal>` lookups that must exist
fn require_principal(principal: Option<Principal>) -> Result<Principal, EngineError> {
    principal.ok_or(EngineError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert_eq!(
            EngineError::from(StoreError::NotFound),
            EngineError::NotFound("record".to_string())
        );
        assert!(EngineError::from(StoreError::Backend("boom".to_string())).is_transient());
        assert!(EngineError::from(StoreError::Conflict("dup".to_string())).is_transient());
    }

    #[test]
    fn test_transient_hides_backend_detail() {
        let err = EngineError::from(StoreError::Backend("password=hunter2".to_string()));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("pw1").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_project_name_bounds() {
        assert!(validate_project_name("step").is_err());
        assert!(validate_project_name("steps").is_ok());
        assert!(validate_project_name(&"x".repeat(100)).is_ok());
        assert!(validate_project_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_task_fields() {
        assert!(validate_task_name("").is_err());
        assert!(validate_task_name("Draft").is_ok());
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"x".repeat(2001)).is_err());
        assert!(validate_photo("").is_err());
        assert!(validate_photo("https://cdn.example.com/a.png").is_ok());
    }
}
