/// Database models for TaskForge
///
/// Each model owns its SQL. The async functions take a `&PgPool` (or a
/// connection when they must join a caller's transaction) and return
/// `sqlx::Error`; mapping to domain errors happens in [`crate::store`].
///
/// # Models
///
/// - `identity`: registered accounts and their public snapshot
/// - `session`: the session ledger
/// - `project`: projects, created together with the owner membership
/// - `membership`: project members and invitations
/// - `task`: tasks inside a project

pub mod identity;
pub mod membership;
pub mod project;
pub mod session;
pub mod task;
