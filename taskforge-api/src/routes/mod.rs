/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, verification, login and logout
/// - `users`: Profile and identity management
/// - `projects`: Projects, invitations and members
/// - `tasks`: Tasks

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
