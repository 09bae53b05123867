//! # TaskForge Shared Library
//!
//! Authorization and session core shared by the TaskForge API server and
//! the reminder worker.
//!
//! ## Module Organization
//!
//! - `engine`: the operations hosts call, with deadlines and policy checks
//! - `auth`: password hashing, tokens and the access policy
//! - `models`: database models and their SQL
//! - `store`: persistence seams with Postgres and in-memory backends
//! - `session`: read-through session cache
//! - `notify`: outbound notifications and fan-out
//! - `redis`: Redis client, session cache and notification stream
//! - `db`: connection pool and migrations
//! - `config`: engine configuration
//! - `telemetry`: tracing subscriber setup

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod notify;
pub mod redis;
pub mod session;
pub mod store;
pub mod telemetry;

/// Current version of the TaskForge shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
