//! # TaskForge Worker Library
//!
//! Periodic background scans that notify identities outside the request
//! path.
//!
//! ## Modules
//!
//! - `config`: Job timing and backend configuration
//! - `jobs`: The `Job` trait and the reminder jobs
//! - `scheduler`: Per-job timers with graceful shutdown

pub mod config;
pub mod jobs;
pub mod scheduler;
