/// Database layer
///
/// - `pool`: PostgreSQL pool construction, health check and stats
/// - `migrations`: embedded schema migrations
///
/// Models and their SQL live in [`crate::models`].

pub mod migrations;
pub mod pool;
