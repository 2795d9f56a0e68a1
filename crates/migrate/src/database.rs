//! Database connectivity - PostgreSQL pool construction
//!
//! Builds the connection pool the engine runs over and verifies connectivity
//! up front, so a bad URL or unreachable server fails at startup instead of
//! at the first change-set.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{MigrateError, MigrateResult};

/// Open a PostgreSQL pool for the given connection URL.
///
/// `sqlx` establishes the minimum connections eagerly, which doubles as the
/// startup connectivity check.
pub async fn connect(database_url: &str) -> MigrateResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(25)
        .min_connections(5)
        .max_lifetime(Duration::from_secs(5 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| MigrateError::database("connect to database", e))
}
