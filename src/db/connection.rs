//! Database connection management using sqlx

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

/// Build the connection pool for a pipeline run.
///
/// One connection: the whole run executes on a single transaction.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    debug!("Connecting to database '{}'...", config.name);

    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name);

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}
