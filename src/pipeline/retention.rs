//! Age-based retention for the permanent billings table.

use crate::config::RetentionConfig;
use crate::db::sql;
use crate::error::Result;
use crate::pipeline::RowCount;
use sqlx::PgConnection;
use tracing::info;

/// Delete rows strictly older than the configured number of months. A
/// disabled policy is a logged no-op: no delete statement is issued.
pub async fn apply_retention(
    conn: &mut PgConnection,
    config: &RetentionConfig,
) -> Result<RowCount> {
    if !config.enabled {
        info!("Telco billings data retention skipped (disabled in config)");
        return Ok(RowCount::Counted(0));
    }

    info!(
        "Applying telco billings data retention (older than {} months)...",
        config.months
    );
    let result = sqlx::query(sql::DELETE_EXPIRED_ROWS)
        .bind(config.months)
        .execute(&mut *conn)
        .await?;
    let deleted = RowCount::Counted(result.rows_affected());
    info!("Retention: deleted {deleted} old records");
    Ok(deleted)
}
