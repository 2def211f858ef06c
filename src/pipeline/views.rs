//! Analytics view maintenance.
//!
//! Both views are fully redefined on every run; there is no incremental
//! maintenance. Errors here abort the enclosing transaction.

use crate::db::sql;
use crate::error::Result;
use sqlx::PgConnection;
use tracing::info;

pub async fn refresh_analytics_views(conn: &mut PgConnection) -> Result<()> {
    info!("Creating/updating telco billings analytics views...");
    sqlx::query(sql::CREATE_USAGE_DISTRIBUTION_VIEW)
        .execute(&mut *conn)
        .await?;
    sqlx::query(sql::CREATE_MONTHLY_TRENDS_VIEW)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
