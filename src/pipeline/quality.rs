//! Post-load data quality checks.
//!
//! Two fixed checks run on the load transaction so they observe the rows
//! that were just merged. A failure here never aborts the run: any error is
//! downgraded into a failed report carrying the error text.

use crate::db::sql;
use sqlx::{PgConnection, Row};
use tracing::{info, warn};

/// Outcome of the post-load quality checks.
#[derive(Debug)]
pub struct QualityReport {
    pub passed: bool,
    pub issues: Vec<String>,
}

pub async fn run_quality_checks(conn: &mut PgConnection) -> QualityReport {
    info!("Performing telco billings data quality checks...");
    match checks(conn).await {
        Ok(report) => {
            if report.passed {
                info!("Data quality checks passed");
            } else {
                warn!("Data quality issues: {}", report.issues.join("; "));
            }
            report
        }
        Err(e) => QualityReport {
            passed: false,
            issues: vec![format!("DQ exception: {e}")],
        },
    }
}

async fn checks(conn: &mut PgConnection) -> Result<QualityReport, sqlx::Error> {
    let mut issues = Vec::new();

    info!("DQ check: missing values in recent data...");
    match sqlx::query(sql::CHECK_MISSING_VALUES)
        .fetch_optional(&mut *conn)
        .await?
    {
        Some(row) => {
            let missing_customer = row.try_get::<Option<i64>, _>(0)?.unwrap_or(0);
            let missing_time = row.try_get::<Option<i64>, _>(1)?.unwrap_or(0);
            let missing_type = row.try_get::<Option<i64>, _>(2)?.unwrap_or(0);
            let total = row.try_get::<Option<i64>, _>(3)?.unwrap_or(0);
            if let Some(issue) =
                missing_values_issue(missing_customer, missing_time, missing_type, total)
            {
                issues.push(issue);
            }
        }
        None => warn!("DQ (missing values): query returned no row"),
    }

    info!("DQ check: future-dated events...");
    match sqlx::query(sql::CHECK_FUTURE_DATES)
        .fetch_optional(&mut *conn)
        .await?
    {
        Some(row) => {
            let future_count = row.try_get::<Option<i64>, _>(0)?.unwrap_or(0);
            if let Some(issue) = future_dates_issue(future_count) {
                issues.push(issue);
            }
        }
        None => warn!("DQ (future dates): query returned no row"),
    }

    Ok(QualityReport {
        passed: issues.is_empty(),
        issues,
    })
}

fn missing_values_issue(
    missing_customer: i64,
    missing_time: i64,
    missing_type: i64,
    total: i64,
) -> Option<String> {
    if total > 0 && (missing_customer > 0 || missing_time > 0 || missing_type > 0) {
        Some(format!(
            "Missing values (cust/time/type): {missing_customer}/{missing_time}/{missing_type} in {total} recent rows"
        ))
    } else {
        None
    }
}

fn future_dates_issue(count: i64) -> Option<String> {
    (count > 0).then(|| format!("Future-dated events: {count}"))
}
