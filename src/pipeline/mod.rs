//! Pipeline orchestration.
//!
//! Sequences validation, schema setup, staged load, quality checks, view
//! refresh, and retention inside a single database transaction. Any stage
//! error returns early; the dropped transaction rolls back, so nothing
//! from a failed run persists.

pub mod loader;
pub mod quality;
pub mod retention;
pub mod validate;
pub mod views;

use crate::alert;
use crate::config::EtlConfig;
use crate::db;
use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Rows affected by a bulk statement, or `Unknown` when the driver reports
/// no such signal. Distinct from `Counted(0)`: zero processed is not the
/// same as count not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Counted(u64),
    Unknown,
}

impl fmt::Display for RowCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowCount::Counted(n) => write!(f, "{n}"),
            RowCount::Unknown => write!(f, "unknown"),
        }
    }
}

/// Summary of one completed pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    pub rows_inserted: RowCount,
    pub quality_passed: bool,
    pub rows_deleted: RowCount,
}

/// Run the whole ETL process for one CSV file.
pub async fn run_etl(config: &EtlConfig, csv_path: &Path) -> Result<RunSummary> {
    let started = Instant::now();
    info!(
        "Starting telco billings DWH ETL process at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("Input data file: '{}'", csv_path.display());
    info!(
        "Retention policy enabled: {}, period: {} months",
        config.retention.enabled, config.retention.months
    );

    let mut step = Instant::now();
    validate::validate_csv_structure(csv_path, config.expected_csv_columns)?;
    info!("STEP 1 (input CSV validation) completed in {:.2?}", step.elapsed());

    step = Instant::now();
    let pool = db::connect(&config.database).await?;
    info!("STEP 2 (database connection) completed in {:.2?}", step.elapsed());

    let mut tx = pool.begin().await?;

    step = Instant::now();
    loader::ensure_schema(&mut tx).await?;
    info!("STEP 3 (pipeline DB structure setup) completed in {:.2?}", step.elapsed());

    step = Instant::now();
    let rows_inserted = loader::load(csv_path, &mut tx, config.expected_csv_columns).await?;
    info!(
        "STEP 4 (data loading - reported {rows_inserted} rows) completed in {:.2?}",
        step.elapsed()
    );

    step = Instant::now();
    let report = quality::run_quality_checks(&mut tx).await;
    if !report.passed {
        warn!("ALERT: Data quality issues detected: {:?}", report.issues);
        alert::send_alert(
            &config.alert,
            "Telco DWH ETL: Data Quality Issues Found",
            &report.issues,
        );
    }
    info!("STEP 5 (data quality checks) completed in {:.2?}", step.elapsed());

    step = Instant::now();
    views::refresh_analytics_views(&mut tx).await?;
    info!("STEP 6 (analytics views creation) completed in {:.2?}", step.elapsed());

    step = Instant::now();
    let rows_deleted = retention::apply_retention(&mut tx, &config.retention).await?;
    info!("STEP 7 (data retention policy) completed in {:.2?}", step.elapsed());

    tx.commit().await?;
    info!(
        "Telco billings DWH ETL process completed successfully in {:.2?}",
        started.elapsed()
    );

    Ok(RunSummary {
        rows_inserted,
        quality_passed: report.passed,
        rows_deleted,
    })
}
