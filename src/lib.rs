//! Batch ETL pipeline for telco usage-and-billing records.
//!
//! Ingests one CSV file per run into the `telco_billings_usage` warehouse
//! table through a staged, duplicate-suppressing bulk load, runs a fixed
//! pair of data-quality checks, redefines the analytics views, and
//! optionally purges aged records. The whole run executes inside a single
//! database transaction.

pub mod alert;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod pipeline;

pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use pipeline::{run_etl, RowCount, RunSummary};
