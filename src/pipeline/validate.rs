//! CSV structural validation.
//!
//! A cheap sanity gate over the first few rows, not schema validation:
//! types and value ranges are left to PostgreSQL at COPY time.

use crate::error::{EtlError, Result};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::info;

/// Number of leading data rows inspected.
const SAMPLE_ROWS: usize = 5;

/// Check that `path` exists and that each of its first [`SAMPLE_ROWS`] rows
/// has exactly `expected_columns` columns. Fails on the first mismatch,
/// reporting the 1-based row index.
pub fn validate_csv_structure(path: &Path, expected_columns: usize) -> Result<()> {
    info!("Validating CSV structure for '{}'", path.display());
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(anyhow::Error::from)?;

    for (i, record) in reader.records().take(SAMPLE_ROWS).enumerate() {
        let record = record.map_err(anyhow::Error::from)?;
        if record.len() != expected_columns {
            return Err(EtlError::Validation {
                row: i + 1,
                expected: expected_columns,
                found: record.len(),
            });
        }
    }

    info!("CSV column count validation passed for '{}'", path.display());
    Ok(())
}
