//! Staged bulk load into the permanent billings table.
//!
//! Accepted rows are bulk-copied into a transaction-scoped temporary table,
//! then merged into `telco_billings_usage` with identity-based duplicate
//! suppression. The permanent table's secondary indexes are dropped for the
//! duration of the bulk insert and recreated afterwards. Must run inside an
//! already-open transaction supplied by the caller; nothing here commits.

use crate::db::sql;
use crate::error::Result;
use crate::pipeline::RowCount;
use csv::{ReaderBuilder, WriterBuilder};
use sqlx::PgConnection;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Create the permanent table, the identity function, and the secondary
/// indexes. Idempotent; must precede the first load on this connection.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    let started = Instant::now();
    info!("Setting up telco billings DDL structures...");

    sqlx::query(sql::CREATE_MAIN_TABLE).execute(&mut *conn).await?;
    sqlx::query(sql::CREATE_EVENT_UUID_FUNCTION)
        .execute(&mut *conn)
        .await?;
    for (name, column) in sql::SECONDARY_INDEXES.iter().copied() {
        sqlx::query(&sql::create_index(name, column, true))
            .execute(&mut *conn)
            .await?;
    }

    info!("DDL setup complete in {:.2?}", started.elapsed());
    Ok(())
}

/// Load the CSV at `path` into the permanent table. Returns the number of
/// rows actually inserted, which may be less than the rows staged when
/// duplicates were skipped.
pub async fn load(
    path: &Path,
    conn: &mut PgConnection,
    expected_columns: usize,
) -> Result<RowCount> {
    let started = Instant::now();
    let staging_table = staging_table_name();
    info!("Starting data load from '{}'", path.display());

    info!("Creating TEMP staging table {staging_table}");
    sqlx::query(&sql::create_staging_table(&staging_table))
        .execute(&mut *conn)
        .await?;

    let (buffer, accepted) = buffer_valid_rows(path, expected_columns)?;
    if accepted == 0 {
        info!("No valid rows in CSV to load");
        return Ok(RowCount::Counted(0));
    }

    let copy_started = Instant::now();
    info!("Copying {accepted} rows into staging table {staging_table}...");
    let mut copy = conn.copy_in_raw(&sql::copy_into_staging(&staging_table)).await?;
    copy.send(buffer.as_slice()).await?;
    let staged = copy.finish().await?;
    info!("Staged {staged} rows in {:.2?}", copy_started.elapsed());

    drop_secondary_indexes(&mut *conn).await?;

    let merge_started = Instant::now();
    info!("Inserting data from staging into {}...", sql::MAIN_TABLE);
    let inserted = sqlx::query(&sql::merge_from_staging(&staging_table))
        .execute(&mut *conn)
        .await?
        .rows_affected();
    info!(
        "Merge inserted {inserted} rows in {:.2?}",
        merge_started.elapsed()
    );
    if staged > inserted {
        info!("Skipped {} duplicate rows", staged - inserted);
    }

    recreate_secondary_indexes(&mut *conn).await?;

    info!("Data loading complete in {:.2?}", started.elapsed());
    Ok(RowCount::Counted(inserted))
}

/// Filter the file down to rows with the expected column count, serialized
/// into an in-memory CSV buffer ready for COPY. Mismatched rows are skipped
/// with a warning, never an error.
fn buffer_valid_rows(path: &Path, expected_columns: usize) -> Result<(Vec<u8>, usize)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(anyhow::Error::from)?;
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let mut accepted = 0usize;

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(anyhow::Error::from)?;
        if record.len() != expected_columns {
            warn!("Skipping malformed row {} in '{}'", i + 1, path.display());
            continue;
        }
        writer.write_record(&record).map_err(anyhow::Error::from)?;
        accepted += 1;
    }

    let buffer = writer.into_inner().map_err(anyhow::Error::from)?;
    Ok((buffer, accepted))
}

// Random token rather than a timestamp: two runs starting within the same
// time-resolution unit must not collide on the staging name.
fn staging_table_name() -> String {
    format!("telco_staging_{}", Uuid::new_v4().simple())
}

async fn drop_secondary_indexes(conn: &mut PgConnection) -> Result<()> {
    info!("Dropping secondary indexes from {} before merge...", sql::MAIN_TABLE);
    for (name, _) in sql::SECONDARY_INDEXES.iter().copied() {
        let exists = sqlx::query(sql::INDEX_EXISTS)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        if exists {
            info!("Dropping index {name}...");
            sqlx::query(&sql::drop_index(name)).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

async fn recreate_secondary_indexes(conn: &mut PgConnection) -> Result<()> {
    info!("Recreating secondary indexes on {}...", sql::MAIN_TABLE);
    for (name, column) in sql::SECONDARY_INDEXES.iter().copied() {
        sqlx::query(&sql::create_index(name, column, false))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
