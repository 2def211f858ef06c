//! Database-backed pipeline tests.
//!
//! These exercise the staged load, deduplication, index lifecycle, quality
//! checks, and retention against a live PostgreSQL instance. Each test runs
//! inside a transaction that is never committed, so the database is left
//! untouched. Skipped unless TELCO_TEST_DATABASE_URL is set.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::io::Write;
use std::sync::OnceLock;
use telco_dwh_etl::config::RetentionConfig;
use telco_dwh_etl::db::sql;
use telco_dwh_etl::pipeline::{loader, quality, retention, RowCount};
use tempfile::NamedTempFile;

static DB_LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();

async fn db_guard() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TELCO_TEST_DATABASE_URL").ok()?;
    Some(
        PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("connect to test database"),
    )
}

/// Open a transaction with the schema in place and the permanent table
/// empty as far as this transaction can see.
async fn begin_clean(pool: &PgPool) -> Transaction<'_, Postgres> {
    let mut tx = pool.begin().await.unwrap();
    loader::ensure_schema(&mut tx).await.unwrap();
    sqlx::query("DELETE FROM telco_billings_usage")
        .execute(&mut *tx)
        .await
        .unwrap();
    tx
}

fn csv_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

async fn count_rows(tx: &mut Transaction<'_, Postgres>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM telco_billings_usage")
        .fetch_one(&mut **tx)
        .await
        .unwrap()
}

const ROW_A: &str = "1001,2024-01-15 10:00:00+00,voice,2,1,0,60.0,0.25000000,2024-01";
const ROW_B: &str = "1002,2024-01-16 11:30:00+00,sms,1,0,1,0.0,0.05000000,2024-01";
const ROW_C: &str = "1003,2024-02-01 09:15:00+00,data,3,1,1,1800.0,1.75000000,2024-02";

#[tokio::test]
async fn test_double_load_is_idempotent() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[ROW_A, ROW_B, ROW_C]);
    let first = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(first, RowCount::Counted(3));

    let second = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(second, RowCount::Counted(0));
    assert_eq!(count_rows(&mut tx).await, 3);
}

#[tokio::test]
async fn test_in_file_duplicates_collapse_to_one_row() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[ROW_A, ROW_A, ROW_A, ROW_B]);
    let inserted = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(inserted, RowCount::Counted(2));
    assert_eq!(count_rows(&mut tx).await, 2);
}

#[tokio::test]
async fn test_malformed_rows_are_skipped_not_fatal() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[ROW_A, "1001,voice,2024-01", ROW_B]);
    let inserted = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(inserted, RowCount::Counted(2));
}

#[tokio::test]
async fn test_absent_fields_still_produce_an_identity() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    // Empty customer id: must hash as an empty string, not null the key.
    let file = csv_file(&[",2024-01-15 10:00:00+00,voice,2,1,0,60.0,0.25000000,2024-01"]);
    let inserted = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(inserted, RowCount::Counted(1));

    let uuid: Option<String> =
        sqlx::query_scalar("SELECT event_uuid FROM telco_billings_usage LIMIT 1")
            .fetch_one(&mut *tx)
            .await
            .unwrap();
    assert_eq!(uuid.map(|u| u.len()), Some(32));
}

#[tokio::test]
async fn test_empty_file_short_circuits_to_zero() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[]);
    let inserted = loader::load(file.path(), &mut tx, 9).await.unwrap();
    assert_eq!(inserted, RowCount::Counted(0));
}

#[tokio::test]
async fn test_secondary_indexes_survive_a_zero_insert_load() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[ROW_A, ROW_B]);
    loader::load(file.path(), &mut tx, 9).await.unwrap();
    // Second load stages rows but inserts nothing; indexes must still be
    // restored afterwards.
    loader::load(file.path(), &mut tx, 9).await.unwrap();

    for (name, _) in sql::SECONDARY_INDEXES.iter().copied() {
        let exists = sqlx::query(sql::INDEX_EXISTS)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .unwrap();
        assert!(exists.is_some(), "index {name} missing after load");
    }
}

/// Insert a minimal row whose event time is `offset` (a SQL interval
/// expression) away from now.
async fn insert_row_at(tx: &mut Transaction<'_, Postgres>, offset: &str, uuid: &str) {
    let statement = format!(
        "INSERT INTO telco_billings_usage
             (customer_id, event_start_time, event_type, rate_plan_id, month, event_uuid)
         VALUES (1, CURRENT_TIMESTAMP + ({offset}), 'voice', 1, '2024-01', $1)"
    );
    sqlx::query(&statement).bind(uuid).execute(&mut **tx).await.unwrap();
}

#[tokio::test]
async fn test_retention_disabled_deletes_nothing() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    insert_row_at(&mut tx, "interval '-7 months'", "uuid-old").await;
    let config = RetentionConfig { enabled: false, months: 6 };
    let deleted = retention::apply_retention(&mut tx, &config).await.unwrap();
    assert_eq!(deleted, RowCount::Counted(0));
    assert_eq!(count_rows(&mut tx).await, 1);
}

#[tokio::test]
async fn test_retention_deletes_only_rows_older_than_the_period() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    insert_row_at(&mut tx, "interval '-7 months'", "uuid-old").await;
    insert_row_at(&mut tx, "interval '-6 months' + interval '1 minute'", "uuid-boundary").await;
    insert_row_at(&mut tx, "interval '-1 month'", "uuid-young").await;

    let config = RetentionConfig { enabled: true, months: 6 };
    let deleted = retention::apply_retention(&mut tx, &config).await.unwrap();
    assert_eq!(deleted, RowCount::Counted(1));

    let survivors: Vec<String> =
        sqlx::query_scalar("SELECT event_uuid FROM telco_billings_usage ORDER BY event_uuid")
            .fetch_all(&mut *tx)
            .await
            .unwrap();
    assert_eq!(survivors, ["uuid-boundary", "uuid-young"]);
}

#[tokio::test]
async fn test_quality_flags_future_dated_events() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    insert_row_at(&mut tx, "interval '2 days'", "uuid-future").await;
    let report = quality::run_quality_checks(&mut tx).await;
    assert!(!report.passed);
    assert!(report.issues.iter().any(|i| i.contains("Future-dated")));
}

#[tokio::test]
async fn test_quality_flags_missing_values_in_recent_rows() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    sqlx::query(
        "INSERT INTO telco_billings_usage (event_start_time, event_type, month, event_uuid)
         VALUES (CURRENT_TIMESTAMP - interval '1 hour', 'voice', '2024-01', 'uuid-nullcust')",
    )
    .execute(&mut *tx)
    .await
    .unwrap();

    let report = quality::run_quality_checks(&mut tx).await;
    assert!(!report.passed);
    assert!(report.issues.iter().any(|i| i.contains("Missing values")));
}

#[tokio::test]
async fn test_quality_passes_on_clean_past_data() {
    let Some(pool) = test_pool().await else { return };
    let _guard = db_guard().await;
    let mut tx = begin_clean(&pool).await;

    let file = csv_file(&[ROW_A, ROW_B]);
    loader::load(file.path(), &mut tx, 9).await.unwrap();
    let report = quality::run_quality_checks(&mut tx).await;
    assert!(report.passed, "unexpected issues: {:?}", report.issues);
}
