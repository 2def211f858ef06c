//! SQL statements for the telco billings warehouse.
//!
//! All DDL and DML text lives here so the statements are easy to review in
//! one place. Statements that need a generated table name are builders.

pub const MAIN_TABLE: &str = "telco_billings_usage";

pub const CREATE_MAIN_TABLE: &str = "
CREATE TABLE IF NOT EXISTS telco_billings_usage (
    customer_id INTEGER,
    event_start_time TIMESTAMP WITH TIME ZONE,
    event_type VARCHAR(50),
    rate_plan_id INTEGER,
    billing_flag_one INTEGER,
    billing_flag_two INTEGER,
    duration FLOAT8,
    charge NUMERIC(18, 8),
    month VARCHAR(7),
    event_uuid VARCHAR(32) PRIMARY KEY
);
";

/// Not STRICT: a NULL field must hash as an empty string, not null out the
/// primary key.
pub const CREATE_EVENT_UUID_FUNCTION: &str = "
CREATE OR REPLACE FUNCTION generate_event_uuid(
    p_customer_id INTEGER,
    p_event_time TIMESTAMP WITH TIME ZONE,
    p_event_type TEXT,
    p_rate_plan_id INTEGER,
    p_charge NUMERIC
)
RETURNS VARCHAR(32) AS $$
BEGIN
    RETURN MD5(
        COALESCE(p_customer_id::TEXT, '') || '_' ||
        COALESCE(p_event_time::TEXT, '') || '_' ||
        COALESCE(p_event_type, '') || '_' ||
        COALESCE(p_rate_plan_id::TEXT, '') || '_' ||
        COALESCE(p_charge::TEXT, '')
    );
END;
$$ LANGUAGE plpgsql IMMUTABLE;
";

pub const CHECK_MISSING_VALUES: &str = "
    SELECT
        SUM(CASE WHEN customer_id IS NULL THEN 1 ELSE 0 END) as missing_customer_id,
        SUM(CASE WHEN event_start_time IS NULL THEN 1 ELSE 0 END) as missing_time,
        SUM(CASE WHEN event_type IS NULL THEN 1 ELSE 0 END) as missing_event_type,
        COUNT(*) as total_rows_checked
    FROM telco_billings_usage
    WHERE (event_start_time >= (CURRENT_TIMESTAMP - INTERVAL '1 day'))
      AND (event_start_time < CURRENT_TIMESTAMP);
";

pub const CHECK_FUTURE_DATES: &str = "
    SELECT COUNT(*) as future_date_count
    FROM telco_billings_usage
    WHERE event_start_time > CURRENT_TIMESTAMP;
";

pub const CREATE_USAGE_DISTRIBUTION_VIEW: &str = "
    CREATE OR REPLACE VIEW analytics_usage_distribution AS
    SELECT
        event_type as service_type,
        rate_plan_id,
        COUNT(*) as event_count,
        SUM(duration) as total_duration,
        SUM(charge) as total_charge,
        COUNT(DISTINCT customer_id) as customer_count
    FROM telco_billings_usage
    GROUP BY event_type, rate_plan_id
    ORDER BY event_type, rate_plan_id;
";

pub const CREATE_MONTHLY_TRENDS_VIEW: &str = "
    CREATE OR REPLACE VIEW analytics_monthly_trends AS
    SELECT
        month,
        event_type as service_type,
        COUNT(*) as event_count,
        COUNT(DISTINCT customer_id) as customer_count,
        SUM(duration) as total_duration,
        SUM(charge) as total_charge
    FROM telco_billings_usage
    GROUP BY month, event_type
    ORDER BY month, event_type;
";

/// Strictly older than the cutoff: boundary-equal rows survive.
pub const DELETE_EXPIRED_ROWS: &str = "
    DELETE FROM telco_billings_usage
    WHERE event_start_time < (CURRENT_TIMESTAMP - make_interval(months => $1));
";

/// Secondary (non-PK) indexes, droppable and recreatable as a set around
/// bulk loads.
pub const SECONDARY_INDEXES: &[(&str, &str)] = &[
    ("idx_billing_customer_id", "customer_id"),
    ("idx_billing_event_time", "event_start_time"),
    ("idx_billing_event_type", "event_type"),
    ("idx_billing_month", "month"),
];

pub const INDEX_EXISTS: &str = "
    SELECT 1 FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relname = $1 AND n.nspname = 'public';
";

pub fn create_index(name: &str, column: &str, if_not_exists: bool) -> String {
    let clause = if if_not_exists { "IF NOT EXISTS " } else { "" };
    format!("CREATE INDEX {clause}{name} ON {MAIN_TABLE}({column});")
}

pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX IF EXISTS {name};")
}

/// Column list shared by the staging and permanent tables; the identity
/// column is excluded because it is computed at merge time.
pub const STAGING_COLUMNS: &str = "customer_id, event_start_time, event_type, rate_plan_id, \
     billing_flag_one, billing_flag_two, duration, charge, month";

pub fn create_staging_table(name: &str) -> String {
    format!(
        "CREATE TEMP TABLE {name} (
            customer_id INTEGER, event_start_time TIMESTAMP WITH TIME ZONE,
            event_type VARCHAR(50), rate_plan_id INTEGER,
            billing_flag_one INTEGER, billing_flag_two INTEGER,
            duration FLOAT8, charge NUMERIC(18, 8), month VARCHAR(7)
        ) ON COMMIT DROP;"
    )
}

pub fn copy_into_staging(name: &str) -> String {
    format!("COPY {name} ({STAGING_COLUMNS}) FROM STDIN WITH (FORMAT csv, NULL '')")
}

pub fn merge_from_staging(name: &str) -> String {
    format!(
        "INSERT INTO {MAIN_TABLE} ({STAGING_COLUMNS}, event_uuid)
         SELECT s.*, generate_event_uuid(
             s.customer_id, s.event_start_time, s.event_type, s.rate_plan_id, s.charge)
         FROM {name} s
         ON CONFLICT (event_uuid) DO NOTHING;"
    )
}
