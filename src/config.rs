//! Application configuration loaded from the environment.
//!
//! All settings are read once at process start into an explicit [`EtlConfig`]
//! that is passed by reference into every component; nothing reads ambient
//! environment state after startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_CSV_FILE_PATH: &str = "/app/data/usage_sample.csv";

/// Number of columns every input CSV row must have.
pub const EXPECTED_CSV_COLUMNS: usize = 9;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub enabled: bool,
    pub months: i32,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub csv_path: PathBuf,
    pub expected_csv_columns: usize,
    pub retention: RetentionConfig,
    pub alert: AlertConfig,
}

impl EtlConfig {
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig {
                host: env_or("TELCO_DATABASE_HOST", "localhost"),
                port: env_parse("TELCO_DATABASE_PORT", 5432),
                user: env_or("TELCO_DATABASE_USER", "postgres"),
                password: env_or("TELCO_DATABASE_PASSWORD", ""),
                name: env_or("TELCO_DATABASE_NAME", "telco_database"),
            },
            csv_path: PathBuf::from(env_or("CSV_FILE_PATH", DEFAULT_CSV_FILE_PATH)),
            expected_csv_columns: env_parse("EXPECTED_CSV_COLUMNS", EXPECTED_CSV_COLUMNS),
            retention: RetentionConfig {
                enabled: env::var("ENABLE_RETENTION_POLICY")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
                months: env_parse("RETENTION_PERIOD_MONTHS", 6),
            },
            alert: AlertConfig {
                sender: env_opt("ALERT_SENDER_EMAIL"),
                receiver: env_opt("ALERT_RECEIVER_EMAIL"),
                smtp_server: env_opt("SMTP_SERVER"),
                smtp_port: env_parse("SMTP_PORT", 587),
                smtp_user: env_opt("SMTP_USER"),
                smtp_password: env_opt("SMTP_PASSWORD"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("True"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        // Key is unset in the test environment.
        assert_eq!(env_parse("TELCO_ETL_NO_SUCH_KEY", 42usize), 42);
    }
}
