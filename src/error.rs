use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("input file not found: '{}'", .0.display())]
    MissingInput(PathBuf),

    #[error("CSV validation error (row {row}): expected {expected} columns, found {found}")]
    Validation {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl EtlError {
    /// Alert subject line for this error's fatal category.
    pub fn alert_subject(&self) -> &'static str {
        match self {
            EtlError::MissingInput(_) => "Telco ETL Critical Failure: Input File Missing",
            EtlError::Validation { .. } => "Telco ETL Critical Failure: Data Validation Error",
            EtlError::Database(_) => "Telco ETL Critical Failure: Database Error",
            EtlError::Io(_) | EtlError::Unexpected(_) => {
                "Telco ETL Critical Failure: Unexpected System Error"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
