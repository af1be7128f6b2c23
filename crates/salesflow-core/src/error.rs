// crates/salesflow-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("object store operation failed: {0}")]
    Bucket(#[from] salesflow_bucket::BucketError),

    #[error("object {key} is not valid UTF-8: {source}")]
    Decode {
        key: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("table {table} column {column} row {row} is not a whole number: {value:?}")]
    NonIntegral {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("column {column} row {row} holds an unparseable date: {value:?}")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
