//! Error types for loading and scoring transaction data

use thiserror::Error;

/// Errors raised while loading transactions or computing RFM scores.
///
/// Every variant is fatal for the dataset being processed: no partial
/// results are returned alongside an error.
#[derive(Error, Debug)]
pub enum RfmError {
    #[error("Required column missing from input: {column}")]
    MissingColumn { column: String },

    #[error("No transactions to score: {reason}")]
    EmptyInput { reason: String },

    #[error("Cannot split {metric} into 4 non-empty quartiles: {detail}")]
    DegenerateDistribution { metric: String, detail: String },

    #[error("Invalid value in column {column} at row {row}: {value:?}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid reference date: {input}")]
    InvalidReferenceDate { input: String },

    #[error("Unknown segment: {name}")]
    UnknownSegment { name: String },

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

pub type RfmResult<T> = Result<T, RfmError>;
