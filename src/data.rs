//! Transaction loading and scored-table export using Polars

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{RfmError, RfmResult};
use crate::model::CustomerRfm;

pub const CUSTOMER_ID: &str = "CustomerID";
pub const ORDER_ID: &str = "OrderID";
pub const PURCHASE_DATE: &str = "PurchaseDate";
pub const TRANSACTION_AMOUNT: &str = "TransactionAmount";

/// Columns every input table must carry, in the order they are checked.
pub const REQUIRED_COLUMNS: [&str; 4] = [CUSTOMER_ID, PURCHASE_DATE, ORDER_ID, TRANSACTION_AMOUNT];

/// Reference date used when the caller does not configure one.
pub const DEFAULT_REFERENCE_DATE: &str = "2023-07-01";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// One row of the input transaction log
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: String,
    /// Null order ids are kept as rows but do not count towards Frequency
    pub order_id: Option<String>,
    pub purchase_date: NaiveDateTime,
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<String>,
        order_id: impl Into<String>,
        purchase_date: NaiveDateTime,
        amount: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            order_id: Some(order_id.into()),
            purchase_date,
            amount,
        }
    }
}

/// Parse a purchase or reference date.
///
/// Accepts plain dates (`2023-07-01`, `07/01/2023`), naive date-times with an
/// optional fractional second, and RFC 3339 timestamps (converted to UTC).
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Parse the configured reference date for recency calculation
pub fn parse_reference_date(input: &str) -> RfmResult<NaiveDateTime> {
    parse_datetime(input).ok_or_else(|| RfmError::InvalidReferenceDate {
        input: input.to_string(),
    })
}

/// Read the raw CSV into a DataFrame with every column kept as text.
///
/// Typing is done per column in [`transactions_from_frame`] so identifiers
/// such as `00123` survive untouched.
pub fn read_transactions_frame(file_path: &str) -> RfmResult<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
        .map_err(|err| match err {
            PolarsError::NoData(_) => RfmError::EmptyInput {
                reason: format!("{file_path} contains no data"),
            },
            other => RfmError::Polars(other),
        })?;

    debug!(path = file_path, rows = df.height(), columns = df.width(), "read transaction table");
    Ok(df)
}

/// Load a CSV transaction log into typed records
///
/// # Arguments
/// * `file_path` - Path to a CSV file with CustomerID, OrderID, PurchaseDate
///   and TransactionAmount columns (extra columns are ignored)
///
/// # Returns
/// * One `Transaction` per row with a non-null CustomerID
pub fn load_transactions(file_path: &str) -> RfmResult<Vec<Transaction>> {
    if !Path::new(file_path).exists() {
        return Err(RfmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {file_path}"),
        )));
    }

    let df = read_transactions_frame(file_path)?;
    transactions_from_frame(&df)
}

/// Convert an already-loaded table into transactions, validating the column contract
pub fn transactions_from_frame(df: &DataFrame) -> RfmResult<Vec<Transaction>> {
    let present = df.get_column_names();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|name| !present.contains(*name)) {
        return Err(RfmError::MissingColumn {
            column: missing.to_string(),
        });
    }

    if df.height() == 0 {
        return Err(RfmError::EmptyInput {
            reason: "input table has no rows".to_string(),
        });
    }

    let customer_ids = text_column(df, CUSTOMER_ID)?;
    let order_ids = text_column(df, ORDER_ID)?;
    let purchase_dates = text_column(df, PURCHASE_DATE)?;
    let amounts = text_column(df, TRANSACTION_AMOUNT)?;

    let mut transactions = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for row in 0..df.height() {
        let Some(customer_id) = customer_ids[row].clone() else {
            skipped += 1;
            continue;
        };

        let raw_date = purchase_dates[row].as_deref().unwrap_or_default();
        let purchase_date = parse_datetime(raw_date).ok_or_else(|| RfmError::InvalidValue {
            column: PURCHASE_DATE.to_string(),
            row,
            value: raw_date.to_string(),
        })?;

        let amount = match amounts[row].as_deref() {
            None => 0.0,
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| RfmError::InvalidValue {
                    column: TRANSACTION_AMOUNT.to_string(),
                    row,
                    value: raw.to_string(),
                })?,
        };

        transactions.push(Transaction {
            customer_id,
            order_id: order_ids[row].clone(),
            purchase_date,
            amount,
        });
    }

    if skipped > 0 {
        warn!(skipped, "skipped rows without a CustomerID");
    }

    if transactions.is_empty() {
        return Err(RfmError::EmptyInput {
            reason: "no rows carry a CustomerID".to_string(),
        });
    }

    Ok(transactions)
}

/// Extract a column as optional strings, trimming whitespace and treating blanks as null
fn text_column(df: &DataFrame, name: &str) -> RfmResult<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|trimmed| !trimmed.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

/// Build the scored customer table as a DataFrame
pub fn scores_frame(customers: &[CustomerRfm]) -> RfmResult<DataFrame> {
    let customer_ids: Vec<String> = customers.iter().map(|c| c.customer_id.clone()).collect();
    let recency: Vec<i64> = customers.iter().map(|c| c.recency).collect();
    let frequency: Vec<u32> = customers.iter().map(|c| c.frequency).collect();
    let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();
    let r_scores: Vec<u32> = customers.iter().map(|c| u32::from(c.r_score)).collect();
    let f_scores: Vec<u32> = customers.iter().map(|c| u32::from(c.f_score)).collect();
    let m_scores: Vec<u32> = customers.iter().map(|c| u32::from(c.m_score)).collect();
    let rfm_scores: Vec<u32> = customers.iter().map(|c| u32::from(c.rfm_score)).collect();
    let segments: Vec<String> = customers.iter().map(|c| c.segment.label().to_string()).collect();
    let codes: Vec<String> = customers.iter().map(CustomerRfm::score_code).collect();

    let df = df!(
        CUSTOMER_ID => customer_ids,
        "Recency" => recency,
        "Frequency" => frequency,
        "Monetary" => monetary,
        "R_Score" => r_scores,
        "F_Score" => f_scores,
        "M_Score" => m_scores,
        "RFM_Score" => rfm_scores,
        "RFM_Segment" => segments,
        "RFM_Code" => codes,
    )?;
    Ok(df)
}

/// Write the scored customer table to CSV
pub fn export_scores(customers: &[CustomerRfm], output_path: &str) -> RfmResult<()> {
    let mut df = scores_frame(customers)?;
    let mut file = File::create(output_path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

    debug!(path = output_path, rows = df.height(), "exported scored customers");
    Ok(())
}
