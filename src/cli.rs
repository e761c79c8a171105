//! Command-line interface definitions and argument parsing

use chrono::NaiveDateTime;
use clap::Parser;

use crate::data::{parse_reference_date, DEFAULT_REFERENCE_DATE};
use crate::model::Segment;

/// Customer segmentation CLI using quartile-based RFM scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "rfm_data.csv")]
    pub input: String,

    /// Date recency is measured from (YYYY-MM-DD or RFC 3339)
    #[arg(short, long, default_value = DEFAULT_REFERENCE_DATE)]
    pub reference_date: String,

    /// Output path for the segment chart; other charts are written next to it
    #[arg(short, long, default_value = "rfm_segments.png")]
    pub output: String,

    /// Segment to inspect in detail (subset statistics and correlation matrix)
    #[arg(short, long, default_value = "Champions")]
    pub segment: String,

    /// Write the scored customer table to this CSV file
    #[arg(long)]
    pub export: Option<String>,

    /// Write the segment counts to this JSON file
    #[arg(long)]
    pub counts_json: Option<String>,

    /// Print the first N input rows before scoring
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the configured reference date
    pub fn reference_date(&self) -> crate::Result<NaiveDateTime> {
        Ok(parse_reference_date(&self.reference_date)?)
    }

    /// Parse the segment name
    /// Accepts labels in any case, e.g. "loyal customers" or "Loyal-Customers"
    pub fn segment(&self) -> crate::Result<Segment> {
        self.segment.parse::<Segment>().map_err(|_| {
            let known: Vec<&str> = Segment::ALL.iter().map(|s| s.label()).collect();
            anyhow::anyhow!("Unknown segment '{}'; expected one of: {}", self.segment, known.join(", "))
        })
    }
}
