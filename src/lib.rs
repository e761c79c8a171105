//! RfmForge: customer segmentation from transaction logs using RFM scoring
//!
//! Transactions are grouped per customer into Recency, Frequency and Monetary
//! metrics, each metric is split into quartile scores, and the composite score
//! maps to a named segment. Charts and console reports are rendered from the
//! scored table.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{export_scores, load_transactions, parse_reference_date, Transaction};
pub use error::{RfmError, RfmResult};
pub use model::{aggregate_customers, compute_rfm, CustomerMetrics, CustomerRfm, Metric, RfmAnalysis, Segment};
pub use summary::{segment_counts, CorrelationMatrix, Overview, SegmentCount, SegmentCounts};
pub use viz::generate_visualization_report;

/// Result type for the CLI and report rendering
pub type Result<T> = anyhow::Result<T>;
