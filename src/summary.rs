//! Derived views over a scored customer table

use ndarray::{Array2, Axis};
use serde::Serialize;

use crate::model::{CustomerRfm, Metric, RfmAnalysis, Segment};

/// Lowest and highest achievable composite scores
pub const MIN_RFM_SCORE: u8 = 3;
pub const MAX_RFM_SCORE: u8 = 12;

/// Number of customers in one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentCount {
    #[serde(rename = "RFM_Segment")]
    pub segment: Segment,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Customers per segment, largest first.
///
/// Ties keep the segment ladder order. Segments without customers are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SegmentCounts {
    entries: Vec<SegmentCount>,
}

impl SegmentCounts {
    pub fn get(&self, segment: Segment) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.segment == segment)
            .map_or(0, |entry| entry.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentCount> {
        self.entries.iter()
    }

    /// Number of segments with at least one customer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Count customers per segment
pub fn segment_counts(customers: &[CustomerRfm]) -> SegmentCounts {
    let mut tally = vec![0usize; Segment::ALL.len()];
    for customer in customers {
        if let Some(slot) = Segment::ALL.iter().position(|s| *s == customer.segment) {
            tally[slot] += 1;
        }
    }

    let mut entries: Vec<SegmentCount> = Segment::ALL
        .iter()
        .zip(tally)
        .filter(|(_, count)| *count > 0)
        .map(|(&segment, count)| SegmentCount { segment, count })
        .collect();

    // Stable sort keeps ladder order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    SegmentCounts { entries }
}

/// Pearson correlation of Recency, Frequency and Monetary within one segment.
///
/// Entries are `NaN` when undefined: fewer than two customers, or a metric
/// with no variance. They are never replaced by zero.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub segment: Segment,
    pub sample_size: usize,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Correlation between two metrics, `None` when undefined
    pub fn get(&self, row: Metric, column: Metric) -> Option<f64> {
        let value = self.values[[row.index(), column.index()]];
        (!value.is_nan()).then_some(value)
    }

    /// Raw 3x3 matrix in Recency, Frequency, Monetary order
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// True when no entry is defined
    pub fn is_undefined(&self) -> bool {
        self.values.iter().all(|value| value.is_nan())
    }
}

/// Pearson correlation between the columns of `samples` (rows are observations)
pub fn pearson_matrix(samples: &Array2<f64>) -> Array2<f64> {
    let n_features = samples.ncols();
    let mut result = Array2::from_elem((n_features, n_features), f64::NAN);

    if samples.nrows() < 2 {
        return result;
    }

    let Some(means) = samples.mean_axis(Axis(0)) else {
        return result;
    };
    let centered = samples - &means;
    let cross = centered.t().dot(&centered);

    for i in 0..n_features {
        for j in i..n_features {
            let divisor = (cross[[i, i]] * cross[[j, j]]).sqrt();
            if divisor > 0.0 {
                let value = cross[[i, j]] / divisor;
                result[[i, j]] = value;
                result[[j, i]] = value;
            }
        }
    }

    result
}

/// Headline figures for the scored table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overview {
    pub total_customers: usize,
    pub average_recency: f64,
    pub average_frequency: f64,
    pub average_monetary: f64,
}

impl RfmAnalysis {
    /// Customers in one segment, in table order
    pub fn segment(&self, segment: Segment) -> Vec<&CustomerRfm> {
        self.customers
            .iter()
            .filter(|customer| customer.segment == segment)
            .collect()
    }

    /// Correlation of the three metrics among customers of one segment
    pub fn correlation(&self, segment: Segment) -> CorrelationMatrix {
        let members = self.segment(segment);
        let mut samples = Array2::zeros((members.len(), Metric::ALL.len()));
        for (row, customer) in members.iter().enumerate() {
            for metric in Metric::ALL {
                samples[[row, metric.index()]] = customer.metric(metric);
            }
        }

        CorrelationMatrix {
            segment,
            sample_size: members.len(),
            values: pearson_matrix(&samples),
        }
    }

    pub fn overview(&self) -> Overview {
        let total_customers = self.customers.len();
        let mean = |metric: Metric| {
            if total_customers == 0 {
                return 0.0;
            }
            self.customers.iter().map(|c| c.metric(metric)).sum::<f64>() / total_customers as f64
        };

        Overview {
            total_customers,
            average_recency: mean(Metric::Recency),
            average_frequency: mean(Metric::Frequency),
            average_monetary: mean(Metric::Monetary),
        }
    }

    /// Customers per composite score, one entry for every score from 3 to 12
    pub fn score_distribution(&self) -> Vec<(u8, usize)> {
        (MIN_RFM_SCORE..=MAX_RFM_SCORE)
            .map(|score| {
                let count = self.customers.iter().filter(|c| c.rfm_score == score).count();
                (score, count)
            })
            .collect()
    }
}
