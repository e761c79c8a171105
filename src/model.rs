//! RFM scoring engine: per-customer aggregation, quartile binning and segment assignment

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::debug;

use crate::data::Transaction;
use crate::error::{RfmError, RfmResult};
use crate::summary::{segment_counts, SegmentCounts};

/// Number of score buckets per metric
pub const QUARTILES: usize = 4;

/// The three RFM metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Recency => "Recency",
            Metric::Frequency => "Frequency",
            Metric::Monetary => "Monetary",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Metric::Recency => 0,
            Metric::Frequency => 1,
            Metric::Monetary => 2,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named customer segment derived from the composite RFM score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Segment {
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "Recent Customers")]
    RecentCustomers,
    Promising,
    #[serde(rename = "Need Attention")]
    NeedAttention,
    #[serde(rename = "At Risk")]
    AtRisk,
    Lost,
}

impl Segment {
    /// Segments from the highest score threshold down
    pub const ALL: [Segment; 8] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::RecentCustomers,
        Segment::Promising,
        Segment::NeedAttention,
        Segment::AtRisk,
        Segment::Lost,
    ];

    /// Map a composite score to its segment, checking thresholds from the top.
    ///
    /// Composite scores never drop below 3, so `Lost` is not produced by
    /// [`compute_rfm`]; the branch is kept so the ladder stays complete.
    pub fn from_score(score: u8) -> Self {
        match score {
            9..=u8::MAX => Segment::Champions,
            8 => Segment::LoyalCustomers,
            7 => Segment::PotentialLoyalists,
            6 => Segment::RecentCustomers,
            5 => Segment::Promising,
            4 => Segment::NeedAttention,
            3 => Segment::AtRisk,
            _ => Segment::Lost,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::PotentialLoyalists => "Potential Loyalists",
            Segment::RecentCustomers => "Recent Customers",
            Segment::Promising => "Promising",
            Segment::NeedAttention => "Need Attention",
            Segment::AtRisk => "At Risk",
            Segment::Lost => "Lost",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = RfmError;

    /// Case-insensitive; spaces, dashes and underscores are interchangeable
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        Segment::ALL
            .into_iter()
            .find(|segment| normalize_label(segment.label()) == wanted)
            .ok_or_else(|| RfmError::UnknownSegment { name: s.to_string() })
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Raw per-customer metrics before scoring
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Whole days between the reference date and the latest purchase
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
}

/// Scored customer row
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// Sum of the three sub-scores, 3..=12
    pub rfm_score: u8,
    pub segment: Segment,
}

impl CustomerRfm {
    /// Digits of the three sub-scores, e.g. `"143"`
    pub fn score_code(&self) -> String {
        format!("{}{}{}", self.r_score, self.f_score, self.m_score)
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Recency => self.recency as f64,
            Metric::Frequency => f64::from(self.frequency),
            Metric::Monetary => self.monetary,
        }
    }
}

/// Result of one scoring run
#[derive(Debug, Clone)]
pub struct RfmAnalysis {
    pub reference_date: NaiveDateTime,
    /// Scored customers, ordered by customer id
    pub customers: Vec<CustomerRfm>,
    pub segment_counts: SegmentCounts,
}

/// Score every customer in a transaction log
///
/// # Arguments
/// * `transactions` - Full transaction log
/// * `reference_date` - Fixed date recency is measured from
///
/// # Returns
/// * Scored customer table and per-segment counts. Customers whose total
///   spend is not positive are dropped before quartiles are computed.
pub fn compute_rfm(
    transactions: &[Transaction],
    reference_date: NaiveDateTime,
) -> RfmResult<RfmAnalysis> {
    if transactions.is_empty() {
        return Err(RfmError::EmptyInput {
            reason: "transaction log is empty".to_string(),
        });
    }

    let metrics = aggregate_customers(transactions, reference_date);
    let total_customers = metrics.len();

    // Finite amounts can still overflow when summed
    if let Some((row, overflowed)) = metrics.iter().enumerate().find(|(_, m)| !m.monetary.is_finite()) {
        return Err(RfmError::InvalidValue {
            column: Metric::Monetary.label().to_string(),
            row,
            value: format!("{} (customer {})", overflowed.monetary, overflowed.customer_id),
        });
    }

    let retained: Vec<CustomerMetrics> = metrics.into_iter().filter(|m| m.monetary > 0.0).collect();
    debug!(
        customers = total_customers,
        excluded = total_customers - retained.len(),
        "aggregated transactions per customer"
    );

    if retained.is_empty() {
        return Err(RfmError::EmptyInput {
            reason: "no customer has a positive total spend".to_string(),
        });
    }

    let recency: Vec<f64> = retained.iter().map(|m| m.recency as f64).collect();
    let frequency: Vec<f64> = retained.iter().map(|m| f64::from(m.frequency)).collect();
    let monetary: Vec<f64> = retained.iter().map(|m| m.monetary).collect();

    // Only Frequency is ranked first: many customers share a purchase count
    let r_buckets = quartile_buckets(&recency, Metric::Recency)?;
    let f_buckets = quartile_buckets(&ordinal_rank(&frequency), Metric::Frequency)?;
    let m_buckets = quartile_buckets(&monetary, Metric::Monetary)?;

    let customers: Vec<CustomerRfm> = retained
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let r_score = ascending_score(r_buckets[i]);
            let f_score = descending_score(f_buckets[i]);
            let m_score = descending_score(m_buckets[i]);
            let rfm_score = r_score + f_score + m_score;

            CustomerRfm {
                customer_id: m.customer_id,
                recency: m.recency,
                frequency: m.frequency,
                monetary: m.monetary,
                r_score,
                f_score,
                m_score,
                rfm_score,
                segment: Segment::from_score(rfm_score),
            }
        })
        .collect();

    let segment_counts = segment_counts(&customers);
    debug!(customers = customers.len(), segments = segment_counts.len(), "scored customers");

    Ok(RfmAnalysis {
        reference_date,
        customers,
        segment_counts,
    })
}

#[derive(Debug)]
struct Accumulator {
    last_purchase: NaiveDateTime,
    orders: u32,
    spend: f64,
}

/// Group transactions by customer and derive Recency, Frequency and Monetary.
///
/// No filtering is applied. The result is ordered by customer id (see
/// [`compare_customer_ids`]), which is also the tie-break order for Frequency.
pub fn aggregate_customers(
    transactions: &[Transaction],
    reference_date: NaiveDateTime,
) -> Vec<CustomerMetrics> {
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();

    for tx in transactions {
        let acc = groups.entry(tx.customer_id.as_str()).or_insert(Accumulator {
            last_purchase: tx.purchase_date,
            orders: 0,
            spend: 0.0,
        });
        acc.last_purchase = acc.last_purchase.max(tx.purchase_date);
        if tx.order_id.is_some() {
            acc.orders += 1;
        }
        acc.spend += tx.amount;
    }

    let mut metrics: Vec<CustomerMetrics> = groups
        .into_iter()
        .map(|(customer_id, acc)| CustomerMetrics {
            customer_id: customer_id.to_string(),
            recency: floor_days(reference_date - acc.last_purchase),
            frequency: acc.orders,
            monetary: acc.spend,
        })
        .collect();

    metrics.sort_by(|a, b| compare_customer_ids(&a.customer_id, &b.customer_id));
    metrics
}

/// Whole days in a duration, rounded towards negative infinity
fn floor_days(delta: TimeDelta) -> i64 {
    let days = delta.num_days();
    if delta < TimeDelta::days(days) {
        days - 1
    } else {
        days
    }
}

/// Order customer ids numerically when both are integers.
///
/// Integer ids sort before non-integer ids, which compare as plain strings.
pub fn compare_customer_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Strict 1-based ranks; equal values are ranked by their position
pub fn ordinal_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = (position + 1) as f64;
    }
    ranks
}

/// Percentile of sorted data, interpolating linearly between closest ranks
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Minimum, quartile boundaries and maximum of `values`.
///
/// Fails when the boundaries are not strictly increasing, since the buckets
/// they delimit would overlap.
pub fn quartile_edges(values: &[f64], metric: Metric) -> RfmResult<[f64; QUARTILES + 1]> {
    if values.is_empty() {
        return Err(RfmError::DegenerateDistribution {
            metric: metric.to_string(),
            detail: "no values".to_string(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges = [0.0; QUARTILES + 1];
    for (k, edge) in edges.iter_mut().enumerate() {
        *edge = percentile(&sorted, k as f64 / QUARTILES as f64);
    }

    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(RfmError::DegenerateDistribution {
            metric: metric.to_string(),
            detail: format!("quartile boundaries collapse: {edges:?}"),
        });
    }

    Ok(edges)
}

/// Assign each value to a quartile bucket in `0..QUARTILES`.
///
/// Buckets are closed on the right and the first bucket also holds the
/// minimum. Every bucket must end up non-empty.
pub fn quartile_buckets(values: &[f64], metric: Metric) -> RfmResult<Vec<usize>> {
    let edges = quartile_edges(values, metric)?;

    let buckets: Vec<usize> = values
        .iter()
        .map(|&value| {
            edges[1..]
                .iter()
                .position(|&upper| value <= upper)
                .unwrap_or(QUARTILES - 1)
        })
        .collect();

    let mut sizes = [0usize; QUARTILES];
    for &bucket in &buckets {
        sizes[bucket] += 1;
    }

    if let Some(empty) = sizes.iter().position(|&size| size == 0) {
        return Err(RfmError::DegenerateDistribution {
            metric: metric.to_string(),
            detail: format!("quartile {} is empty (bucket sizes {sizes:?})", empty + 1),
        });
    }

    Ok(buckets)
}

/// Lower values score lower (Recency: most recent gets 1)
fn ascending_score(bucket: usize) -> u8 {
    (bucket + 1) as u8
}

/// Higher values score lower (Frequency, Monetary: top quartile gets 1)
fn descending_score(bucket: usize) -> u8 {
    (QUARTILES - bucket) as u8
}
