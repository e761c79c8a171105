//! Report rendering with Plotters: segment charts and console statistics

use std::path::Path;

use plotters::prelude::*;

use crate::model::{CustomerRfm, Metric, RfmAnalysis, Segment};
use crate::summary::{CorrelationMatrix, SegmentCounts};

/// Color per segment, in ladder order
const SEGMENT_COLORS: [RGBColor; 8] = [
    RGBColor(75, 0, 130),
    RGBColor(128, 0, 128),
    BLUE,
    CYAN,
    GREEN,
    RGBColor(255, 165, 0),
    RED,
    BLACK,
];

const UNDEFINED_COLOR: RGBColor = RGBColor(200, 200, 200);

/// Equal-width bins per metric histogram
const HISTOGRAM_BINS: usize = 20;

fn segment_color(segment: Segment) -> RGBColor {
    let index = Segment::ALL
        .iter()
        .position(|s| *s == segment)
        .unwrap_or(SEGMENT_COLORS.len() - 1);
    SEGMENT_COLORS[index]
}

/// Path next to `base` with `suffix` appended to the file stem, always `.png`
fn sibling_path(base: &str, suffix: &str) -> String {
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rfm_report");
    let file_name = format!("{stem}{suffix}.png");
    path.with_file_name(file_name).to_string_lossy().into_owned()
}

/// Bar chart of customers per segment
pub fn create_segment_bar_chart(counts: &SegmentCounts, output_path: &str) -> crate::Result<()> {
    let entries: Vec<(Segment, u32)> = counts
        .iter()
        .map(|entry| (entry.segment, entry.count as u32))
        .collect();
    let max_count = entries.iter().map(|(_, count)| *count).max().unwrap_or(1);
    let n_bars = entries.len().max(1) as i32;

    let root = BitMapBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Count of Customers in Each RFM Segment", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n_bars).into_segmented(), 0u32..(max_count + max_count / 10 + 1))?;

    let labels: Vec<&'static str> = entries.iter().map(|(segment, _)| segment.label()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("RFM Segment")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).copied().unwrap_or_default().to_string(),
            _ => String::new(),
        })
        .draw()?;

    for (i, &(segment, count)) in entries.iter().enumerate() {
        let color = segment_color(segment);
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), count)],
            color.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        chart.draw_series(std::iter::once(bar))?;
    }

    root.present()?;
    Ok(())
}

/// Histogram of composite RFM scores
pub fn create_score_histogram(analysis: &RfmAnalysis, output_path: &str) -> crate::Result<()> {
    let distribution = analysis.score_distribution();
    let max_count = distribution.iter().map(|(_, count)| *count as u32).max().unwrap_or(1);
    let first = distribution.first().map_or(3, |(score, _)| i32::from(*score));
    let last = distribution.last().map_or(12, |(score, _)| i32::from(*score));

    let root = BitMapBackend::new(output_path, (700, 450)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("RFM Score Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((first..last + 1).into_segmented(), 0u32..(max_count + 1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("RFM Score")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (score, count) in distribution {
        let color = segment_color(Segment::from_score(score));
        let x = i32::from(score);
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(x), 0), (SegmentValue::Exact(x + 1), count as u32)],
            color.filled(),
        );
        bar.set_margin(0, 0, 4, 4);
        chart.draw_series(std::iter::once(bar))?;
    }

    root.present()?;
    Ok(())
}

/// Pie chart of each segment's share of customers
pub fn create_segment_share_chart(counts: &SegmentCounts, output_path: &str) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled("Share of Customers per RFM Segment", ("sans-serif", 30))?;

    if !counts.is_empty() {
        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = f64::from(width.min(height)) * 0.35;
        let sizes: Vec<f64> = counts.iter().map(|entry| entry.count as f64).collect();
        let colors: Vec<RGBColor> = counts.iter().map(|entry| segment_color(entry.segment)).collect();
        let labels: Vec<&str> = counts.iter().map(|entry| entry.segment.label()).collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
        pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
        area.draw(&pie)?;
    }

    root.present()?;
    Ok(())
}

/// Lower edge and bin width covering `values` in [`HISTOGRAM_BINS`] bins.
///
/// A single distinct value is centered between unit-wide bins.
fn histogram_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let width = (max - min) / HISTOGRAM_BINS as f64;
    if width > 0.0 {
        (min, width)
    } else {
        (min - HISTOGRAM_BINS as f64 / 2.0, 1.0)
    }
}

/// Bin holding `value`; the maximum falls in the last bin
fn histogram_bin(value: f64, lower: f64, width: f64) -> usize {
    let bin = ((value - lower) / width).floor().max(0.0) as usize;
    bin.min(HISTOGRAM_BINS - 1)
}

/// Histogram of one metric with bars stacked by segment
///
/// # Arguments
/// * `metric` - Metric on the x axis
/// * `segment` - Restrict to one segment's customers, or `None` for all
pub fn create_metric_histogram(
    analysis: &RfmAnalysis,
    metric: Metric,
    segment: Option<Segment>,
    output_path: &str,
) -> crate::Result<()> {
    let (customers, title): (Vec<&CustomerRfm>, String) = match segment {
        Some(segment) => (
            analysis.segment(segment),
            format!("{metric} Values Distribution in {segment} Segment"),
        ),
        None => (
            analysis.customers.iter().collect(),
            format!("Distribution of {metric} Values"),
        ),
    };

    let values: Vec<f64> = customers.iter().map(|c| c.metric(metric)).collect();
    let (lower, width) = histogram_range(&values);
    let upper = lower + width * HISTOGRAM_BINS as f64;

    // Per segment, in ladder order, then per bin
    let mut counts = vec![vec![0u32; HISTOGRAM_BINS]; Segment::ALL.len()];
    for (customer, &value) in customers.iter().zip(&values) {
        if let Some(slot) = Segment::ALL.iter().position(|s| *s == customer.segment) {
            counts[slot][histogram_bin(value, lower, width)] += 1;
        }
    }
    let max_stack = (0..HISTOGRAM_BINS)
        .map(|bin| counts.iter().map(|row| row[bin]).sum::<u32>())
        .max()
        .unwrap_or(0)
        .max(1);

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(lower..upper, 0u32..(max_stack + 1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(metric.label())
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut stacked = vec![0u32; HISTOGRAM_BINS];
    for (slot, &segment) in Segment::ALL.iter().enumerate() {
        let row = &counts[slot];
        if row.iter().all(|&count| count == 0) {
            continue;
        }

        let color = segment_color(segment);
        let bars: Vec<Rectangle<(f64, u32)>> = row
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(bin, &count)| {
                let left = lower + width * bin as f64;
                Rectangle::new(
                    [(left, stacked[bin]), (left + width, stacked[bin] + count)],
                    color.filled(),
                )
            })
            .collect();
        for (base, count) in stacked.iter_mut().zip(row) {
            *base += count;
        }

        chart
            .draw_series(bars)?
            .label(segment.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if !customers.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Box chart of Recency per segment, or for one segment only
pub fn create_recency_boxplot(
    analysis: &RfmAnalysis,
    segment: Option<Segment>,
    output_path: &str,
) -> crate::Result<()> {
    let (segments, title) = match segment {
        Some(segment) => (vec![segment], format!("Recency Values in {segment} Segment")),
        None => (Segment::ALL.to_vec(), "Recency Values by Segment".to_string()),
    };

    let groups: Vec<(Segment, Quartiles)> = segments
        .into_iter()
        .filter_map(|segment| {
            let values: Vec<f64> = analysis.segment(segment).iter().map(|c| c.recency as f64).collect();
            (!values.is_empty()).then(|| (segment, Quartiles::new(&values)))
        })
        .collect();

    // Whiskers reach the fences, so the axis must cover them
    let low = groups
        .iter()
        .flat_map(|(_, quartiles)| quartiles.values())
        .fold(f32::INFINITY, f32::min);
    let high = groups
        .iter()
        .flat_map(|(_, quartiles)| quartiles.values())
        .fold(f32::NEG_INFINITY, f32::max);
    let (low, high) = if low.is_finite() { (low, high) } else { (0.0, 1.0) };
    let pad = ((high - low) * 0.05).max(1.0);

    let root = BitMapBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..groups.len().max(1) as i32).into_segmented(), (low - pad)..(high + pad))?;

    let labels: Vec<&'static str> = groups.iter().map(|(segment, _)| segment.label()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("RFM Segment")
        .y_desc("Recency (days)")
        .axis_desc_style(("sans-serif", 15))
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).copied().unwrap_or_default().to_string(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(groups.iter().enumerate().map(|(i, (segment, quartiles))| {
        Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), quartiles)
            .width(30)
            .whisker_width(0.5)
            .style(segment_color(*segment))
    }))?;

    root.present()?;
    Ok(())
}

/// Scatter plot of Recency against Monetary, colored by segment
pub fn create_recency_monetary_scatter(
    analysis: &RfmAnalysis,
    output_path: &str,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    let title = plot_title.unwrap_or("Recency vs Monetary Value");
    let customers = &analysis.customers;

    let rec_min = customers.iter().map(|c| c.recency as f64).fold(f64::INFINITY, f64::min);
    let rec_max = customers.iter().map(|c| c.recency as f64).fold(f64::NEG_INFINITY, f64::max);
    let mon_min = customers.iter().map(|c| c.monetary).fold(f64::INFINITY, f64::min);
    let mon_max = customers.iter().map(|c| c.monetary).fold(f64::NEG_INFINITY, f64::max);

    if !rec_min.is_finite() || !mon_min.is_finite() {
        anyhow::bail!("No customers to plot");
    }

    // Pad so points on the extremes stay inside the plot area
    let rec_pad = ((rec_max - rec_min) * 0.05).max(1.0);
    let mon_pad = ((mon_max - mon_min) * 0.05).max(1.0);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (rec_min - rec_pad)..(rec_max + rec_pad),
            (mon_min - mon_pad)..(mon_max + mon_pad),
        )?;

    chart
        .configure_mesh()
        .x_desc("Recency (days)")
        .y_desc("Monetary")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for segment in Segment::ALL {
        let points: Vec<(f64, f64)> = analysis
            .segment(segment)
            .iter()
            .map(|c| (c.recency as f64, c.monetary))
            .collect();
        if points.is_empty() {
            continue;
        }

        let color = segment_color(segment);
        chart
            .draw_series(points.into_iter().map(|point| Circle::new(point, 4, color.filled())))?
            .label(segment.label())
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Blue for negative, red for positive correlation, fading to white at zero
fn correlation_color(value: f64) -> RGBColor {
    let strength = value.abs().min(1.0);
    let fade = (255.0 * (1.0 - strength)) as u8;
    if value < 0.0 {
        RGBColor(fade, fade, 255)
    } else {
        RGBColor(255, fade, fade)
    }
}

/// Heatmap of a segment's correlation matrix; undefined cells are drawn grey
pub fn create_correlation_heatmap(matrix: &CorrelationMatrix, output_path: &str) -> crate::Result<()> {
    let n = Metric::ALL.len() as i32;
    let title = format!("Correlation of RFM Values within {}", matrix.segment);

    let root = BitMapBackend::new(output_path, (600, 550)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    let metric_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(i) => Metric::ALL
            .get(*i as usize)
            .map(|m| m.label().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&metric_label)
        .y_label_formatter(&metric_label)
        .draw()?;

    for row in Metric::ALL {
        for column in Metric::ALL {
            let x = column.index() as i32;
            let y = row.index() as i32;
            let value = matrix.get(row, column);
            let color = value.map_or(UNDEFINED_COLOR, correlation_color);

            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                color.filled(),
            )))?;

            let text = value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
            chart.draw_series(std::iter::once(Text::new(
                text,
                (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                ("sans-serif", 18).into_font(),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Print headline figures and segment sizes to console
pub fn print_segment_statistics(analysis: &RfmAnalysis) {
    let overview = analysis.overview();

    println!("\n=== RFM Overview ===");
    println!("Reference date: {}", analysis.reference_date.date());
    println!("Total customers: {}", overview.total_customers);
    // Dashboard cards show truncated means
    println!("Average recency: {}", overview.average_recency as i64);
    println!("Average frequency: {}", overview.average_frequency as i64);
    println!("Average monetary value: {}", overview.average_monetary as i64);

    println!("\nSegment sizes:");
    for entry in analysis.segment_counts.iter() {
        let percentage = entry.count as f64 / overview.total_customers.max(1) as f64 * 100.0;
        println!("  {:<20} {:>6} customers ({:.1}%)", entry.segment.label(), entry.count, percentage);
    }
}

/// Print one segment's members summary and its correlation matrix
pub fn print_segment_view(analysis: &RfmAnalysis, segment: Segment) {
    let members = analysis.segment(segment);
    println!("\n=== Segment: {} ({} customers) ===", segment, members.len());

    if !members.is_empty() {
        println!("  Metric    |      Min |     Mean |      Max");
        println!("  ----------|----------|----------|---------");
        for metric in Metric::ALL {
            let values: Vec<f64> = members.iter().map(|c| c.metric(metric)).collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            println!("  {:<9} | {:8.2} | {:8.2} | {:8.2}", metric.label(), min, mean, max);
        }
    }

    let matrix = analysis.correlation(segment);
    println!("\nCorrelation matrix (n = {}):", matrix.sample_size);
    println!("  {:<9} | {:>9} | {:>9} | {:>9}", "", "Recency", "Frequency", "Monetary");
    for row in Metric::ALL {
        let cells: Vec<String> = Metric::ALL
            .iter()
            .map(|&column| {
                matrix
                    .get(row, column)
                    .map_or_else(|| "undefined".to_string(), |v| format!("{v:.3}"))
            })
            .collect();
        println!("  {:<9} | {:>9} | {:>9} | {:>9}", row.label(), cells[0], cells[1], cells[2]);
    }
}

/// Render every chart for a scored table next to `base_output_path`
///
/// # Returns
/// * Paths of the files written, main segment chart first
pub fn generate_visualization_report(
    analysis: &RfmAnalysis,
    base_output_path: &str,
    segment: Segment,
) -> crate::Result<Vec<String>> {
    let segments_path = base_output_path.to_string();
    create_segment_bar_chart(&analysis.segment_counts, &segments_path)?;

    let scores_path = sibling_path(base_output_path, "_scores");
    create_score_histogram(analysis, &scores_path)?;

    let scatter_path = sibling_path(base_output_path, "_scatter");
    create_recency_monetary_scatter(analysis, &scatter_path, None)?;

    let share_path = sibling_path(base_output_path, "_share");
    create_segment_share_chart(&analysis.segment_counts, &share_path)?;

    let mut written = vec![segments_path, scores_path, scatter_path, share_path];

    // Metric distributions across all segments, then within the selected one
    for metric in Metric::ALL {
        let path = sibling_path(base_output_path, &format!("_{}", metric.label().to_lowercase()));
        create_metric_histogram(analysis, metric, None, &path)?;
        written.push(path);
    }
    let boxplot_path = sibling_path(base_output_path, "_recency_box");
    create_recency_boxplot(analysis, None, &boxplot_path)?;
    written.push(boxplot_path);

    let slug = segment.label().to_lowercase().replace(' ', "_");
    for metric in Metric::ALL {
        let suffix = format!("_{slug}_{}", metric.label().to_lowercase());
        let path = sibling_path(base_output_path, &suffix);
        create_metric_histogram(analysis, metric, Some(segment), &path)?;
        written.push(path);
    }
    let segment_box_path = sibling_path(base_output_path, &format!("_{slug}_recency_box"));
    create_recency_boxplot(analysis, Some(segment), &segment_box_path)?;
    written.push(segment_box_path);

    let correlation_path = sibling_path(base_output_path, "_correlation");
    create_correlation_heatmap(&analysis.correlation(segment), &correlation_path)?;
    written.push(correlation_path);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Transaction;
    use crate::model::compute_rfm;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
    use tempfile::tempdir;

    fn create_test_analysis() -> RfmAnalysis {
        let reference: NaiveDateTime = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap().and_time(NaiveTime::MIN);
        let mut transactions = Vec::new();
        for customer in 1..=12u32 {
            for order in 0..(customer % 4 + 1) {
                transactions.push(Transaction::new(
                    format!("C{customer:02}"),
                    format!("{customer}-{order}"),
                    reference - TimeDelta::days(i64::from(customer * 7 % 50 + 1)),
                    f64::from(customer * 37 % 90 + 10),
                ));
            }
        }
        compute_rfm(&transactions, reference).unwrap()
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(sibling_path("out/plot.png", "_scores"), "out/plot_scores.png");
        assert_eq!(sibling_path("plot", "_scatter"), "plot_scatter.png");
    }

    #[test]
    fn test_correlation_color() {
        assert_eq!(correlation_color(1.0), RGBColor(255, 0, 0));
        assert_eq!(correlation_color(-1.0), RGBColor(0, 0, 255));
        assert_eq!(correlation_color(0.0), RGBColor(255, 255, 255));
    }

    #[test]
    fn test_create_segment_bar_chart() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("segments.png");
        let output_str = output_path.to_str().unwrap();

        let result = create_segment_bar_chart(&analysis.segment_counts, output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_create_correlation_heatmap_undefined() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("corr.png");
        let output_str = output_path.to_str().unwrap();

        // Lost never has members, so every cell is undefined
        let matrix = analysis.correlation(Segment::Lost);
        assert!(matrix.is_undefined());
        let result = create_correlation_heatmap(&matrix, output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_histogram_bins() {
        let (lower, width) = histogram_range(&[10.0, 30.0]);
        assert_eq!(lower, 10.0);
        assert!((width - 1.0).abs() < 1e-12);
        assert_eq!(histogram_bin(10.0, lower, width), 0);
        assert_eq!(histogram_bin(20.5, lower, width), 10);
        assert_eq!(histogram_bin(30.0, lower, width), HISTOGRAM_BINS - 1);

        // One distinct value sits in the middle bin
        let (lower, width) = histogram_range(&[42.0, 42.0]);
        assert_eq!(histogram_bin(42.0, lower, width), HISTOGRAM_BINS / 2);
    }

    #[test]
    fn test_create_metric_histogram() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();

        for metric in Metric::ALL {
            let output_path = temp_dir.path().join(format!("{metric}.png"));
            let output_str = output_path.to_str().unwrap();
            let result = create_metric_histogram(&analysis, metric, None, output_str);
            assert!(result.is_ok());
            assert!(Path::new(output_str).exists());
        }

        let segment = analysis.customers[0].segment;
        let output_path = temp_dir.path().join("segment_recency.png");
        let output_str = output_path.to_str().unwrap();
        assert!(create_metric_histogram(&analysis, Metric::Recency, Some(segment), output_str).is_ok());
        assert!(Path::new(output_str).exists());

        // Empty segment still renders empty axes
        let output_path = temp_dir.path().join("lost_monetary.png");
        let output_str = output_path.to_str().unwrap();
        assert!(create_metric_histogram(&analysis, Metric::Monetary, Some(Segment::Lost), output_str).is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_create_recency_boxplot() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();

        let output_path = temp_dir.path().join("box.png");
        let output_str = output_path.to_str().unwrap();
        assert!(create_recency_boxplot(&analysis, None, output_str).is_ok());
        assert!(Path::new(output_str).exists());

        let segment = analysis.customers[0].segment;
        let output_path = temp_dir.path().join("segment_box.png");
        let output_str = output_path.to_str().unwrap();
        assert!(create_recency_boxplot(&analysis, Some(segment), output_str).is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_create_segment_share_chart() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("share.png");
        let output_str = output_path.to_str().unwrap();

        let result = create_segment_share_chart(&analysis.segment_counts, output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_generate_visualization_report() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("report.png");
        let output_str = output_path.to_str().unwrap();

        let written = generate_visualization_report(&analysis, output_str, Segment::Champions).unwrap();
        assert_eq!(written.len(), 13);
        assert!(written.iter().any(|path| path.ends_with("report_champions_monetary.png")));
        for path in written {
            assert!(Path::new(&path).exists(), "missing {path}");
        }
    }
}
