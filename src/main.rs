//! RfmForge: RFM customer segmentation CLI
//!
//! Entrypoint that orchestrates data loading, scoring, reporting and export.

use std::fs::File;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rfmforge::{compute_rfm, data, export_scores, load_transactions, viz, Args};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        println!("RfmForge - Customer Segmentation using RFM Scores");
        println!("=================================================\n");
    }

    run_pipeline(&args)
}

/// `RUST_LOG` takes precedence over the verbosity flag
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "rfmforge=debug" } else { "rfmforge=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the full scoring pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== RFM Scoring Pipeline ===\n");

    let start_time = Instant::now();
    let reference_date = args.reference_date()?;
    let segment = args.segment()?;

    // Step 1: Load transactions
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
        println!("  Reference date: {}", reference_date);
    }

    if let Some(rows) = args.preview {
        let frame = data::read_transactions_frame(&args.input)
            .with_context(|| format!("Failed to read {}", args.input))?;
        println!("Data preview ({} of {} rows):", rows.min(frame.height()), frame.height());
        println!("{}\n", frame.head(Some(rows)));
    }

    let load_start = Instant::now();
    let transactions =
        load_transactions(&args.input).with_context(|| format!("Failed to load {}", args.input))?;
    info!(transactions = transactions.len(), "loaded transactions");

    println!("✓ Data loaded: {} transactions", transactions.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Score customers
    let score_start = Instant::now();
    let analysis = compute_rfm(&transactions, reference_date).context("RFM scoring failed")?;
    info!(customers = analysis.customers.len(), "scored customers");

    println!("✓ Customers scored: {}", analysis.customers.len());
    if args.verbose {
        println!("  Scoring time: {:.2}s", score_start.elapsed().as_secs_f64());
    }

    // Step 3: Report
    viz::print_segment_statistics(&analysis);
    viz::print_segment_view(&analysis, segment);

    if !args.no_plots {
        if args.verbose {
            println!("\nStep 3: Generating visualizations");
            println!("  Output file: {}", args.output);
        }

        let viz_start = Instant::now();
        let written = viz::generate_visualization_report(&analysis, &args.output, segment)?;

        println!("\n✓ Visualizations generated");
        for path in &written {
            println!("  {}", path);
        }
        if args.verbose {
            println!("  Visualization time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    // Step 4: Export
    if let Some(ref export_path) = args.export {
        export_scores(&analysis.customers, export_path)
            .with_context(|| format!("Failed to export scores to {}", export_path))?;
        println!("✓ Scored customers saved to: {}", export_path);
    }

    if let Some(ref json_path) = args.counts_json {
        let file = File::create(json_path).with_context(|| format!("Failed to create {}", json_path))?;
        serde_json::to_writer_pretty(file, &analysis.segment_counts)?;
        println!("✓ Segment counts saved to: {}", json_path);
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}
