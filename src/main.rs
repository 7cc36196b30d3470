//! segmently: customer segmentation CLI over point-of-sale exports.
//!
//! This is the main entrypoint that orchestrates the batch pipeline and
//! writes the profile table and promo cohort for downstream consumers.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use segmently::{export, pipeline, Args, PipelineResult};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if args.verbose {
        println!("segmently - Customer Segmentation using K-Means");
        println!("===============================================\n");
    }

    let config = args.to_config()?;
    let start_time = Instant::now();

    if args.verbose {
        println!("Input file: {}", args.input);
        println!("Analysis period: last {} month(s)", config.months_back);
        println!("Clusters: {} (seed {})\n", config.clusters, config.seed);
    }

    let result = pipeline::run_file(Path::new(&args.input), &config)?;
    print_summary(&result);

    export::write_csv(&result.profiles, Path::new(&args.profiles_out))?;
    export::write_csv(&result.cohort, Path::new(&args.cohort_out))?;
    export::write_summary_csv(&result.segments, Path::new(&args.segments_out))?;

    let elapsed = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", elapsed.as_secs_f64());
    println!("Profile table saved to: {}", args.profiles_out);
    println!("Promo cohort saved to: {}", args.cohort_out);
    println!("Segment summary saved to: {}", args.segments_out);

    Ok(())
}

fn print_summary(result: &PipelineResult) {
    let report = &result.report;
    println!("=== Cleaning ===");
    println!("Rows loaded: {}", report.rows_loaded);
    println!(
        "Dropped: {} canceled, {} undated, {} outside window, {} bad price, {} blank customer",
        report.canceled_dropped,
        report.undated_dropped,
        report.outside_window_dropped,
        report.invalid_price_dropped,
        report.blank_customer_dropped
    );
    println!(
        "Kept {} transactions from {} customers (window {} -> {})",
        report.rows_kept,
        report.unique_customers,
        report.cutoff_date.date(),
        report.max_date.date()
    );

    println!("\n=== Segments ===");
    println!(
        "{} clusters, inertia {:.2}, reference date {}",
        result.n_clusters,
        result.inertia,
        result.reference_date.date()
    );
    for segment in &result.segments {
        println!(
            "#{} {} {}: {} customers | avg R {:.0}d, F {:.1}x, M {:.0} | {}% discount",
            segment.rank,
            segment.icon,
            segment.name,
            segment.customer_count,
            segment.mean_recency,
            segment.mean_frequency,
            segment.mean_monetary,
            segment.discount_percent
        );
    }

    println!("\n=== Promo Cohort ({} customers) ===", result.cohort.len());
    for (i, member) in result.cohort.iter().enumerate() {
        println!(
            "{:2}. {} [{}] spend {:.0}, {}% discount",
            i + 1,
            member.customer,
            member.segment,
            member.monetary,
            member.discount_percent
        );
    }
}
