//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::config::{FrequencyMode, PipelineConfig, SegmentPolicy};
use crate::error::{Result, SegmentationError};

/// Customer segmentation CLI: RFM analysis, K-Means clustering and promo
/// cohort selection over a cashier CSV export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// How many months of data to analyze (30-day blocks back from the
    /// latest transaction)
    #[arg(short, long, default_value = "1")]
    pub months_back: u32,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "5")]
    pub clusters: usize,

    /// Promotional cohort size
    #[arg(short = 'n', long, default_value = "10")]
    pub cohort_size: usize,

    /// Random seed for clustering; a fixed seed makes runs reproducible
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations per K-Means restart
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Number of K-Means restarts; the lowest-inertia run wins
    #[arg(long, default_value = "10")]
    pub restarts: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// How to count purchase frequency per customer
    #[arg(long, value_enum, default_value = "invoices")]
    pub frequency: FrequencyMode,

    /// Case-insensitive substring marking canceled transactions
    #[arg(long, default_value = "batal")]
    pub cancel_marker: String,

    /// Per-rank discount override as a comma-separated list, one value per
    /// segment tier. Example: --discounts "15,10,5,7,10"
    #[arg(short, long)]
    pub discounts: Option<String>,

    /// TOML file defining the segment tier table (names, icons, discounts)
    #[arg(long)]
    pub segments: Option<String>,

    /// Output path for the full customer profile table
    #[arg(long, default_value = "customer_segments.csv")]
    pub profiles_out: String,

    /// Output path for the promo cohort list
    #[arg(long, default_value = "promo_cohort.csv")]
    pub cohort_out: String,

    /// Output path for the per-cluster segment summary table
    #[arg(long, default_value = "segment_summary.csv")]
    pub segments_out: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the discount override list.
    /// Expected format: "15,10,5,7,10" (one value per tier, in rank order)
    pub fn parse_discounts(&self) -> Result<Option<Vec<f64>>> {
        let Some(raw) = &self.discounts else {
            return Ok(None);
        };
        let mut discounts = Vec::new();
        for part in raw.split(',') {
            let value: f64 = part.trim().parse().map_err(|_| {
                SegmentationError::Config(format!("invalid discount value: {part}"))
            })?;
            discounts.push(value);
        }
        Ok(Some(discounts))
    }

    /// Build the pipeline configuration from the parsed arguments.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut policy = match &self.segments {
            Some(path) => SegmentPolicy::from_toml_file(std::path::Path::new(path))?,
            None => SegmentPolicy::default(),
        };
        if let Some(discounts) = self.parse_discounts()? {
            policy = policy.with_discounts(&discounts)?;
        }

        let config = PipelineConfig {
            months_back: self.months_back,
            clusters: self.clusters,
            cohort_size: self.cohort_size,
            seed: self.seed,
            max_iterations: self.max_iters,
            restarts: self.restarts,
            tolerance: self.tolerance,
            frequency_mode: self.frequency,
            cancel_marker: self.cancel_marker.clone(),
            segments: policy,
            ..PipelineConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}
