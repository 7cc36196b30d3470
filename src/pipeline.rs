//! One-shot pipeline orchestration.
//!
//! Each run is a self-contained batch computation: resolve columns, clean,
//! aggregate RFM, standardize, cluster, label, select the cohort. The run
//! returns an immutable [`PipelineResult`]; no state survives between runs.

use std::path::Path;

use polars::prelude::DataFrame;
use tracing::warn;

use crate::clean::{clean_transactions, header_names, load_transactions, CleaningReport};
use crate::cohort::select_cohort;
use crate::columns::ColumnMap;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::fit_kmeans;
use crate::rfm::{compute_rfm, feature_matrix};
use crate::scale::StandardScaler;
use crate::segment::{label_clusters, LabeledProfile, SegmentSummary};

const FEATURE_NAMES: [&str; 3] = ["recency", "frequency", "monetary"];

/// Everything one run produces. Collaborators read `profiles` (the full
/// ranked customer table) and `cohort`; the rest is reporting.
#[derive(Debug)]
pub struct PipelineResult {
    pub report: CleaningReport,
    pub reference_date: chrono::NaiveDateTime,
    /// One row per customer, carrying profile, segment and discount.
    pub profiles: Vec<LabeledProfile>,
    /// One row per cluster, rank-ordered best first.
    pub segments: Vec<SegmentSummary>,
    /// Promotional cohort, at most `cohort_size` customers.
    pub cohort: Vec<LabeledProfile>,
    /// Effective cluster count after clamping to the customer count.
    pub n_clusters: usize,
    /// Within-cluster sum of squares of the winning k-means restart.
    pub inertia: f64,
}

/// Run the full pipeline over an already-loaded raw frame.
pub fn run(raw: DataFrame, config: &PipelineConfig) -> Result<PipelineResult> {
    config.validate()?;

    let columns = ColumnMap::resolve(&header_names(&raw), &config.keywords)?;
    let cleaned = clean_transactions(raw, &columns, config.months_back, &config.cancel_marker)?;
    let profiles = compute_rfm(&cleaned, config.frequency_mode)?;

    let raw_features = feature_matrix(&profiles)?;
    let scaler = StandardScaler::fit(&raw_features);
    for feature in scaler.degenerate_features() {
        warn!(
            feature = FEATURE_NAMES[feature],
            "zero variance across the population; standardized values set to 0"
        );
    }
    let features = scaler.transform(&raw_features);

    let model = fit_kmeans(
        &features,
        config.clusters,
        config.max_iterations,
        config.restarts,
        config.tolerance,
        config.seed,
    )?;

    let (labeled, segments) =
        label_clusters(&profiles, &model.labels, model.n_clusters, &config.segments)?;
    let cohort = select_cohort(&labeled, config.cohort_size);

    Ok(PipelineResult {
        report: cleaned.report,
        reference_date: cleaned.reference_date,
        profiles: labeled,
        segments,
        cohort,
        n_clusters: model.n_clusters,
        inertia: model.inertia,
    })
}

/// Load a CSV export and run the pipeline over it.
pub fn run_file(path: &Path, config: &PipelineConfig) -> Result<PipelineResult> {
    let raw = load_transactions(path)?;
    run(raw, config)
}
