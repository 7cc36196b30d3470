//! Collaborator-facing output: the full profile table and the cohort list
//! as DataFrames, plus CSV writers for both.
//!
//! Downstream consumers (spreadsheet export, messaging templates) read only
//! these structures; internal clustering state never leaves the pipeline.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;
use crate::segment::{LabeledProfile, SegmentSummary};

/// One row per customer: RFM metrics, cluster id, segment name, discount.
pub fn profiles_to_dataframe(profiles: &[LabeledProfile]) -> Result<DataFrame> {
    let customer: Vec<&str> = profiles.iter().map(|p| p.customer.as_str()).collect();
    let recency: Vec<i64> = profiles.iter().map(|p| p.recency_days).collect();
    let frequency: Vec<i64> = profiles.iter().map(|p| i64::from(p.frequency)).collect();
    let monetary: Vec<f64> = profiles.iter().map(|p| p.monetary).collect();
    let cluster: Vec<i64> = profiles.iter().map(|p| p.cluster_id as i64).collect();
    let rank: Vec<i64> = profiles.iter().map(|p| p.rank as i64).collect();
    let segment: Vec<&str> = profiles.iter().map(|p| p.segment.as_str()).collect();
    let discount: Vec<f64> = profiles.iter().map(|p| p.discount_percent).collect();

    let df = df!(
        "customer" => customer,
        "recency_days" => recency,
        "frequency" => frequency,
        "monetary" => monetary,
        "cluster_id" => cluster,
        "rank" => rank,
        "segment" => segment,
        "discount_percent" => discount,
    )?;
    Ok(df)
}

/// One row per cluster: rank, identity, size and mean RFM.
pub fn summaries_to_dataframe(summaries: &[SegmentSummary]) -> Result<DataFrame> {
    let rank: Vec<i64> = summaries.iter().map(|s| s.rank as i64).collect();
    let segment: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
    let cluster: Vec<i64> = summaries.iter().map(|s| s.cluster_id as i64).collect();
    let customers: Vec<i64> = summaries.iter().map(|s| s.customer_count as i64).collect();
    let mean_recency: Vec<f64> = summaries.iter().map(|s| s.mean_recency).collect();
    let mean_frequency: Vec<f64> = summaries.iter().map(|s| s.mean_frequency).collect();
    let mean_monetary: Vec<f64> = summaries.iter().map(|s| s.mean_monetary).collect();
    let score: Vec<f64> = summaries.iter().map(|s| s.score).collect();
    let discount: Vec<f64> = summaries.iter().map(|s| s.discount_percent).collect();

    let df = df!(
        "rank" => rank,
        "segment" => segment,
        "cluster_id" => cluster,
        "customers" => customers,
        "mean_recency" => mean_recency,
        "mean_frequency" => mean_frequency,
        "mean_monetary" => mean_monetary,
        "score" => score,
        "discount_percent" => discount,
    )?;
    Ok(df)
}

/// Write a profile or cohort table to CSV.
pub fn write_csv(profiles: &[LabeledProfile], path: &Path) -> Result<()> {
    let mut df = profiles_to_dataframe(profiles)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Write the per-cluster segment summary to CSV, one row per rank.
pub fn write_summary_csv(summaries: &[SegmentSummary], path: &Path) -> Result<()> {
    let mut df = summaries_to_dataframe(summaries)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}
