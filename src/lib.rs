//! segmently: customer segmentation over point-of-sale exports.
//!
//! One batch run ingests a period of transactions, computes per-customer
//! RFM (Recency, Frequency, Monetary) profiles, clusters them with K-Means,
//! derives ranked business segments and selects a bounded promotional
//! cohort.

pub mod clean;
pub mod cli;
pub mod cohort;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod rfm;
pub mod scale;
pub mod segment;

pub use cli::Args;
pub use config::{FrequencyMode, PipelineConfig, SegmentPolicy};
pub use error::{Result, SegmentationError};
pub use pipeline::{run, run_file, PipelineResult};
