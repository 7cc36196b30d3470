//! Error taxonomy for the segmentation pipeline.
//!
//! Validation failures are fatal and abort the run with no partial output;
//! row-level anomalies (unparseable dates, bad prices) are dropped locally
//! and surface only as counts in the [`CleaningReport`](crate::clean::CleaningReport).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    /// A required semantic field could not be resolved from the input headers.
    #[error("required column '{0}' could not be resolved from the input headers")]
    MissingColumn(&'static str),

    /// A cleaning or aggregation stage left zero rows behind.
    #[error("no data left after {stage}: {detail}")]
    EmptyResult {
        stage: &'static str,
        detail: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("timestamp {0} is outside the representable range")]
    Timestamp(i64),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Common result type used throughout the library.
pub type Result<T> = std::result::Result<T, SegmentationError>;
