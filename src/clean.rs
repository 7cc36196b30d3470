//! Transaction loading and cleaning.
//!
//! The CSV loader reads every column as a string so that messy cashier
//! exports (mixed date formats, formatted prices, stray status text) arrive
//! untouched and every coercion below is explicit and auditable.
//!
//! Cleaning runs as a sequence of stages, each recording a before/after
//! count in [`CleaningReport`]. A stage that leaves zero rows aborts the
//! run with [`SegmentationError::EmptyResult`] naming itself.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDateTime};
use polars::prelude::*;
use tracing::info;

use crate::columns::ColumnMap;
use crate::error::{Result, SegmentationError};

const DAYS_PER_MONTH: i64 = 30;

/// Per-stage audit counts for one cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningReport {
    pub rows_loaded: usize,
    pub canceled_dropped: usize,
    pub undated_dropped: usize,
    pub outside_window_dropped: usize,
    pub invalid_price_dropped: usize,
    pub blank_customer_dropped: usize,
    pub rows_kept: usize,
    pub unique_customers: usize,
    /// Latest parsed pickup date before the window filter.
    pub max_date: NaiveDateTime,
    /// Lower bound of the analysis window (exclusive).
    pub cutoff_date: NaiveDateTime,
}

/// Cleaned transaction set with canonical columns:
/// `customer` (str), `pickup_date` (datetime, ms), `total_price` (f64) and,
/// when resolved, `invoice` (str).
#[derive(Debug, Clone)]
pub struct CleanedTransactions {
    pub df: DataFrame,
    pub has_invoice: bool,
    /// Max pickup date in the final cleaned set; the shared reference date
    /// for all recency computations in this run.
    pub reference_date: NaiveDateTime,
    pub report: CleaningReport,
}

/// Read a CSV with schema inference disabled, so every column is a string.
pub fn load_transactions(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    info!(rows = df.height(), path = %path.display(), "loaded transactions");
    Ok(df)
}

/// Raw header names of a loaded frame, for the column resolver.
pub fn header_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn parse_date_expr(raw: Expr) -> Expr {
    raw.str().to_datetime(
        Some(TimeUnit::Milliseconds),
        None,
        StrptimeOptions {
            format: None,
            strict: false,
            exact: true,
            cache: true,
        },
        lit("raise"),
    )
}

fn datetime_from_ms(ms: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or(SegmentationError::Timestamp(ms))
}

fn ensure_not_empty(df: &DataFrame, stage: &'static str, detail: String) -> Result<()> {
    if df.height() == 0 {
        return Err(SegmentationError::EmptyResult { stage, detail });
    }
    Ok(())
}

/// Run the cleaning stages over a raw all-string frame.
pub fn clean_transactions(
    raw: DataFrame,
    columns: &ColumnMap,
    months_back: u32,
    cancel_marker: &str,
) -> Result<CleanedTransactions> {
    let rows_loaded = raw.height();
    ensure_not_empty(&raw, "input", "the file contains no data rows".to_string())?;

    // Project the resolved headers onto canonical names. Unresolved optional
    // fields simply do not appear in the working frame.
    let mut select_exprs = vec![
        col(&columns.pickup_date).alias("pickup_date"),
        col(&columns.customer).alias("customer"),
        col(&columns.total_price).alias("total_price"),
    ];
    if let Some(invoice) = &columns.invoice {
        select_exprs.push(col(invoice).alias("invoice"));
    }
    if let Some(status) = &columns.status {
        select_exprs.push(col(status).alias("status"));
    }
    if let Some(order_date) = &columns.order_date {
        select_exprs.push(col(order_date).alias("order_date"));
    }
    let df = raw.lazy().select(select_exprs).collect()?;

    // Stage 1: drop canceled transactions. Substring match, not equality,
    // so status variants like "Batal - refund" are still caught.
    let before = df.height();
    let df = if columns.status.is_some() {
        let marker = cancel_marker.to_lowercase();
        df.lazy()
            .filter(col("status").is_null().or(col("status")
                .str()
                .to_lowercase()
                .str()
                .contains_literal(lit(marker))
                .not()))
            .collect()?
    } else {
        df
    };
    let canceled_dropped = before - df.height();
    ensure_not_empty(
        &df,
        "cancellation filter",
        format!("all {before} transactions carry the '{cancel_marker}' status"),
    )?;

    // Stage 2: parse dates; an order-date column, when present, fills
    // primary dates that failed to parse.
    let before = df.height();
    let parsed = if columns.order_date.is_some() {
        coalesce(&[
            parse_date_expr(col("pickup_date")),
            parse_date_expr(col("order_date")),
        ])
    } else {
        parse_date_expr(col("pickup_date"))
    };
    let df = df
        .lazy()
        .with_column(parsed.alias("pickup_date"))
        .filter(col("pickup_date").is_not_null())
        .collect()?;
    let undated_dropped = before - df.height();
    ensure_not_empty(
        &df,
        "date parsing",
        format!("none of the {before} remaining rows has a parseable date"),
    )?;

    // Stage 3: rolling window. Keep strictly after the cutoff.
    let max_ms = df
        .column("pickup_date")?
        .datetime()?
        .max()
        .ok_or(SegmentationError::EmptyResult {
            stage: "window filter",
            detail: "no parsed dates available".to_string(),
        })?;
    let max_date = datetime_from_ms(max_ms)?;
    let cutoff_date = max_date - Duration::days(DAYS_PER_MONTH * i64::from(months_back));

    let before = df.height();
    let df = df
        .lazy()
        .filter(col("pickup_date").gt(lit(cutoff_date)))
        .collect()?;
    let outside_window_dropped = before - df.height();
    ensure_not_empty(
        &df,
        "window filter",
        format!("no transactions after {cutoff_date} ({months_back} month window)"),
    )?;

    // Stage 4: coerce prices; unparseable and non-positive values drop out.
    let before = df.height();
    let df = df
        .lazy()
        .with_column(col("total_price").cast(DataType::Float64))
        .filter(col("total_price").is_not_null().and(col("total_price").gt(lit(0.0))))
        .collect()?;
    let invalid_price_dropped = before - df.height();
    ensure_not_empty(
        &df,
        "price validation",
        format!("none of the {before} windowed rows has a positive numeric price"),
    )?;

    // Stage 5: trim customer names and drop blanks.
    let before = df.height();
    let df = df
        .lazy()
        .with_column(col("customer").str().strip_chars(lit(NULL)).alias("customer"))
        .filter(
            col("customer")
                .is_not_null()
                .and(col("customer").str().len_chars().gt(lit(0u32))),
        )
        .collect()?;
    let blank_customer_dropped = before - df.height();
    ensure_not_empty(
        &df,
        "customer validation",
        "every remaining row has a blank customer name".to_string(),
    )?;

    // Keep only the canonical columns downstream stages read.
    let mut keep = vec![col("customer"), col("pickup_date"), col("total_price")];
    let has_invoice = columns.invoice.is_some();
    if has_invoice {
        keep.push(col("invoice"));
    }
    let df = df.lazy().select(keep).collect()?;

    // The price/customer stages can drop the row holding the window's max
    // date, so the reference date is recomputed from the final set.
    let reference_ms = df
        .column("pickup_date")?
        .datetime()?
        .max()
        .ok_or(SegmentationError::EmptyResult {
            stage: "customer validation",
            detail: "cleaned set has no dates".to_string(),
        })?;
    let reference_date = datetime_from_ms(reference_ms)?;

    let report = CleaningReport {
        rows_loaded,
        canceled_dropped,
        undated_dropped,
        outside_window_dropped,
        invalid_price_dropped,
        blank_customer_dropped,
        rows_kept: df.height(),
        unique_customers: df.column("customer")?.n_unique()?,
        max_date,
        cutoff_date,
    };
    info!(
        rows_kept = report.rows_kept,
        unique_customers = report.unique_customers,
        canceled = report.canceled_dropped,
        undated = report.undated_dropped,
        outside_window = report.outside_window_dropped,
        invalid_price = report.invalid_price_dropped,
        blank_customer = report.blank_customer_dropped,
        "cleaning finished"
    );

    Ok(CleanedTransactions {
        df,
        has_invoice,
        reference_date,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordTable;

    fn resolved(df: &DataFrame) -> ColumnMap {
        ColumnMap::resolve(&header_names(df), &KeywordTable::default()).unwrap()
    }

    fn sample_frame() -> DataFrame {
        df!(
            "Tanggal Ambil" => &[
                "2025-03-31", "2025-03-29", "2025-03-21", "2025-03-15",
                "2025-01-02", "not-a-date", "2025-03-28",
            ],
            "Konsumen" => &["Budi", "Ani", "Ani", "Citra", "Dewi", "Eka", "  "],
            "Total Harga" => &["50000", "70000", "30000", "abc", "25000", "40000", "10000"],
            "Status Order" => &["Selesai", "Selesai", "selesai", "Selesai", "Selesai", "Selesai", "Selesai"],
        )
        .unwrap()
    }

    #[test]
    fn stages_drop_and_count_invalid_rows() {
        let raw = sample_frame();
        let columns = resolved(&raw);
        let cleaned = clean_transactions(raw, &columns, 1, "batal").unwrap();

        // "not-a-date" parses to null, "2025-01-02" falls outside the
        // window, "abc" fails the price cast, "  " trims to empty.
        assert_eq!(cleaned.report.rows_loaded, 7);
        assert_eq!(cleaned.report.undated_dropped, 1);
        assert_eq!(cleaned.report.outside_window_dropped, 1);
        assert_eq!(cleaned.report.invalid_price_dropped, 1);
        assert_eq!(cleaned.report.blank_customer_dropped, 1);
        assert_eq!(cleaned.report.rows_kept, 3);
        assert_eq!(cleaned.report.unique_customers, 2);
    }

    #[test]
    fn cancellation_marker_matches_substrings_case_insensitively() {
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-30", "2025-03-29", "2025-03-28"],
            "Konsumen" => &["Budi", "Ani", "Citra"],
            "Total Harga" => &["50000", "70000", "30000"],
            "Status Order" => &["Selesai", "BATAL", "Batal - refund"],
        )
        .unwrap();
        let columns = resolved(&raw);
        let cleaned = clean_transactions(raw, &columns, 1, "batal").unwrap();
        assert_eq!(cleaned.report.canceled_dropped, 2);
        assert_eq!(cleaned.report.rows_kept, 1);
    }

    #[test]
    fn all_canceled_fails_at_the_cancellation_stage() {
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-30", "2025-03-29"],
            "Konsumen" => &["Budi", "Ani"],
            "Total Harga" => &["50000", "70000"],
            "Status Order" => &["Batal", "batal"],
        )
        .unwrap();
        let columns = resolved(&raw);
        let err = clean_transactions(raw, &columns, 1, "batal").unwrap_err();
        assert!(matches!(
            err,
            SegmentationError::EmptyResult {
                stage: "cancellation filter",
                ..
            }
        ));
    }

    #[test]
    fn window_bound_is_strict() {
        // Cutoff for months_back=1 is 2025-03-01; a transaction exactly on
        // the cutoff must be dropped, one just after it kept.
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-01", "2025-03-02"],
            "Konsumen" => &["Budi", "Ani", "Citra"],
            "Total Harga" => &["50000", "70000", "30000"],
        )
        .unwrap();
        let columns = resolved(&raw);
        let cleaned = clean_transactions(raw, &columns, 1, "batal").unwrap();
        assert_eq!(cleaned.report.outside_window_dropped, 1);

        let kept: Vec<Option<&str>> = cleaned
            .df
            .column("customer")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert!(!kept.contains(&Some("Ani")));
    }

    #[test]
    fn order_date_fills_unparseable_pickup_dates() {
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "???"],
            "Tanggal Order" => &["2025-03-31", "2025-03-20"],
            "Konsumen" => &["Budi", "Ani"],
            "Total Harga" => &["50000", "70000"],
        )
        .unwrap();
        let columns = resolved(&raw);
        assert!(columns.order_date.is_some());
        let cleaned = clean_transactions(raw, &columns, 1, "batal").unwrap();
        assert_eq!(cleaned.report.undated_dropped, 0);
        assert_eq!(cleaned.report.rows_kept, 2);
    }

    #[test]
    fn reference_date_tracks_the_cleaned_set() {
        // The max-date row has an invalid price; the reference date must
        // come from the surviving rows.
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-20", "2025-03-18"],
            "Konsumen" => &["Budi", "Ani", "Citra"],
            "Total Harga" => &["oops", "70000", "30000"],
        )
        .unwrap();
        let columns = resolved(&raw);
        let cleaned = clean_transactions(raw, &columns, 1, "batal").unwrap();
        assert_eq!(
            cleaned.reference_date.date(),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
        );
    }
}
