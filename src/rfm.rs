//! RFM aggregation: one profile per distinct customer in the cleaned set.
//!
//! Recency is measured in whole days against a single reference date, the
//! max pickup date of the cleaned set, shared by every customer in the run.

use ndarray::Array2;
use polars::prelude::*;
use tracing::info;

use crate::clean::CleanedTransactions;
use crate::config::FrequencyMode;
use crate::error::{Result, SegmentationError};

/// One customer's behavioral metrics for the analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    pub customer: String,
    pub recency_days: i64,
    pub frequency: u32,
    pub monetary: f64,
}

/// Compute RFM profiles. Group order is stable (first appearance in the
/// cleaned set), which keeps the whole downstream pipeline deterministic.
pub fn compute_rfm(
    cleaned: &CleanedTransactions,
    mode: FrequencyMode,
) -> Result<Vec<CustomerProfile>> {
    let count_invoices = match mode {
        FrequencyMode::Invoices => {
            if !cleaned.has_invoice {
                info!("no invoice column resolved; frequency falls back to transaction counts");
            }
            cleaned.has_invoice
        }
        FrequencyMode::Transactions => false,
    };
    let frequency_expr = if count_invoices {
        col("invoice").n_unique().alias("frequency")
    } else {
        col("pickup_date").count().alias("frequency")
    };

    let rfm = cleaned
        .df
        .clone()
        .lazy()
        .group_by_stable([col("customer")])
        .agg([
            col("pickup_date").max().alias("last_visit"),
            frequency_expr,
            col("total_price").sum().alias("monetary"),
        ])
        .with_column(
            (lit(cleaned.reference_date) - col("last_visit"))
                .dt()
                .total_days()
                .alias("recency_days"),
        )
        .filter(
            col("recency_days")
                .gt_eq(lit(0))
                .and(col("frequency").gt(lit(0u32)))
                .and(col("monetary").gt(lit(0.0))),
        )
        .select([
            col("customer"),
            col("recency_days"),
            col("frequency"),
            col("monetary"),
        ])
        .collect()?;

    if rfm.height() == 0 {
        return Err(SegmentationError::EmptyResult {
            stage: "rfm aggregation",
            detail: "no customer produced a valid profile".to_string(),
        });
    }

    let customers = rfm.column("customer")?.str()?;
    let recency = rfm.column("recency_days")?.i64()?;
    let frequency = rfm.column("frequency")?.u32()?;
    let monetary = rfm.column("monetary")?.f64()?;

    let mut profiles = Vec::with_capacity(rfm.height());
    for i in 0..rfm.height() {
        // Aggregates over the cleaned set are never null; guard anyway so a
        // surprise null drops the profile instead of panicking.
        let (Some(customer), Some(recency_days), Some(frequency), Some(monetary)) = (
            customers.get(i),
            recency.get(i),
            frequency.get(i),
            monetary.get(i),
        ) else {
            continue;
        };
        profiles.push(CustomerProfile {
            customer: customer.to_string(),
            recency_days,
            frequency,
            monetary,
        });
    }

    if profiles.is_empty() {
        return Err(SegmentationError::EmptyResult {
            stage: "rfm aggregation",
            detail: "every aggregated profile carried null values".to_string(),
        });
    }

    info!(profiles = profiles.len(), "rfm profiles computed");
    Ok(profiles)
}

/// Raw feature matrix (n_customers, 3): recency, frequency, monetary.
pub fn feature_matrix(profiles: &[CustomerProfile]) -> Result<Array2<f64>> {
    let mut data = Vec::with_capacity(profiles.len() * 3);
    for profile in profiles {
        data.push(profile.recency_days as f64);
        data.push(f64::from(profile.frequency));
        data.push(profile.monetary);
    }
    Ok(Array2::from_shape_vec((profiles.len(), 3), data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{clean_transactions, header_names};
    use crate::columns::ColumnMap;
    use crate::config::KeywordTable;

    fn cleaned_from(df: DataFrame, months_back: u32) -> CleanedTransactions {
        let columns = ColumnMap::resolve(&header_names(&df), &KeywordTable::default()).unwrap();
        clean_transactions(df, &columns, months_back, "batal").unwrap()
    }

    fn profile<'a>(profiles: &'a [CustomerProfile], name: &str) -> &'a CustomerProfile {
        profiles.iter().find(|p| p.customer == name).unwrap()
    }

    #[test]
    fn rfm_for_a_two_transaction_customer() {
        // Customer A: 50_000 and 70_000 at day offsets -2 and -10 from the
        // run's max date, one invoice each -> recency 2, frequency 2,
        // monetary 120_000.
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-29", "2025-03-21"],
            "Konsumen" => &["B", "A", "A"],
            "Total Harga" => &["15000", "50000", "70000"],
            "No Nota" => &["N-1", "N-2", "N-3"],
        )
        .unwrap();
        let cleaned = cleaned_from(raw, 1);
        let profiles = compute_rfm(&cleaned, FrequencyMode::Invoices).unwrap();

        assert_eq!(profiles.len(), 2);
        let a = profile(&profiles, "A");
        assert_eq!(a.recency_days, 2);
        assert_eq!(a.frequency, 2);
        assert_eq!(a.monetary, 120_000.0);

        let b = profile(&profiles, "B");
        assert_eq!(b.recency_days, 0);
        assert_eq!(b.frequency, 1);
    }

    #[test]
    fn frequency_counts_distinct_invoices_when_resolved() {
        // Two rows of one invoice plus one row of another: frequency 2 by
        // invoice, 3 by transaction count.
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-31", "2025-03-25"],
            "Konsumen" => &["A", "A", "A"],
            "Total Harga" => &["10000", "20000", "30000"],
            "No Nota" => &["N-1", "N-1", "N-2"],
        )
        .unwrap();
        let cleaned = cleaned_from(raw, 1);

        let by_invoice = compute_rfm(&cleaned, FrequencyMode::Invoices).unwrap();
        assert_eq!(by_invoice[0].frequency, 2);

        let by_rows = compute_rfm(&cleaned, FrequencyMode::Transactions).unwrap();
        assert_eq!(by_rows[0].frequency, 3);
        assert_eq!(by_rows[0].monetary, 60_000.0);
    }

    #[test]
    fn invoice_mode_falls_back_without_an_invoice_column() {
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-30"],
            "Konsumen" => &["A", "A"],
            "Total Harga" => &["10000", "20000"],
        )
        .unwrap();
        let cleaned = cleaned_from(raw, 1);
        assert!(!cleaned.has_invoice);

        let profiles = compute_rfm(&cleaned, FrequencyMode::Invoices).unwrap();
        assert_eq!(profiles[0].frequency, 2);
    }

    #[test]
    fn one_profile_per_distinct_customer() {
        let raw = df!(
            "Tanggal Ambil" => &["2025-03-31", "2025-03-30", "2025-03-29", "2025-03-28"],
            "Konsumen" => &["A", "B", "A", "C"],
            "Total Harga" => &["10000", "20000", "30000", "40000"],
        )
        .unwrap();
        let cleaned = cleaned_from(raw, 1);
        let profiles = compute_rfm(&cleaned, FrequencyMode::Invoices).unwrap();

        assert_eq!(profiles.len(), 3);
        let mut names: Vec<&str> = profiles.iter().map(|p| p.customer.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn matrix_rows_follow_profile_order() {
        let profiles = vec![
            CustomerProfile {
                customer: "A".to_string(),
                recency_days: 2,
                frequency: 3,
                monetary: 120_000.0,
            },
            CustomerProfile {
                customer: "B".to_string(),
                recency_days: 10,
                frequency: 1,
                monetary: 15_000.0,
            },
        ];
        let matrix = feature_matrix(&profiles).unwrap();
        assert_eq!(matrix.shape(), &[2, 3]);
        assert_eq!(matrix[[0, 2]], 120_000.0);
        assert_eq!(matrix[[1, 0]], 10.0);
    }
}
