//! Pipeline configuration: analysis period, clustering parameters, keyword
//! tables for header resolution and the segment tier policy.
//!
//! Everything the business can tune lives here; nothing in the pipeline
//! itself hardcodes discounts, keyword lists or the random seed.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SegmentationError};

/// How to count purchase events per customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FrequencyMode {
    /// Count distinct invoice numbers. Falls back to counting transaction
    /// rows when no invoice column was resolved.
    Invoices,
    /// Count transaction rows regardless of invoice grouping.
    Transactions,
}

/// One segment tier: the identity and discount attached to a rank.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentTier {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub discount_percent: f64,
}

/// Ordered tier table. Index 0 is rank 1 (best cluster) and so on.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentPolicy {
    pub tiers: Vec<SegmentTier>,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        let tiers = [
            ("VIP Champions", "\u{1F3C6}", 15.0),
            ("High Value Loyal", "\u{1F48E}", 10.0),
            ("Regular Loyal", "\u{1F49A}", 5.0),
            ("At Risk", "\u{26A0}\u{FE0F}", 7.0),
            ("Sleeping Customers", "\u{1F634}", 10.0),
        ];
        SegmentPolicy {
            tiers: tiers
                .into_iter()
                .map(|(name, icon, discount_percent)| SegmentTier {
                    name: name.to_string(),
                    icon: icon.to_string(),
                    discount_percent,
                })
                .collect(),
        }
    }
}

impl SegmentPolicy {
    /// Load a tier table from a TOML file:
    ///
    /// ```toml
    /// [[tiers]]
    /// name = "VIP Champions"
    /// icon = "🏆"
    /// discount_percent = 15.0
    /// ```
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let policy: SegmentPolicy = toml::from_str(&raw)
            .map_err(|e| SegmentationError::Config(format!("{}: {e}", path.display())))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Replace the discount column, keeping names and icons. Used for the
    /// CLI `--discounts` override.
    pub fn with_discounts(mut self, discounts: &[f64]) -> Result<Self> {
        if discounts.len() != self.tiers.len() {
            return Err(SegmentationError::Config(format!(
                "expected {} discount values, got {}",
                self.tiers.len(),
                discounts.len()
            )));
        }
        for (tier, &discount) in self.tiers.iter_mut().zip(discounts) {
            tier.discount_percent = discount;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(SegmentationError::Config(
                "segment policy must define at least one tier".to_string(),
            ));
        }
        if let Some(tier) = self
            .tiers
            .iter()
            .find(|t| !(0.0..=100.0).contains(&t.discount_percent))
        {
            return Err(SegmentationError::Config(format!(
                "discount for '{}' must be between 0 and 100",
                tier.name
            )));
        }
        Ok(())
    }
}

/// Keyword priority lists used by the column resolver. Order matters: the
/// first keyword that matches wins within each matching pass.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub pickup_date: Vec<String>,
    pub customer: Vec<String>,
    pub total_price: Vec<String>,
    pub invoice: Vec<String>,
    pub status: Vec<String>,
    pub order_date: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        // Defaults cover the Indonesian cashier exports this tool was built
        // around, plus their English equivalents.
        KeywordTable {
            pickup_date: owned(&[
                "tanggal ar",
                "tanggal ambil",
                "tgl ambil",
                "tanggalambil",
                "pickup date",
            ]),
            customer: owned(&["konsumer", "konsumen", "customer", "pelanggan"]),
            total_price: owned(&["total harg", "total harga", "totalharga", "total price"]),
            invoice: owned(&["nota", "invoice", "no nota", "nonota", "no.nota"]),
            status: owned(&["status order", "statusorder", "status"]),
            order_date: owned(&["tanggal order", "tgl order", "tanggalorder", "order date"]),
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width of the analysis window in months (30-day blocks).
    pub months_back: u32,
    /// Requested cluster count. Clamped to the customer count at fit time.
    pub clusters: usize,
    /// Promotional cohort target size.
    pub cohort_size: usize,
    /// Seed for the clustering RNG. Identical input + seed reproduces the
    /// exact same partition.
    pub seed: u64,
    /// Iteration cap per k-means restart.
    pub max_iterations: u64,
    /// Number of random restarts; the run with lowest inertia wins.
    pub restarts: usize,
    /// Convergence tolerance for k-means.
    pub tolerance: f64,
    pub frequency_mode: FrequencyMode,
    /// Case-insensitive substring marking a canceled transaction.
    pub cancel_marker: String,
    pub keywords: KeywordTable,
    pub segments: SegmentPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            months_back: 1,
            clusters: 5,
            cohort_size: 10,
            seed: 42,
            max_iterations: 300,
            restarts: 10,
            tolerance: 1e-4,
            frequency_mode: FrequencyMode::Invoices,
            cancel_marker: "batal".to_string(),
            keywords: KeywordTable::default(),
            segments: SegmentPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.months_back == 0 {
            return Err(SegmentationError::Config(
                "months_back must be at least 1".to_string(),
            ));
        }
        if self.clusters == 0 {
            return Err(SegmentationError::Config(
                "cluster count must be at least 1".to_string(),
            ));
        }
        if self.cohort_size == 0 {
            return Err(SegmentationError::Config(
                "cohort size must be at least 1".to_string(),
            ));
        }
        if self.clusters > self.segments.tiers.len() {
            return Err(SegmentationError::Config(format!(
                "{} clusters requested but the segment policy only defines {} tiers",
                self.clusters,
                self.segments.tiers.len()
            )));
        }
        self.segments.validate()
    }
}
