//! Rank-based segment labeling.
//!
//! Clusters are scored on their mean RFM profile against population maxima,
//! sorted best-first and mapped onto the ordered tier table from the
//! segment policy. Rank-based assignment is scale-invariant and gives
//! exactly one segment name per rank, unlike threshold labeling, which
//! breaks when the data scale shifts and can hand two clusters the same
//! name.

use ndarray::Array1;
use tracing::info;

use crate::config::SegmentPolicy;
use crate::error::{Result, SegmentationError};
use crate::rfm::CustomerProfile;

/// Aggregate statistics and assigned identity for one cluster.
#[derive(Debug, Clone)]
pub struct SegmentSummary {
    pub cluster_id: usize,
    /// 1 = best cluster. Doubles as the promo priority.
    pub rank: usize,
    pub name: String,
    pub icon: String,
    pub discount_percent: f64,
    pub customer_count: usize,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    /// Composite RFM score in roughly [0, 3], higher is better.
    pub score: f64,
}

/// One customer row of the full profile table handed to collaborators.
#[derive(Debug, Clone)]
pub struct LabeledProfile {
    pub customer: String,
    pub recency_days: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub cluster_id: usize,
    pub rank: usize,
    pub segment: String,
    pub icon: String,
    pub discount_percent: f64,
}

/// Score clusters, rank them and join every profile with its segment
/// identity. `labels` must be row-aligned with `profiles`.
pub fn label_clusters(
    profiles: &[CustomerProfile],
    labels: &Array1<usize>,
    n_clusters: usize,
    policy: &SegmentPolicy,
) -> Result<(Vec<LabeledProfile>, Vec<SegmentSummary>)> {
    if profiles.len() != labels.len() {
        return Err(SegmentationError::Clustering(format!(
            "{} profiles but {} cluster labels",
            profiles.len(),
            labels.len()
        )));
    }
    if n_clusters > policy.tiers.len() {
        return Err(SegmentationError::Config(format!(
            "{} clusters but only {} segment tiers defined",
            n_clusters,
            policy.tiers.len()
        )));
    }

    // Per-cluster totals.
    let mut counts = vec![0usize; n_clusters];
    let mut recency_sums = vec![0.0f64; n_clusters];
    let mut frequency_sums = vec![0.0f64; n_clusters];
    let mut monetary_sums = vec![0.0f64; n_clusters];
    for (profile, &cluster) in profiles.iter().zip(labels.iter()) {
        if cluster >= n_clusters {
            return Err(SegmentationError::Clustering(format!(
                "cluster label {cluster} out of range for k={n_clusters}"
            )));
        }
        counts[cluster] += 1;
        recency_sums[cluster] += profile.recency_days as f64;
        frequency_sums[cluster] += f64::from(profile.frequency);
        monetary_sums[cluster] += profile.monetary;
    }

    // Population maxima normalize the three score terms. A zero maximum
    // (everyone transacted today, say) contributes the term's limit value
    // instead of dividing by zero.
    let max_recency = profiles
        .iter()
        .map(|p| p.recency_days as f64)
        .fold(0.0, f64::max);
    let max_frequency = profiles
        .iter()
        .map(|p| f64::from(p.frequency))
        .fold(0.0, f64::max);
    let max_monetary = profiles.iter().map(|p| p.monetary).fold(0.0, f64::max);
    let ratio = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    struct Scored {
        cluster_id: usize,
        customer_count: usize,
        mean_recency: f64,
        mean_frequency: f64,
        mean_monetary: f64,
        score: f64,
    }

    let mut scored: Vec<Scored> = (0..n_clusters)
        .map(|cluster_id| {
            let count = counts[cluster_id].max(1) as f64;
            let mean_recency = recency_sums[cluster_id] / count;
            let mean_frequency = frequency_sums[cluster_id] / count;
            let mean_monetary = monetary_sums[cluster_id] / count;
            let score = (1.0 - ratio(mean_recency, max_recency))
                + ratio(mean_frequency, max_frequency)
                + ratio(mean_monetary, max_monetary);
            Scored {
                cluster_id,
                customer_count: counts[cluster_id],
                mean_recency,
                mean_frequency,
                mean_monetary,
                score,
            }
        })
        .collect();

    // Best score first; ties broken by ascending cluster id so the ranking
    // is a deterministic total order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cluster_id.cmp(&b.cluster_id))
    });

    let summaries: Vec<SegmentSummary> = scored
        .into_iter()
        .zip(policy.tiers.iter())
        .enumerate()
        .map(|(i, (cluster, tier))| SegmentSummary {
            cluster_id: cluster.cluster_id,
            rank: i + 1,
            name: tier.name.clone(),
            icon: tier.icon.clone(),
            discount_percent: tier.discount_percent,
            customer_count: cluster.customer_count,
            mean_recency: cluster.mean_recency,
            mean_frequency: cluster.mean_frequency,
            mean_monetary: cluster.mean_monetary,
            score: cluster.score,
        })
        .collect();

    for summary in &summaries {
        info!(
            rank = summary.rank,
            cluster = summary.cluster_id,
            segment = %summary.name,
            customers = summary.customer_count,
            score = summary.score,
            "cluster ranked"
        );
    }

    // cluster id -> position in summaries, for the per-profile join.
    let mut by_cluster = vec![0usize; n_clusters];
    for (i, summary) in summaries.iter().enumerate() {
        by_cluster[summary.cluster_id] = i;
    }

    let labeled = profiles
        .iter()
        .zip(labels.iter())
        .map(|(profile, &cluster)| {
            let summary = &summaries[by_cluster[cluster]];
            LabeledProfile {
                customer: profile.customer.clone(),
                recency_days: profile.recency_days,
                frequency: profile.frequency,
                monetary: profile.monetary,
                cluster_id: cluster,
                rank: summary.rank,
                segment: summary.name.clone(),
                icon: summary.icon.clone(),
                discount_percent: summary.discount_percent,
            }
        })
        .collect();

    Ok((labeled, summaries))
}
