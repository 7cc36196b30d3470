//! K-Means clustering over the standardized RFM features.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::info;

use crate::error::{Result, SegmentationError};

/// Fitted K-Means model with assignments for the run's customers.
#[derive(Debug)]
pub struct KMeansModel {
    pub model: KMeans<f64, L2Dist>,
    /// Effective cluster count. Equals the requested k unless the customer
    /// count was smaller, in which case it was clamped down.
    pub n_clusters: usize,
    /// Cluster id per customer, row-aligned with the feature matrix.
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space.
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares. Diagnostic only; nothing downstream
    /// consumes it.
    pub inertia: f64,
}

impl KMeansModel {
    /// Customer count per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }
}

/// Fit K-Means on standardized features with a fixed seed, multiple random
/// restarts and a bounded iteration cap. The restart with the lowest
/// within-cluster sum of squares wins, so identical input and seed always
/// reproduce the same partition.
pub fn fit_kmeans(
    features: &Array2<f64>,
    requested_clusters: usize,
    max_iterations: u64,
    restarts: usize,
    tolerance: f64,
    seed: u64,
) -> Result<KMeansModel> {
    let n_samples = features.nrows();
    if n_samples == 0 {
        return Err(SegmentationError::EmptyResult {
            stage: "clustering",
            detail: "no profiles to cluster".to_string(),
        });
    }
    if requested_clusters == 0 {
        return Err(SegmentationError::Config(
            "cluster count must be at least 1".to_string(),
        ));
    }

    // Fewer customers than clusters is a valid small dataset, not an
    // error: clamp k to the population size.
    let n_clusters = requested_clusters.min(n_samples);
    if n_clusters < requested_clusters {
        info!(
            requested = requested_clusters,
            effective = n_clusters,
            customers = n_samples,
            "clamped cluster count to customer count"
        );
    }

    let rng = Xoshiro256Plus::seed_from_u64(seed);
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .max_n_iterations(max_iterations)
        .n_runs(restarts)
        .tolerance(tolerance)
        .fit(&dataset)
        .map_err(|e| SegmentationError::Clustering(e.to_string()))?;

    let labels = model.predict(&dataset);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(features, &labels, &centroids);
    info!(n_clusters, inertia, "k-means fitted");

    Ok(KMeansModel {
        model,
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Within-cluster sum of squares over the training assignments.
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;
    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let point = features.row(i);
            let centroid = centroids.row(cluster);
            inertia += point
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
        }
    }
    inertia
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Nine standardized points in three well-separated blobs.
    fn separated_features() -> Array2<f64> {
        Array2::from_shape_vec(
            (9, 3),
            vec![
                -1.0, -1.0, -1.0, -1.1, -0.9, -1.0, -0.9, -1.0, -1.1, //
                0.0, 0.1, 0.0, 0.1, 0.0, -0.1, -0.1, 0.0, 0.1, //
                1.0, 1.0, 1.0, 1.1, 0.9, 1.0, 0.9, 1.1, 1.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn produces_k_distinct_clusters() {
        let features = separated_features();
        let model = fit_kmeans(&features, 3, 300, 10, 1e-4, 42).unwrap();

        assert_eq!(model.n_clusters, 3);
        assert_eq!(model.labels.len(), 9);
        assert_eq!(model.centroids.shape(), &[3, 3]);

        let mut distinct: Vec<usize> = model.labels.iter().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);

        let sizes = model.cluster_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 9);
    }

    #[test]
    fn identical_seed_reproduces_the_partition() {
        let features = separated_features();
        let first = fit_kmeans(&features, 3, 300, 10, 1e-4, 7).unwrap();
        let second = fit_kmeans(&features, 3, 300, 10, 1e-4, 7).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn clamps_k_to_the_customer_count() {
        let features =
            Array2::from_shape_vec((2, 3), vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]).unwrap();
        let model = fit_kmeans(&features, 5, 300, 10, 1e-4, 42).unwrap();
        assert_eq!(model.n_clusters, 2);
        assert_eq!(model.cluster_sizes(), vec![1, 1]);
    }

    #[test]
    fn inertia_is_finite_and_non_negative() {
        let features = separated_features();
        let model = fit_kmeans(&features, 3, 300, 10, 1e-4, 42).unwrap();
        assert!(model.inertia >= 0.0);
        assert!(model.inertia.is_finite());
    }
}
