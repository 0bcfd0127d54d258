//! Seeded k-means clustering over the embedding space.
//!
//! Lloyd's algorithm with k-means++ initialization. All randomness
//! flows through one seeded generator, so a fixed seed over a fixed
//! snapshot always yields the same labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::squared_euclidean;

/// Parameters for one k-means run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansParams {
    /// Requested number of clusters. Clamped to the number of points,
    /// so a small catalog never produces degenerate singleton requests.
    pub n_clusters: usize,

    /// Maximum Lloyd iterations.
    pub max_iter: usize,

    /// Convergence tolerance on squared centroid movement.
    pub tol: f32,

    /// Seed for centroid initialization.
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iter: 100,
            tol: 1e-6,
            seed: 42,
        }
    }
}

/// Mapping from item id to cluster label for one snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Number of clusters actually used (after clamping).
    pub n_clusters: usize,

    /// `(id, label)` pairs in snapshot order; labels are in
    /// `0..n_clusters`.
    pub labels: Vec<(String, usize)>,
}

impl ClusterAssignment {
    /// Pair snapshot-ordered ids with their labels.
    pub fn new(ids: &[String], labels: Vec<usize>, n_clusters: usize) -> Self {
        Self {
            n_clusters,
            labels: ids.iter().cloned().zip(labels).collect(),
        }
    }

    /// Number of labeled items.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no items were labeled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a given item id.
    pub fn label_of(&self, id: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(item_id, _)| item_id == id)
            .map(|(_, label)| *label)
    }
}

/// Assign every point exactly one label in `0..k`.
///
/// An empty input yields an empty assignment, not an error. `k` is the
/// requested cluster count clamped to `[1, points.len()]`; the clamped
/// value is returned alongside the labels.
pub fn kmeans(points: &[Embedding], params: &KMeansParams) -> Result<(Vec<usize>, usize)> {
    if points.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let dim = points[0].len();
    for point in points {
        if point.len() != dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: point.len(),
            });
        }
    }

    let k = params.n_clusters.clamp(1, points.len());
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut centroids = init_plus_plus(points, k, &mut rng);
    let mut labels = vec![0usize; points.len()];

    for iteration in 0..params.max_iter {
        // Assignment step: nearest centroid, lowest index on ties.
        for (i, point) in points.iter().enumerate() {
            labels[i] = nearest_centroid(point, &centroids);
        }

        // Update step.
        let mut sums = vec![vec![0.0f32; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in points.iter().zip(labels.iter()) {
            counts[label] += 1;
            for (acc, value) in sums[label].iter_mut().zip(point.iter()) {
                *acc += value;
            }
        }

        let mut max_shift = 0.0f32;
        for cluster in 0..k {
            if counts[cluster] == 0 {
                // Reseed a dead cluster from the point farthest from its
                // current centroid, so every label stays reachable.
                let farthest = farthest_point(points, &labels, &centroids);
                centroids[cluster] = points[farthest].clone();
                max_shift = f32::MAX;
                continue;
            }

            let new_centroid: Embedding = sums[cluster]
                .iter()
                .map(|v| v / counts[cluster] as f32)
                .collect();
            max_shift = max_shift.max(squared_euclidean(&centroids[cluster], &new_centroid));
            centroids[cluster] = new_centroid;
        }

        if max_shift < params.tol {
            debug!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    // Final assignment against the settled centroids.
    for (i, point) in points.iter().enumerate() {
        labels[i] = nearest_centroid(point, &centroids);
    }

    Ok((labels, k))
}

/// k-means++ seeding: later centroids are sampled proportionally to
/// their squared distance from the nearest centroid chosen so far.
fn init_plus_plus(points: &[Embedding], k: usize, rng: &mut StdRng) -> Vec<Embedding> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f32> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_euclidean(p, c))
                    .fold(f32::MAX, f32::min)
            })
            .collect();

        let total: f32 = distances.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a centroid.
            centroids.push(points[rng.random_range(0..points.len())].clone());
            continue;
        }

        let mut target = rng.random::<f32>() * total;
        let mut chosen = points.len() - 1;
        for (i, d) in distances.iter().enumerate() {
            target -= d;
            if target <= 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen].clone());
    }

    centroids
}

fn nearest_centroid(point: &Embedding, centroids: &[Embedding]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (cluster, centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = cluster;
        }
    }
    best
}

fn farthest_point(points: &[Embedding], labels: &[usize], centroids: &[Embedding]) -> usize {
    let mut farthest = 0;
    let mut farthest_distance = -1.0f32;
    for (i, point) in points.iter().enumerate() {
        let distance = squared_euclidean(point, &centroids[labels[i]]);
        if distance > farthest_distance {
            farthest_distance = distance;
            farthest = i;
        }
    }
    farthest
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_blobs() -> Vec<Embedding> {
        vec![
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![0.05, 0.05],
            vec![10.0, 10.1],
            vec![10.1, 10.0],
            vec![10.05, 10.05],
        ]
    }

    #[test]
    fn test_kmeans_separates_obvious_blobs() {
        let params = KMeansParams {
            n_clusters: 2,
            ..KMeansParams::default()
        };
        let (labels, k) = kmeans(&two_blobs(), &params).unwrap();

        assert_eq!(k, 2);
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_deterministic_for_fixed_seed() {
        let params = KMeansParams {
            n_clusters: 3,
            ..KMeansParams::default()
        };
        let (a, _) = kmeans(&two_blobs(), &params).unwrap();
        let (b, _) = kmeans(&two_blobs(), &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kmeans_clamps_k_to_point_count() {
        let points = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let params = KMeansParams {
            n_clusters: 8,
            ..KMeansParams::default()
        };
        let (labels, k) = kmeans(&points, &params).unwrap();

        assert_eq!(k, 2);
        assert!(labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn test_kmeans_empty_input() {
        let (labels, k) = kmeans(&[], &KMeansParams::default()).unwrap();
        assert!(labels.is_empty());
        assert_eq!(k, 0);
    }

    #[test]
    fn test_kmeans_every_point_labeled_within_bound() {
        let params = KMeansParams {
            n_clusters: 4,
            ..KMeansParams::default()
        };
        let points = two_blobs();
        let (labels, k) = kmeans(&points, &params).unwrap();

        assert_eq!(labels.len(), points.len());
        assert!(labels.iter().all(|&l| l < k));
    }

    #[test]
    fn test_cluster_assignment_lookup() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let assignment = ClusterAssignment::new(&ids, vec![1, 0], 2);

        assert_eq!(assignment.label_of("a"), Some(1));
        assert_eq!(assignment.label_of("b"), Some(0));
        assert_eq!(assignment.label_of("missing"), None);
    }
}
