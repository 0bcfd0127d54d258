//! Configuration for the recommendation engine.

use serde::{Deserialize, Serialize};

/// Configuration for the recommendation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Query-time configuration.
    pub query: QueryConfig,

    /// Clustering configuration.
    pub clustering: ClusteringConfig,

    /// Ingestion configuration.
    pub ingest: IngestConfig,
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Set the clustering configuration.
    pub fn with_clustering(mut self, config: ClusteringConfig) -> Self {
        self.clustering = config;
        self
    }

    /// Set the ingestion configuration.
    pub fn with_ingest(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    /// Cap on results per recommendation request.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.query.max_results = max_results.max(1);
        self
    }
}

/// Configuration for query processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of results per request; requested `k` is clamped
    /// into `[1, max_results]`.
    pub max_results: usize,

    /// Bounded timeout for embedding the query text (seconds).
    pub embed_timeout_secs: u64,

    /// Bounded timeout per generated description (seconds).
    pub generate_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: 25,
            embed_timeout_secs: 8,
            generate_timeout_secs: 10,
        }
    }
}

/// Configuration for k-means clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Cluster count used when a request does not specify one.
    pub default_clusters: usize,

    /// Maximum Lloyd iterations.
    pub max_iter: usize,

    /// Convergence tolerance on squared centroid movement.
    pub tol: f32,

    /// Seed for deterministic initialization.
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_clusters: 8,
            max_iter: 100,
            tol: 1e-6,
            seed: 42,
        }
    }
}

/// Configuration for snapshot ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bounded timeout for embedding a whole snapshot (seconds).
    pub embed_timeout_secs: u64,

    /// Maximum embeddings kept in the rebuild cache.
    pub cache_max_entries: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            embed_timeout_secs: 300,
            cache_max_entries: 10_000,
        }
    }
}
