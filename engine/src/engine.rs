//! Recommendation engine implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use shopsense_catalog::{AnalyticsSummary, Catalog, CatalogItem, CatalogLoader, feature_text, summarize};
use shopsense_embeddings::{
    ClusterAssignment, Embedding, EmbeddingCache, EmbeddingProvider, KMeansParams, VectorIndex,
    kmeans,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::generate::DescriptionGenerator;

/// One immutable `(catalog, index)` pair.
///
/// Built off to the side and swapped in as a unit, so an in-flight
/// query never sees vectors from one snapshot joined against rows from
/// another.
struct Snapshot {
    catalog: Catalog,
    index: VectorIndex,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            catalog: Catalog::default(),
            index: VectorIndex::empty(),
        }
    }
}

/// One enriched recommendation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Item id.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Brand, if known.
    pub brand: Option<String>,

    /// Parsed price, if known.
    pub price: Option<f64>,

    /// Ordered category path.
    pub categories: Vec<String>,

    /// Primary image reference, if any.
    pub image: Option<String>,

    /// Generated blurb, or the item's stored description when the
    /// generator is unavailable or fails.
    pub description: String,

    /// Outbound search link for the item.
    pub link: String,

    /// Similarity score from the index.
    pub score: f32,
}

/// The recommendation & analytics engine.
///
/// Coordinates the catalog snapshot, the vector index, the embedding
/// provider, and the description generator behind the three operations
/// the request layer binds to: `recommend`, `summarize`, and `cluster`.
pub struct RecommendEngine {
    /// Configuration.
    config: EngineConfig,

    /// Embedding provider.
    provider: Arc<dyn EmbeddingProvider>,

    /// Optional description generator.
    generator: Option<Arc<dyn DescriptionGenerator>>,

    /// Feature-text embedding cache, reused across rebuilds.
    cache: EmbeddingCache,

    /// Currently served snapshot; replaced wholesale on rebuild.
    state: RwLock<Arc<Snapshot>>,
}

impl RecommendEngine {
    /// Create a new engine builder.
    pub fn builder() -> RecommendEngineBuilder {
        RecommendEngineBuilder::new()
    }

    /// Create an engine with no catalog loaded yet.
    pub fn new(config: EngineConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        let cache = EmbeddingCache::new(config.ingest.cache_max_entries);
        Self {
            config,
            provider,
            generator: None,
            cache,
            state: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Attach a description generator.
    pub fn with_generator(mut self, generator: Arc<dyn DescriptionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Load a CSV catalog and publish it as the served snapshot.
    pub async fn rebuild_from_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let catalog = CatalogLoader::load_path(path)?;
        self.rebuild(catalog).await
    }

    /// Build the index for a catalog and atomically publish the pair.
    ///
    /// The snapshot is embedded and indexed in full before the swap;
    /// any failure leaves the currently served pair untouched.
    pub async fn rebuild(&self, catalog: Catalog) -> Result<()> {
        let index = self.build_index(&catalog).await?;
        let items = catalog.len();

        let snapshot = Arc::new(Snapshot { catalog, index });
        *self.state.write().await = snapshot;

        info!("published catalog snapshot: {items} items");
        Ok(())
    }

    /// Merge additional rows after the current snapshot and republish.
    ///
    /// Duplicate ids across the union keep the first-seen row. Returns
    /// the new item count.
    pub async fn append(&self, rows: Vec<CatalogItem>) -> Result<usize> {
        let current = self.state.read().await.clone();

        let merged: Vec<CatalogItem> = current
            .catalog
            .items()
            .iter()
            .cloned()
            .chain(rows)
            .collect();
        let catalog = Catalog::from_items(merged);
        let count = catalog.len();

        self.rebuild(catalog).await?;
        Ok(count)
    }

    /// Embed every item's feature text and build the vector index.
    ///
    /// Unchanged feature texts hit the cache, so appends only pay for
    /// new rows.
    async fn build_index(&self, catalog: &Catalog) -> Result<VectorIndex> {
        let provider_name = self.provider.name().to_string();

        let mut rows: Vec<(String, Embedding)> = Vec::with_capacity(catalog.len());
        let mut pending_texts: Vec<String> = Vec::new();
        let mut pending_slots: Vec<usize> = Vec::new();

        for item in catalog.iter() {
            let text = feature_text(item);
            match self.cache.get(&text, &provider_name).await {
                Some(vector) => rows.push((item.id.clone(), vector)),
                None => {
                    pending_slots.push(rows.len());
                    pending_texts.push(text);
                    rows.push((item.id.clone(), Vec::new()));
                }
            }
        }

        if !pending_texts.is_empty() {
            debug!(
                "embedding {} of {} items ({} cached)",
                pending_texts.len(),
                catalog.len(),
                catalog.len() - pending_texts.len()
            );

            let timeout_secs = self.config.ingest.embed_timeout_secs;
            let embeddings = timeout(
                Duration::from_secs(timeout_secs),
                self.provider.embed_batch(&pending_texts),
            )
            .await
            .map_err(|_| EngineError::ProviderTimeout {
                operation: "snapshot embedding",
                timeout_secs,
            })??;

            if embeddings.len() != pending_texts.len() {
                return Err(shopsense_embeddings::EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    pending_texts.len(),
                    embeddings.len()
                ))
                .into());
            }

            for ((slot, text), embedding) in pending_slots
                .into_iter()
                .zip(pending_texts)
                .zip(embeddings)
            {
                self.cache.put(&text, &provider_name, embedding.clone()).await;
                rows[slot].1 = embedding;
            }
        }

        Ok(VectorIndex::from_vectors(rows)?)
    }

    /// Recommend catalog items for a free-text query.
    ///
    /// `k` is clamped into `[1, config.query.max_results]`. Results are
    /// ordered by similarity; there is no re-ranking by price or
    /// popularity.
    pub async fn recommend(&self, query: &str, k: usize) -> Result<Vec<Recommendation>> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidQuery);
        }
        let k = k.clamp(1, self.config.query.max_results);

        let state = self.state.read().await.clone();

        let timeout_secs = self.config.query.embed_timeout_secs;
        let query_vector = timeout(
            Duration::from_secs(timeout_secs),
            self.provider.embed(query),
        )
        .await
        .map_err(|_| EngineError::ProviderTimeout {
            operation: "query embedding",
            timeout_secs,
        })??;

        let hits = state.index.search(&query_vector, k)?;
        debug!("query matched {} items", hits.len());

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(item) = state.catalog.get(&hit.id) else {
                // Unreachable with a consistent pair; skip rather than fail.
                warn!("search hit {} missing from snapshot", hit.id);
                continue;
            };

            let description = self.describe(item, query).await;

            results.push(Recommendation {
                id: item.id.clone(),
                title: item.title.clone(),
                brand: (!item.brand.is_empty()).then(|| item.brand.clone()),
                price: item.price,
                categories: item.categories.clone(),
                image: item.primary_image().map(str::to_string),
                description,
                link: build_link(item),
                score: hit.score,
            });
        }

        Ok(results)
    }

    /// Generate a blurb for one result, degrading to the item's stored
    /// description on any generator failure or timeout.
    async fn describe(&self, item: &CatalogItem, query: &str) -> String {
        if let Some(generator) = &self.generator {
            if generator.is_available() {
                let timeout_secs = self.config.query.generate_timeout_secs;
                match timeout(
                    Duration::from_secs(timeout_secs),
                    generator.generate(item, query),
                )
                .await
                {
                    Ok(Ok(blurb)) if !blurb.trim().is_empty() => return blurb,
                    Ok(Ok(_)) => warn!("generator returned empty blurb for {}", item.id),
                    Ok(Err(e)) => warn!("generator failed for {}: {e}", item.id),
                    Err(_) => warn!("generator timed out for {}", item.id),
                }
            }
        }

        item.description.clone()
    }

    /// Compute aggregate statistics over the served snapshot.
    pub async fn summarize(&self) -> AnalyticsSummary {
        let state = self.state.read().await.clone();
        summarize(&state.catalog)
    }

    /// Cluster the served snapshot's items over their embeddings.
    ///
    /// `n_clusters` falls back to the configured default and is clamped
    /// to the item count. An empty catalog yields an empty assignment.
    pub async fn cluster(&self, n_clusters: Option<usize>) -> Result<ClusterAssignment> {
        let state = self.state.read().await.clone();
        if state.index.is_empty() {
            return Ok(ClusterAssignment::default());
        }

        let params = KMeansParams {
            n_clusters: n_clusters.unwrap_or(self.config.clustering.default_clusters),
            max_iter: self.config.clustering.max_iter,
            tol: self.config.clustering.tol,
            seed: self.config.clustering.seed,
        };

        let (labels, used_clusters) = kmeans(state.index.vectors(), &params)?;
        Ok(ClusterAssignment::new(state.index.ids(), labels, used_clusters))
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await.clone();

        EngineStats {
            items: state.catalog.len(),
            embeddings: state.index.len(),
            dimension: state.index.dimension(),
            cached_embeddings: self.cache.len().await,
        }
    }
}

/// Outbound search link for an item.
///
/// The source data carries no product URLs, so consumers get a web
/// search over title and brand, falling back to the id.
fn build_link(item: &CatalogItem) -> String {
    let query = format!("{} {}", item.title, item.brand);
    let query = query.trim();
    let query = if query.is_empty() { &item.id } else { query };
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

/// Builder for the recommendation engine.
pub struct RecommendEngineBuilder {
    config: EngineConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn DescriptionGenerator>>,
}

impl RecommendEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            provider: None,
            generator: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the embedding provider (required).
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the description generator.
    pub fn with_generator(mut self, generator: Arc<dyn DescriptionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<RecommendEngine> {
        let provider = self
            .provider
            .ok_or_else(|| EngineError::Config("an embedding provider is required".to_string()))?;

        let mut engine = RecommendEngine::new(self.config, provider);
        if let Some(generator) = self.generator {
            engine = engine.with_generator(generator);
        }
        Ok(engine)
    }
}

impl Default for RecommendEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the engine's served snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Items in the served snapshot.
    pub items: usize,

    /// Vectors in the served index.
    pub embeddings: usize,

    /// Embedding dimension (0 before the first rebuild).
    pub dimension: usize,

    /// Vectors held by the rebuild cache.
    pub cached_embeddings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use shopsense_embeddings::HashingProvider;

    fn sample_catalog() -> Catalog {
        let mut chair = CatalogItem::new("1", "Oak Dining Chair");
        chair.brand = "Oakline".to_string();
        chair.description = "Solid oak chair with a woven seat.".to_string();
        chair.price = Some(2499.0);
        chair.images = vec!["chair.jpg".to_string()];

        let mut stool = CatalogItem::new("2", "Plastic Stool");
        stool.description = "Lightweight stacking stool.".to_string();

        Catalog::from_items([chair, stool])
    }

    fn engine() -> RecommendEngine {
        RecommendEngine::builder()
            .with_provider(Arc::new(HashingProvider::with_dimension(64)))
            .build()
            .unwrap()
    }

    /// Generator that always fails, for fallback coverage.
    struct BrokenGenerator;

    #[async_trait]
    impl DescriptionGenerator for BrokenGenerator {
        fn name(&self) -> &str {
            "broken"
        }

        async fn generate(&self, _item: &CatalogItem, _query: &str) -> Result<String> {
            Err(EngineError::Generation("backend offline".to_string()))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    /// Provider whose futures never resolve, for timeout coverage.
    struct StalledProvider;

    #[async_trait]
    impl EmbeddingProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        fn dimension(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> shopsense_embeddings::Result<Embedding> {
            std::future::pending().await
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_recommend_before_rebuild_is_empty_index() {
        let err = engine().recommend("chair", 3).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Embedding(shopsense_embeddings::EmbeddingError::EmptyIndex)
        ));
    }

    #[tokio::test]
    async fn test_recommend_rejects_blank_query() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        assert!(matches!(
            engine.recommend("", 5).await.unwrap_err(),
            EngineError::InvalidQuery
        ));
        assert!(matches!(
            engine.recommend("   ", 5).await.unwrap_err(),
            EngineError::InvalidQuery
        ));
    }

    #[tokio::test]
    async fn test_recommend_enriches_results() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let results = engine.recommend("oak dining chair", 1).await.unwrap();
        assert_eq!(results.len(), 1);

        let top = &results[0];
        assert_eq!(top.id, "1");
        assert_eq!(top.brand.as_deref(), Some("Oakline"));
        assert_eq!(top.price, Some(2499.0));
        assert_eq!(top.image.as_deref(), Some("chair.jpg"));
        // No generator attached: description falls back to the stored one.
        assert_eq!(top.description, "Solid oak chair with a woven seat.");
        assert!(top.link.contains("Oak%20Dining%20Chair"));
    }

    #[tokio::test]
    async fn test_recommend_k_clamped_to_catalog() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let results = engine.recommend("stool", 10).await.unwrap();
        assert_eq!(results.len(), 2);

        // Scores are non-increasing.
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_generator_failure_falls_back() {
        let engine = RecommendEngine::builder()
            .with_provider(Arc::new(HashingProvider::with_dimension(64)))
            .with_generator(Arc::new(BrokenGenerator))
            .build()
            .unwrap();
        engine.rebuild(sample_catalog()).await.unwrap();

        let results = engine.recommend("plastic stool", 1).await.unwrap();
        assert_eq!(results[0].description, "Lightweight stacking stool.");
    }

    #[tokio::test]
    async fn test_query_embedding_timeout_is_retryable() {
        let mut config = EngineConfig::default();
        config.query.embed_timeout_secs = 0;

        // The query is embedded before the index is consulted, so the
        // stalled provider trips the timeout first.
        let engine = RecommendEngine::builder()
            .with_config(config)
            .with_provider(Arc::new(StalledProvider))
            .build()
            .unwrap();

        let err = engine.recommend("chair", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::ProviderTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_old_snapshot() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let mut bad_csv = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut bad_csv, b"no,id,columns\n1,2,3\n").unwrap();
        assert!(engine.rebuild_from_path(bad_csv.path()).await.is_err());

        // The served snapshot is still the original one.
        let summary = engine.summarize().await;
        assert_eq!(summary.count, 2);
    }

    #[tokio::test]
    async fn test_append_merges_and_keeps_first_seen() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let mut dup = CatalogItem::new("1", "Imposter Chair");
        dup.price = Some(1.0);
        let lamp = CatalogItem::new("3", "Brass Floor Lamp");

        let count = engine.append(vec![dup, lamp]).await.unwrap();
        assert_eq!(count, 3);

        let results = engine.recommend("oak dining chair", 1).await.unwrap();
        assert_eq!(results[0].title, "Oak Dining Chair");
    }

    #[tokio::test]
    async fn test_cluster_empty_catalog() {
        let assignment = engine().cluster(None).await.unwrap();
        assert!(assignment.is_empty());
    }

    #[tokio::test]
    async fn test_cluster_labels_every_item() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let assignment = engine.cluster(Some(5)).await.unwrap();
        assert_eq!(assignment.len(), 2);
        // Requested 5 clusters but only 2 items exist.
        assert_eq!(assignment.n_clusters, 2);
        assert!(assignment.label_of("1").is_some());
        assert!(assignment.label_of("2").is_some());
    }

    #[tokio::test]
    async fn test_stats_reflect_snapshot() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();

        let stats = engine.stats().await;
        assert_eq!(stats.items, 2);
        assert_eq!(stats.embeddings, 2);
        assert_eq!(stats.dimension, 64);
        assert_eq!(stats.cached_embeddings, 2);
    }

    #[tokio::test]
    async fn test_rebuild_reuses_cached_embeddings() {
        let engine = engine();
        engine.rebuild(sample_catalog()).await.unwrap();
        engine.append(vec![CatalogItem::new("3", "Brass Floor Lamp")]).await.unwrap();

        let stats = engine.stats().await;
        // Two original items hit the cache; only the lamp was new.
        assert_eq!(stats.cached_embeddings, 3);
    }

    #[test]
    fn test_build_link_falls_back_to_id() {
        let item = CatalogItem::new("xyz", "");
        assert!(build_link(&item).ends_with("xyz"));
    }
}
