//! Build-once vector index with exact top-k search.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use crate::similarity::{find_top_k, normalize};

/// One scored search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Id of the matched item.
    pub id: String,

    /// Similarity score (inner product over normalized vectors).
    pub score: f32,
}

/// An immutable vector index over one catalog snapshot.
///
/// Rows keep ingestion order and every vector is L2-normalized at build
/// time, so search is a plain dot product against every row with a
/// partial top-k selection. Exact brute force is deliberate: for
/// catalogs in the thousands it is fast enough and keeps results
/// reproducible. The index is never mutated after construction; a new
/// snapshot builds a new index that replaces this one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    ids: Vec<String>,
    vectors: Vec<Embedding>,
    dimension: usize,
}

impl VectorIndex {
    /// An index with no rows. Searching it fails with `EmptyIndex`.
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            dimension: 0,
        }
    }

    /// Build an index from precomputed `(id, vector)` rows.
    ///
    /// All vectors must share one dimension; a mismatch fails the whole
    /// build so a partially-built index is never observable.
    pub fn from_vectors(rows: Vec<(String, Embedding)>) -> Result<Self> {
        let mut ids = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len());
        let mut dimension = 0;

        for (id, mut vector) in rows {
            if dimension == 0 {
                dimension = vector.len();
            }
            if vector.len() != dimension || vector.is_empty() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector);
            ids.push(id);
            vectors.push(vector);
        }

        info!("built vector index: {} rows, dimension {dimension}", ids.len());
        Ok(Self {
            ids,
            vectors,
            dimension,
        })
    }

    /// Embed `(id, text)` pairs through a provider and build the index.
    pub async fn build(
        rows: Vec<(String, String)>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let (ids, texts): (Vec<String>, Vec<String>) = rows.into_iter().unzip();

        debug!("embedding {} rows via provider {}", texts.len(), provider.name());
        let embeddings = provider.embed_batch(&texts).await?;

        Self::from_vectors(ids.into_iter().zip(embeddings).collect())
    }

    /// Return the `k` rows most similar to the query vector.
    ///
    /// `k` is clamped to at least 1; an index holding fewer than `k`
    /// rows returns everything ordered by score. Equal scores keep
    /// ingestion order.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>> {
        if self.vectors.is_empty() {
            return Err(EmbeddingError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut query = query.clone();
        normalize(&mut query);

        let top = find_top_k(&query, &self.vectors, k.max(1))?;

        Ok(top
            .into_iter()
            .map(|(row, score)| SearchHit {
                id: self.ids[row].clone(),
                score,
            })
            .collect())
    }

    /// Number of rows in the index.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Embedding dimension, or 0 for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row ids in ingestion order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Normalized vectors in ingestion order.
    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }
}
