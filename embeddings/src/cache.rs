//! Embedding cache.
//!
//! Feature text is deterministic per item, so a vector computed during
//! one index build can be reused by the next rebuild of the same
//! process (for example when new rows are appended to the catalog).
//! The cache is in-memory only: snapshots are rebuilt wholesale and
//! nothing here needs to outlive the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::Embedding;

/// Cache entry for an embedding.
#[derive(Debug, Clone)]
struct CacheEntry {
    embedding: Embedding,
    inserted_at: u64,
}

/// Cache for embeddings to avoid redundant provider calls.
///
/// Keys combine the text with the provider name, so switching providers
/// never serves a stale vector.
pub struct EmbeddingCache {
    entries: Arc<RwLock<HashMap<u64, CacheEntry>>>,
    max_entries: usize,
    sequence: AtomicU64,
}

impl EmbeddingCache {
    /// Create a cache bounded to `max_entries` vectors.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    /// Compute a key for cache lookup.
    fn hash_key(text: &str, provider: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        provider.hash(&mut hasher);
        hasher.finish()
    }

    /// Get a cached embedding.
    pub async fn get(&self, text: &str, provider: &str) -> Option<Embedding> {
        let key = Self::hash_key(text, provider);
        let entries = self.entries.read().await;
        entries.get(&key).map(|e| e.embedding.clone())
    }

    /// Store an embedding, evicting the oldest entry at capacity.
    pub async fn put(&self, text: &str, provider: &str, embedding: Embedding) {
        let key = Self::hash_key(text, provider);
        let entry = CacheEntry {
            embedding,
            inserted_at: self.sequence.fetch_add(1, Ordering::Relaxed),
        };

        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, v)| v.inserted_at)
                .map(|(k, _)| *k)
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(key, entry);
        debug!("cached embedding (provider: {provider})");
    }

    /// Number of cached vectors.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no vectors.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all cached vectors.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
