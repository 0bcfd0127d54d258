//! # Embeddings
//!
//! This crate provides embedding generation, exact similarity search,
//! and unsupervised clustering for the Shopsense recommendation engine.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors via a
//!   pluggable provider (OpenAI-compatible API or deterministic local
//!   feature hashing)
//! - **Similarity Search**: Exact brute-force top-k retrieval over an
//!   immutable, build-once vector index
//! - **Clustering**: Seeded k-means over the same vector space
//! - **Caching**: Reuse of computed embeddings across index rebuilds
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Embeddings System                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndex ──► top-k      │
//! │       │                    │              │                     │
//! │       ▼                    ▼              ▼                     │
//! │  OpenAI/Hashing      EmbeddingCache    k-means                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod cluster;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::EmbeddingCache;
pub use cluster::{ClusterAssignment, KMeansParams, kmeans};
pub use error::{EmbeddingError, Result};
pub use index::{SearchHit, VectorIndex};
pub use provider::{EmbeddingProvider, HashingProvider, OpenAiProvider};
pub use similarity::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
