//! # Recommendation Engine
//!
//! This crate wires the Shopsense core together:
//!
//! - **Catalog**: normalized snapshot loading and analytics
//! - **Embeddings**: vector index, similarity search, clustering
//! - **Generation**: short per-result description blurbs with fallback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Recommend Engine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Catalog    │  │  Embeddings  │  │ Description  │           │
//! │  │   Snapshot   │  │    Index     │  │  Generator   │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │            recommend / summarize / cluster                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine holds one immutable `(snapshot, index)` pair behind an
//! atomically swappable handle: queries always see a self-consistent
//! pair, and a rebuild replaces it as a unit or not at all.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopsense_embeddings::HashingProvider;
//! use shopsense_engine::RecommendEngine;
//!
//! let engine = RecommendEngine::builder()
//!     .with_provider(Arc::new(HashingProvider::new()))
//!     .build()?;
//! engine.rebuild_from_path("data/products.csv").await?;
//!
//! let results = engine.recommend("wooden dining chair", 5).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod generate;

pub use config::EngineConfig;
pub use engine::{EngineStats, Recommendation, RecommendEngine};
pub use error::{EngineError, Result};
pub use generate::{DescriptionGenerator, OpenAiGenerator};

// Re-export from dependencies for convenience
pub use shopsense_catalog::{AnalyticsSummary, Catalog, CatalogItem, CatalogLoader};
pub use shopsense_embeddings::{ClusterAssignment, EmbeddingProvider, VectorIndex};
