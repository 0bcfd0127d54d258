//! # Catalog
//!
//! This crate owns the normalized product catalog for the Shopsense
//! recommendation engine.
//!
//! ## Features
//!
//! - **Loading**: Parse a raw tabular (CSV) catalog into typed records
//! - **Normalization**: Repair noisy prices, delimiter-joined lists, and
//!   missing columns instead of rejecting rows
//! - **Featurization**: Deterministic text blobs used as embedding input
//! - **Analytics**: Aggregate statistics over the normalized snapshot
//!
//! ## Architecture
//!
//! ```text
//! raw CSV ──► CatalogLoader ──► Catalog (immutable snapshot)
//!                                   │
//!                 ┌─────────────────┼──────────────────┐
//!                 ▼                 ▼                  ▼
//!           feature_text      summarize          (vector index,
//!           per item          analytics           built elsewhere)
//! ```
//!
//! A [`Catalog`] is an immutable snapshot: downstream components hold
//! read-only views keyed by item id and a new catalog replaces the old
//! one wholesale.

pub mod analytics;
pub mod error;
pub mod featurize;
pub mod item;
pub mod loader;

pub use analytics::{AnalyticsSummary, FrequencyEntry, summarize};
pub use error::{CatalogError, Result};
pub use featurize::feature_text;
pub use item::{Catalog, CatalogItem};
pub use loader::CatalogLoader;
