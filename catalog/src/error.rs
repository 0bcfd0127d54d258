//! Error types for catalog loading and normalization.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while loading a catalog snapshot.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The source is missing a column the engine cannot work without.
    #[error("catalog is missing required column: {0}")]
    MissingColumn(String),

    /// The source could not be parsed as a tabular catalog at all.
    #[error("malformed catalog: {0}")]
    Malformed(String),

    /// CSV parse error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
