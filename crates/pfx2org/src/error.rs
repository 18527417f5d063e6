//! Error types for the pfx2org library
//!
//! Load-time failures and per-query validation failures are separate types:
//! a [`LoadError`] is fatal to service initialization and is never retried
//! internally, while an [`InvalidPrefixError`] rejects a single query before
//! it reaches the index. "No covering entry" is not an error at all; queries
//! report it as `Ok(None)`.

use std::path::PathBuf;
use thiserror::Error;

pub use pfx2org_ip_trie::InvalidPrefixError;

/// Fatal failure while loading the source table or side table.
///
/// Surfaced to the caller of service initialization; the service is unusable
/// after one of these. Retrying, if desired, belongs to the caller.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Source table file does not exist
    #[error("source table not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Parquet-level read failure
    #[error("failed to read source table: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow-level decode failure
    #[error("failed to decode source table: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Required column absent from the table schema
    #[error("source table missing required column {0:?}")]
    MissingColumn(String),

    /// A key column has a type the loader cannot treat as text
    #[error("column {column:?} has unsupported type {datatype} for a key column")]
    BadColumnType {
        /// Column name as it appears in the schema
        column: String,
        /// Arrow type of the column
        datatype: String,
    },

    /// Organization side table is not a JSON object of name to tags
    #[error("invalid organization side table: {0}")]
    SideTable(#[from] serde_json::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Main error type for pfx2org operations
#[derive(Error, Debug)]
pub enum Pfx2OrgError {
    /// Fatal initialization failure
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Query string is not a syntactically valid IP network or address
    #[error(transparent)]
    InvalidPrefix(#[from] InvalidPrefixError),
}

/// Result type alias for pfx2org operations
pub type Result<T> = std::result::Result<T, Pfx2OrgError>;
