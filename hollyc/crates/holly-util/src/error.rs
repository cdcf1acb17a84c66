//! Core error types for holly-util.

use thiserror::Error;

/// Error type for hash table operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// The table reached the last prime in the growth schedule and
    /// refuses further insertions.
    #[error("table is full: growth schedule exhausted at {size} slots")]
    Full { size: usize },
}

/// Result type alias for table operations.
pub type TableResult<T> = std::result::Result<T, TableError>;
