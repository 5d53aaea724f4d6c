//! Error types for source extraction.

use std::path::PathBuf;

use thiserror::Error;

/// A source that exists but could not be read.
///
/// Absent sources are not errors; they are reported as
/// [`SourceOutcome::Missing`](crate::SourceOutcome::Missing).
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to inspect or open a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Failed DataFrame operation while tagging or stacking sources.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::CsvParse {
            path: PathBuf::from("data/raw/claims/claims_1.csv"),
            message: "unterminated quote".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse CSV data/raw/claims/claims_1.csv: unterminated quote"
        );
    }

    #[test]
    fn test_error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("source_db".into());
        let ingest_err: IngestError = polars_err.into();
        assert!(matches!(ingest_err, IngestError::DataFrame { .. }));
    }
}
