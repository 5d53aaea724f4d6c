//! Output error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while writing a table or the load manifest.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode load manifest")]
    Manifest {
        #[source]
        source: serde_json::Error,
    },

    #[error("table name `{0}` cannot be used as a file name")]
    InvalidTableName(String),
}

/// Failure while reading or saving run state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to {operation} state file {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// The temp file was written but could not replace the target.
    #[error("failed to replace {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    /// Suggestion for the operator, where one helps.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Corrupt { .. } => {
                Some("Restore the state directory from a backup, or remove it to rebuild history.")
            }
            Self::AtomicWriteFailed { .. } | Self::Io { .. } => {
                Some("Check free disk space and permissions on the state directory.")
            }
            Self::Serialization { .. } => None,
        }
    }
}
