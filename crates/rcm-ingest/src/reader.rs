//! CSV file reading.
//!
//! Every column is read as text. Typing happens later against the declared
//! schema, so a stray value in a numeric column never fails a load.

use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// What reading a single source produced.
#[derive(Debug, Clone)]
pub enum SourceOutcome {
    Loaded(DataFrame),
    /// The file does not exist or has no content at all.
    Missing,
}

impl SourceOutcome {
    pub fn into_frame(self) -> Option<DataFrame> {
        match self {
            SourceOutcome::Loaded(df) => Some(df),
            SourceOutcome::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SourceOutcome::Missing)
    }
}

/// Reads a CSV file into a frame of string columns.
///
/// A header-only file loads as a frame with zero rows.
pub fn read_csv_source(path: &Path) -> Result<SourceOutcome> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "source file not found");
            return Ok(SourceOutcome::Missing);
        }
        Err(e) => {
            return Err(IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if metadata.len() == 0 {
        debug!(path = %path.display(), "source file is empty");
        return Ok(SourceOutcome::Missing);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "source file loaded"
    );
    Ok(SourceOutcome::Loaded(df))
}
