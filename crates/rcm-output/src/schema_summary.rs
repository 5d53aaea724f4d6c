//! Column inventory of the declared output tables.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use rcm_model::{SemanticType, TableName};

use crate::error::SinkError;
use crate::sink::ensure_parent_dir;

pub const SCHEMA_SUMMARY_FILE: &str = "schema_summary.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaSummaryRow {
    pub table_name: TableName,
    pub column_name: &'static str,
    pub semantic_type: SemanticType,
}

pub fn schema_summary_rows(tables: &[TableName]) -> Vec<SchemaSummaryRow> {
    tables
        .iter()
        .flat_map(|&table| {
            table.schema().columns.iter().map(move |column| SchemaSummaryRow {
                table_name: table,
                column_name: column.name,
                semantic_type: column.semantic,
            })
        })
        .collect()
}

/// Write `schema_summary.csv` for `tables`. Returns the number of rows.
pub fn write_schema_summary(path: &Path, tables: &[TableName]) -> Result<usize, SinkError> {
    ensure_parent_dir(path)?;
    let csv_error = |source: csv::Error| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let rows = schema_summary_rows(tables);
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in &rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        operation: "flush",
        path: path.to_path_buf(),
        source,
    })?;
    info!(rows = rows.len(), path = %path.display(), "wrote schema summary");
    Ok(rows.len())
}
