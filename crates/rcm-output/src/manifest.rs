//! Per-run record of every table handed to a sink.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use rcm_model::{SemanticType, TableName};

use crate::sink::{Layer, LoadOptions};

pub const MANIFEST_FILE: &str = "load_manifest.json";

/// Suffix of the cleaned tables written to the silver layer.
pub const CLEANED_SUFFIX: &str = "_cleaned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestColumn {
    pub name: String,
    /// Declared type, when the table has a declared schema naming the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRecord {
    pub table: String,
    pub layer: Layer,
    pub path: PathBuf,
    pub rows: usize,
    #[serde(flatten)]
    pub options: LoadOptions,
    pub columns: Vec<ManifestColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_time: Option<NaiveDateTime>,
    pub loads: Vec<LoadRecord>,
}

impl LoadManifest {
    pub fn rows_written(&self) -> usize {
        self.loads.iter().map(|load| load.rows).sum()
    }
}

/// The declared table behind a sink table name.
///
/// Cleaned tables carry the name of their source table plus
/// [`CLEANED_SUFFIX`]; raw extracts and model tables use the logical name.
pub fn declared_table(name: &str) -> Option<TableName> {
    let base = name.strip_suffix(CLEANED_SUFFIX).unwrap_or(name);
    base.parse().ok()
}

/// Describe the columns of a loaded frame against the declared schema.
///
/// Raw extracts keep their source headers, so most of their columns have no
/// declared type.
pub fn describe_columns<'a, I>(name: &str, columns: I) -> Vec<ManifestColumn>
where
    I: IntoIterator<Item = &'a str>,
{
    let schema = declared_table(name).map(TableName::schema);
    columns
        .into_iter()
        .map(|column| ManifestColumn {
            name: column.to_string(),
            semantic_type: schema
                .and_then(|schema| schema.column(column))
                .map(|spec| spec.semantic),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_tables_map_to_their_source() {
        assert_eq!(declared_table("patients_cleaned"), Some(TableName::Patients));
        assert_eq!(declared_table("fact_claims"), Some(TableName::FactClaims));
        assert_eq!(declared_table("cptcodes"), Some(TableName::Procedures));
        assert_eq!(declared_table("kpi_report"), None);
    }

    #[test]
    fn undeclared_columns_have_no_type() {
        let columns = describe_columns("transactions_cleaned", ["amount", "PatientID"]);
        assert_eq!(columns[0].semantic_type, Some(SemanticType::Decimal));
        assert_eq!(columns[1].semantic_type, None);
    }
}
