//! Table sinks.
//!
//! A sink receives finished frames together with their load hints and owns
//! its destination. Nothing in the pipeline reads a table back from a sink.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use polars::prelude::{AnyValue, DataFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rcm_common::any_to_string;
use rcm_model::TableName;

use crate::error::SinkError;
use crate::manifest::{
    CLEANED_SUFFIX, LoadManifest, LoadRecord, MANIFEST_FILE, describe_columns,
};

/// Medallion layer a table is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Raw extracts.
    Bronze,
    /// Normalized `*_cleaned` tables.
    Silver,
    /// Dimensions and facts.
    Gold,
}

impl Layer {
    pub fn for_table(name: &str) -> Self {
        if name.ends_with(CLEANED_SUFFIX) {
            Layer::Silver
        } else if name.starts_with("dim_") || name.starts_with("fact_") {
            Layer::Gold
        } else {
            Layer::Bronze
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical layout hints for a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_column: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_columns: Vec<String>,
}

impl LoadOptions {
    pub fn for_table(table: TableName) -> Self {
        Self {
            partition_column: table.partition_column().map(String::from),
            cluster_columns: table
                .cluster_columns()
                .iter()
                .copied()
                .map(String::from)
                .collect(),
        }
    }
}

/// Destination for finished tables.
pub trait Sink {
    /// Write `frame` under `name`, replacing any previous contents.
    fn load_table(
        &mut self,
        name: &str,
        frame: &DataFrame,
        options: &LoadOptions,
    ) -> Result<LoadRecord, SinkError>;

    /// Flush whatever the sink keeps per run.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one CSV per table under `root/<layer>/` and a run manifest.
#[derive(Debug)]
pub struct CsvSink {
    root: PathBuf,
    manifest: LoadManifest,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest: LoadManifest::default(),
        }
    }

    pub fn with_build_time(mut self, build_time: NaiveDateTime) -> Self {
        self.manifest.build_time = Some(build_time);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &LoadManifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root
            .join(Layer::for_table(name).as_str())
            .join(format!("{name}.csv"))
    }
}

impl Sink for CsvSink {
    fn load_table(
        &mut self,
        name: &str,
        frame: &DataFrame,
        options: &LoadOptions,
    ) -> Result<LoadRecord, SinkError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(SinkError::InvalidTableName(name.to_string()));
        }
        let path = self.table_path(name);
        ensure_parent_dir(&path)?;
        write_csv(&path, frame)?;

        let record = LoadRecord {
            table: name.to_string(),
            layer: Layer::for_table(name),
            path,
            rows: frame.height(),
            options: options.clone(),
            columns: describe_columns(
                name,
                frame.get_column_names().iter().map(|column| column.as_str()),
            ),
        };
        debug!(
            table = name,
            layer = %record.layer,
            rows = record.rows,
            partition = record.options.partition_column.as_deref().unwrap_or(""),
            "loaded table"
        );
        self.manifest.loads.push(record.clone());
        Ok(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let path = self.manifest_path();
        ensure_parent_dir(&path)?;
        let json = serde_json::to_string_pretty(&self.manifest)
            .map_err(|source| SinkError::Manifest { source })?;
        fs::write(&path, json).map_err(|source| SinkError::Io {
            operation: "write",
            path: path.clone(),
            source,
        })?;
        info!(
            tables = self.manifest.loads.len(),
            rows = self.manifest.rows_written(),
            path = %path.display(),
            "wrote load manifest"
        );
        Ok(())
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SinkError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Write a frame as CSV, truncating any previous file. Nulls become empty
/// fields.
fn write_csv(path: &Path, frame: &DataFrame) -> Result<(), SinkError> {
    let csv_error = |source: csv::Error| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    let names: Vec<&str> = frame
        .get_column_names()
        .iter()
        .map(|column| column.as_str())
        .collect();
    writer.write_record(&names).map_err(csv_error)?;

    let columns = frame.get_columns();
    let mut record = Vec::with_capacity(columns.len());
    for row in 0..frame.height() {
        record.clear();
        for column in columns {
            record.push(any_to_string(column.get(row).unwrap_or(AnyValue::Null)));
        }
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        operation: "flush",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_route_to_layers() {
        assert_eq!(Layer::for_table("patients"), Layer::Bronze);
        assert_eq!(Layer::for_table("claims_cleaned"), Layer::Silver);
        assert_eq!(Layer::for_table("dim_patients_scd"), Layer::Gold);
        assert_eq!(Layer::for_table("fact_claims"), Layer::Gold);
    }

    #[test]
    fn facts_carry_partition_and_cluster_hints() {
        let options = LoadOptions::for_table(TableName::FactTransactions);
        assert_eq!(options.partition_column.as_deref(), Some("transaction_date"));
        assert_eq!(options.cluster_columns, vec!["unified_patient_id"]);
        assert_eq!(LoadOptions::for_table(TableName::DimDate), LoadOptions::default());
    }

    #[test]
    fn rejects_names_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        let frame = DataFrame::empty();
        let error = sink
            .load_table("../escape", &frame, &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(error, SinkError::InvalidTableName(_)));
    }
}
