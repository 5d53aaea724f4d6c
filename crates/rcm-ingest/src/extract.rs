//! Extraction of all raw sources into per-table frames.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::{info, warn};

use rcm_model::TableName;

use crate::discovery::{file_name, list_csv_files};
use crate::error::Result;
use crate::frame::{stack_frames, tag_constant};
use crate::reader::{SourceOutcome, read_csv_source};

/// Tables each hospital source exports, one CSV per table.
pub const HOSPITAL_TABLES: [TableName; 3] = [
    TableName::Patients,
    TableName::Providers,
    TableName::Transactions,
];

/// One hospital system exporting CSV files into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HospitalSource {
    /// Tag written to `source_db` on every extracted row.
    pub name: String,
    pub dir: PathBuf,
}

impl HospitalSource {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    pub fn table_path(&self, table: TableName) -> PathBuf {
        self.dir.join(format!("{}.csv", table.as_str()))
    }
}

/// Where the raw sources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub hospitals: Vec<HospitalSource>,
    /// Directory of insurer claim files; every CSV in it is loaded.
    pub claims_dir: PathBuf,
    /// CPT reference file loaded as `procedures`.
    pub cpt_file: PathBuf,
}

/// A source that had nothing to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSource {
    pub table: TableName,
    pub path: PathBuf,
}

/// Raw frames keyed by logical table, plus the sources that were absent.
#[derive(Debug, Default)]
pub struct Extraction {
    pub tables: BTreeMap<TableName, DataFrame>,
    pub missing: Vec<MissingSource>,
}

impl Extraction {
    pub fn table(&self, table: TableName) -> Option<&DataFrame> {
        self.tables.get(&table)
    }

    pub fn row_count(&self, table: TableName) -> usize {
        self.table(table).map_or(0, DataFrame::height)
    }

    fn note_missing(&mut self, table: TableName, path: &Path) {
        warn!(table = %table, path = %path.display(), "source not available");
        self.missing.push(MissingSource {
            table,
            path: path.to_path_buf(),
        });
    }
}

/// Load every configured source.
///
/// Absent files and directories are collected in [`Extraction::missing`];
/// a file that exists but fails to parse aborts the extraction.
pub fn extract_sources(layout: &SourceLayout) -> Result<Extraction> {
    let mut extraction = Extraction::default();
    let mut pending: BTreeMap<TableName, Vec<DataFrame>> = BTreeMap::new();

    for hospital in &layout.hospitals {
        for table in HOSPITAL_TABLES {
            let path = hospital.table_path(table);
            match read_csv_source(&path)? {
                SourceOutcome::Loaded(mut df) => {
                    tag_constant(&mut df, "source_db", &hospital.name)?;
                    info!(
                        source = %hospital.name,
                        table = %table,
                        rows = df.height(),
                        "extracted"
                    );
                    pending.entry(table).or_default().push(df);
                }
                SourceOutcome::Missing => extraction.note_missing(table, &path),
            }
        }
    }

    let claims = extract_claims(&layout.claims_dir, &mut extraction)?;
    if !claims.is_empty() {
        pending.insert(TableName::Claims, claims);
    }

    match read_csv_source(&layout.cpt_file)? {
        SourceOutcome::Loaded(df) => {
            info!(table = %TableName::Procedures, rows = df.height(), "extracted");
            pending.insert(TableName::Procedures, vec![df]);
        }
        SourceOutcome::Missing => extraction.note_missing(TableName::Procedures, &layout.cpt_file),
    }

    for (table, frames) in pending {
        if let Some(df) = stack_frames(frames)? {
            extraction.tables.insert(table, df);
        }
    }
    Ok(extraction)
}

fn extract_claims(dir: &Path, extraction: &mut Extraction) -> Result<Vec<DataFrame>> {
    let Some(files) = list_csv_files(dir)? else {
        extraction.note_missing(TableName::Claims, dir);
        return Ok(Vec::new());
    };
    let mut frames = Vec::with_capacity(files.len());
    for path in files {
        match read_csv_source(&path)? {
            SourceOutcome::Loaded(mut df) => {
                let name = file_name(&path);
                tag_constant(&mut df, "source_file", &name)?;
                info!(file = %name, rows = df.height(), "extracted claims");
                frames.push(df);
            }
            SourceOutcome::Missing => extraction.note_missing(TableName::Claims, &path),
        }
    }
    if frames.is_empty() {
        warn!(dir = %dir.display(), "no claim files loaded");
    }
    Ok(frames)
}
