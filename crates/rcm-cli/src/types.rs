use std::path::PathBuf;

use chrono::NaiveDateTime;

use rcm_core::{HistoryStats, RevenueKpis};
use rcm_ingest::MissingSource;
use rcm_model::Diagnostics;
use rcm_output::LoadRecord;

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunResult {
    pub build_time: NaiveDateTime,
    pub output_dir: PathBuf,
    pub manifest: PathBuf,
    pub schema_summary: PathBuf,
    pub loads: Vec<LoadRecord>,
    pub missing_sources: Vec<MissingSource>,
    pub history: HistoryStats,
    pub kpis: RevenueKpis,
    /// Issues from normalization and the model build.
    pub diagnostics: Diagnostics,
}
