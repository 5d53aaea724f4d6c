//! Warehouse build with explicit stages.
//!
//! 1. **Extract**: read hospital exports, claim files and the CPT reference
//! 2. **Bronze**: land the raw extracts
//! 3. **Normalize**: map extracts onto the column contract, land `*_cleaned`
//! 4. **Model**: patient history, dimensions, facts
//! 5. **Gold**: land the star schema, the schema summary and the manifest
//! 6. **State**: persist the patient snapshot and key registry
//!
//! State is written last, so a failed run leaves the previous state intact.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use rcm_core::{ModelInputs, ModelRun, build_dimensional_model, compute_kpis};
use rcm_ingest::{Extraction, SourceLayout, extract_sources};
use rcm_model::{Diagnostics, TableName};
use rcm_normalization::{NormalizationContext, normalize_all};
use rcm_output::{
    CLEANED_SUFFIX, CsvSink, Layer, LoadOptions, LoadRecord, PriorState, SCHEMA_SUMMARY_FILE, Sink,
    StateStore, write_schema_summary,
};

use crate::types::RunResult;

/// Resolved inputs of one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: SourceLayout,
    pub output_dir: PathBuf,
    pub state_dir: PathBuf,
    pub build_time: NaiveDateTime,
}

// ============================================================================
// Stage 1: Extract
// ============================================================================

pub fn extract(layout: &SourceLayout) -> Result<Extraction> {
    let extraction = extract_sources(layout).context("extract sources")?;
    info!(
        tables = extraction.tables.len(),
        missing = extraction.missing.len(),
        "extraction complete"
    );
    Ok(extraction)
}

// ============================================================================
// Stages 2, 3 and 5: landing tables
// ============================================================================

/// Load every table in `tables` through `sink`, named `<table><suffix>`.
///
/// Declared output tables carry their partition and cluster hints.
pub fn load_tables<S: Sink>(
    sink: &mut S,
    tables: &BTreeMap<TableName, DataFrame>,
    suffix: &str,
) -> Result<Vec<LoadRecord>> {
    let mut records = Vec::with_capacity(tables.len());
    for (&table, frame) in tables {
        let name = format!("{table}{suffix}");
        let options = if table.is_input() {
            LoadOptions::default()
        } else {
            LoadOptions::for_table(table)
        };
        let record = sink
            .load_table(&name, frame, &options)
            .with_context(|| format!("load {name}"))?;
        records.push(record);
    }
    Ok(records)
}

// ============================================================================
// Stage 3: Normalize
// ============================================================================

pub fn normalize(
    raw: &BTreeMap<TableName, DataFrame>,
    build_time: NaiveDateTime,
    diagnostics: &mut Diagnostics,
) -> Result<BTreeMap<TableName, DataFrame>> {
    let context = NormalizationContext::new(build_time.date());
    normalize_all(raw, &context, diagnostics).context("normalize extracts")
}

// ============================================================================
// Stage 4: Model
// ============================================================================

pub fn build_model(
    cleaned: BTreeMap<TableName, DataFrame>,
    prior: &PriorState,
    build_time: NaiveDateTime,
) -> Result<ModelRun> {
    let inputs: ModelInputs = cleaned.into_iter().collect();
    let run = build_dimensional_model(&inputs, &prior.snapshot, &prior.registry, build_time)
        .context("build dimensional model")?;
    info!(
        patient_versions = run.model.patients.len(),
        new_members = run.history.new_members,
        new_versions = run.history.new_versions,
        transactions = run.model.transactions.len(),
        claims = run.model.claims.len(),
        "model built"
    );
    Ok(run)
}

// ============================================================================
// Full run
// ============================================================================

pub fn run_pipeline(config: &PipelineConfig) -> Result<RunResult> {
    let start = Instant::now();
    let build_time = config.build_time;
    let span = info_span!("run", %build_time);
    let _guard = span.enter();

    let state = StateStore::new(&config.state_dir);
    let prior = state.load().context("load run state")?;
    let mut sink = CsvSink::new(&config.output_dir).with_build_time(build_time);
    let mut diagnostics = Diagnostics::new();
    let mut loads = Vec::new();

    let extraction = info_span!("extract").in_scope(|| extract(&config.layout))?;

    info_span!("bronze").in_scope(|| -> Result<()> {
        loads.extend(load_tables(&mut sink, &extraction.tables, "")?);
        Ok(())
    })?;

    let cleaned = info_span!("normalize").in_scope(|| -> Result<_> {
        let cleaned = normalize(&extraction.tables, build_time, &mut diagnostics)?;
        loads.extend(load_tables(&mut sink, &cleaned, CLEANED_SUFFIX)?);
        Ok(cleaned)
    })?;

    let run = info_span!("model").in_scope(|| build_model(cleaned, &prior, build_time))?;

    let schema_summary = info_span!("gold").in_scope(|| -> Result<_> {
        let frames = run.model.to_frames().context("assemble star schema")?;
        loads.extend(load_tables(&mut sink, &frames, "")?);
        let path = config
            .output_dir
            .join(Layer::Gold.as_str())
            .join(SCHEMA_SUMMARY_FILE);
        write_schema_summary(&path, &TableName::OUTPUTS)
            .with_context(|| format!("write {}", path.display()))?;
        sink.finish().context("write load manifest")?;
        Ok(path)
    })?;

    info_span!("state").in_scope(|| {
        state
            .save(&run.model.patients, &run.registry)
            .context("save run state")
    })?;

    let kpis = compute_kpis(&run.model);
    diagnostics.extend(run.diagnostics);
    diagnostics.log_summary();
    info!(
        tables = loads.len(),
        issues = diagnostics.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "run complete"
    );

    Ok(RunResult {
        build_time,
        output_dir: config.output_dir.clone(),
        manifest: sink.manifest_path(),
        schema_summary,
        loads,
        missing_sources: extraction.missing,
        history: run.history,
        kpis,
        diagnostics,
    })
}
