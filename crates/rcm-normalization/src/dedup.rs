//! Row de-duplication applied after normalization.
//!
//! Patients are unique per unified key; provider exports are reduced to
//! distinct rows. The first occurrence wins in both cases.

use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::debug;

use rcm_common::{column_strings, column_value_string};
use rcm_core::{provenance_tag, resolve_unified_key};
use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::error::NormalizationError;

/// Drop patients whose unified key was already seen.
///
/// Rows without a usable identity are kept; the patient history stage reports
/// them.
pub fn dedupe_patients(
    df: &DataFrame,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame, NormalizationError> {
    let blank = || vec![String::new(); df.height()];
    let ids = column_strings(df, "patient_id").unwrap_or_else(blank);
    let dbs = column_strings(df, "source_db").unwrap_or_else(blank);
    let files = column_strings(df, "source_file").unwrap_or_else(blank);

    let mut seen = BTreeSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let key = resolve_unified_key(&ids[row], provenance_tag(&dbs[row], &files[row]));
        if key.is_unknown() || seen.insert(key.clone()) {
            keep.push(true);
            continue;
        }
        diagnostics.record(
            DataQualityIssue::new(
                Stage::Normalize,
                TableName::Patients,
                IssueKind::DuplicateIdentity,
                format!("`{key}` appears more than once, first occurrence kept"),
            )
            .at_row(row),
        );
        keep.push(false);
    }
    filter_rows(df, TableName::Patients, keep)
}

/// Drop provider rows identical to an earlier row in every column.
pub fn dedupe_exact_rows(
    df: &DataFrame,
    table: TableName,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame, NormalizationError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str().to_string())
        .collect();

    let mut seen = BTreeSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let signature: Vec<String> = names
            .iter()
            .map(|name| column_value_string(df, name, row))
            .collect();
        if seen.insert(signature) {
            keep.push(true);
        } else {
            diagnostics.record(
                DataQualityIssue::new(
                    Stage::Normalize,
                    table,
                    IssueKind::DuplicateBusinessKey,
                    "exact duplicate row dropped",
                )
                .at_row(row),
            );
            keep.push(false);
        }
    }
    filter_rows(df, table, keep)
}

fn filter_rows(
    df: &DataFrame,
    table: TableName,
    keep: Vec<bool>,
) -> Result<DataFrame, NormalizationError> {
    let dropped = keep.iter().filter(|kept| !**kept).count();
    if dropped == 0 {
        return Ok(df.clone());
    }
    debug!(%table, dropped, "dropped duplicate rows");
    let mask = BooleanChunked::new("keep".into(), keep);
    Ok(df.filter(&mask)?)
}
