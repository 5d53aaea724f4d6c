//! Normalization of raw revenue-cycle extracts.
//!
//! Raw hospital and claims exports disagree on header spelling, date format
//! and phone layout. This crate maps each extract onto the column contract
//! declared in `rcm_model`, producing the cleaned tables the dimensional model
//! is built from.
//!
//! # Example
//!
//! ```ignore
//! use rcm_normalization::{NormalizationContext, normalize_table};
//!
//! let context = NormalizationContext::new(build_date);
//! let cleaned = normalize_table(TableName::Patients, &raw, &context, &mut diagnostics)?;
//! ```
//!
//! Values that fail to parse are kept as found (dates) or coerced to zero
//! (measures), and recorded in the run's diagnostics.

mod dedup;
mod error;
mod executor;
mod inference;
mod types;

pub mod normalization;

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use rcm_model::{Diagnostics, TableName};

// Core types
pub use types::{NormalizationContext, NormalizationPipeline, NormalizationRule, NormalizationType};

// Error type
pub use error::NormalizationError;

// Pipeline building
pub use inference::infer_normalization_rules;

// Execution
pub use dedup::{dedupe_exact_rows, dedupe_patients};
pub use executor::execute_normalization;

/// Normalize one source table and apply its de-duplication rule.
pub fn normalize_table(
    table: TableName,
    raw: &DataFrame,
    context: &NormalizationContext,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame, NormalizationError> {
    let pipeline = infer_normalization_rules(table)?;
    let normalized = execute_normalization(raw, &pipeline, context, diagnostics)?;
    let cleaned = match table {
        TableName::Patients => dedupe_patients(&normalized, diagnostics)?,
        TableName::Providers => dedupe_exact_rows(&normalized, table, diagnostics)?,
        _ => normalized,
    };
    debug!(
        %table,
        rows_in = raw.height(),
        rows_out = cleaned.height(),
        columns = cleaned.width(),
        "normalized table"
    );
    Ok(cleaned)
}

/// Normalize every source table present in `raw`.
///
/// Output tables in the input map are skipped.
pub fn normalize_all(
    raw: &BTreeMap<TableName, DataFrame>,
    context: &NormalizationContext,
    diagnostics: &mut Diagnostics,
) -> Result<BTreeMap<TableName, DataFrame>, NormalizationError> {
    let mut cleaned = BTreeMap::new();
    for (&table, df) in raw.iter().filter(|(table, _)| table.is_input()) {
        let span = info_span!("normalize", %table);
        let _guard = span.enter();
        cleaned.insert(table, normalize_table(table, df, context, diagnostics)?);
    }
    Ok(cleaned)
}
