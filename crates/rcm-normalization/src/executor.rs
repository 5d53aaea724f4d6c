//! DataFrame normalization execution.
//!
//! Executes a pipeline on a raw extract to produce a frame in the declared
//! column contract. Target columns with no source are left out; the model
//! backfills and reports them.

use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::debug;

use rcm_common::{column_strings, parse_i64};
use rcm_core::calendar::parse_calendar_date;
use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::error::NormalizationError;
use crate::normalization::{
    Normalized, age_at, canonical_header, normalize_date, normalize_decimal, normalize_gender,
    normalize_phone,
};
use crate::types::{
    NormalizationContext, NormalizationPipeline, NormalizationRule, NormalizationType,
};

/// Raw columns indexed by canonical header. The first spelling wins.
struct SourceColumns<'a> {
    df: &'a DataFrame,
    by_canonical: BTreeMap<String, String>,
}

impl<'a> SourceColumns<'a> {
    fn new(df: &'a DataFrame) -> Self {
        let mut by_canonical = BTreeMap::new();
        for name in df.get_column_names() {
            by_canonical
                .entry(canonical_header(name.as_str()))
                .or_insert_with(|| name.to_string());
        }
        Self { df, by_canonical }
    }

    fn resolve(&self, rule: &NormalizationRule) -> Option<&str> {
        rule.source_aliases
            .iter()
            .find_map(|alias| self.by_canonical.get(alias))
            .map(String::as_str)
    }

    fn values(&self, rule: &NormalizationRule) -> Option<Vec<String>> {
        self.resolve(rule)
            .and_then(|source| column_strings(self.df, source))
    }
}

/// Execute a normalization pipeline on a raw frame.
///
/// Returns a new DataFrame holding the pipeline's target columns that have a
/// source, in pipeline order.
pub fn execute_normalization(
    source_df: &DataFrame,
    pipeline: &NormalizationPipeline,
    context: &NormalizationContext,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame, NormalizationError> {
    let sources = SourceColumns::new(source_df);
    let mut columns: Vec<Column> = Vec::with_capacity(pipeline.rules.len());

    for rule in &pipeline.rules {
        let target = rule.target_column;
        let series = match rule.transform_type {
            NormalizationType::AgeFromDob => {
                let dob = pipeline.rule("dob").and_then(|dob| sources.values(dob));
                let raw = sources.values(rule);
                if dob.is_none() && raw.is_none() {
                    None
                } else {
                    Some(execute_age(
                        target,
                        dob,
                        raw,
                        source_df.height(),
                        context,
                    ))
                }
            }
            transform => sources.values(rule).map(|values| {
                execute_rule(target, transform, &values, pipeline.table, diagnostics)
            }),
        };
        match series {
            Some(series) => columns.push(series.into_column()),
            None => debug!(table = %pipeline.table, column = target, "no source column"),
        }
    }

    Ok(DataFrame::new(columns)?)
}

fn execute_rule(
    target: &str,
    transform: NormalizationType,
    values: &[String],
    table: TableName,
    diagnostics: &mut Diagnostics,
) -> Series {
    match transform {
        NormalizationType::CopyDirect | NormalizationType::AgeFromDob => {
            Series::new(target.into(), values)
        }
        NormalizationType::Gender => {
            let genders: Vec<&str> = values.iter().map(|v| normalize_gender(v)).collect();
            Series::new(target.into(), genders)
        }
        NormalizationType::Phone => {
            let phones: Vec<String> = values.iter().map(|v| normalize_phone(v)).collect();
            Series::new(target.into(), phones)
        }
        NormalizationType::IsoDate => execute_date(target, values),
        NormalizationType::Decimal => execute_decimal(target, values, table, diagnostics),
    }
}

fn execute_date(target: &str, values: &[String]) -> Series {
    let dates: Vec<Option<String>> = values
        .iter()
        .map(|value| match normalize_date(value) {
            Normalized::Value(iso) => Some(iso),
            Normalized::Blank => None,
            Normalized::Invalid(original) => Some(original),
        })
        .collect();
    Series::new(target.into(), dates)
}

fn execute_decimal(
    target: &str,
    values: &[String],
    table: TableName,
    diagnostics: &mut Diagnostics,
) -> Series {
    let mut numbers = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        let number = match normalize_decimal(value) {
            Normalized::Value(number) => number,
            Normalized::Blank => 0.0,
            Normalized::Invalid(original) => {
                diagnostics.record(
                    DataQualityIssue::new(
                        Stage::Normalize,
                        table,
                        IssueKind::UnparseableNumber,
                        format!("`{original}` is not a number, coerced to 0"),
                    )
                    .at_row(row)
                    .in_column(target),
                );
                0.0
            }
        };
        numbers.push(number);
    }
    Series::new(target.into(), numbers)
}

/// Age from the birth date where it parses, else from the raw age column.
fn execute_age(
    target: &str,
    dob: Option<Vec<String>>,
    raw: Option<Vec<String>>,
    row_count: usize,
    context: &NormalizationContext,
) -> Series {
    let ages: Vec<Option<i64>> = (0..row_count)
        .map(|row| {
            let derived = dob
                .as_ref()
                .and_then(|values| parse_calendar_date(&values[row]))
                .and_then(|date| age_at(date, context.as_of));
            derived.or_else(|| raw.as_ref().and_then(|values| parse_i64(&values[row])))
        })
        .collect();
    Series::new(target.into(), ages)
}
