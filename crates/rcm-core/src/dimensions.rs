//! Provider and procedure dimensions.
//!
//! These are rebuilt from scratch every run and keep no history. Rows are
//! emitted as they arrive; only the surrogate key is added.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::info;

use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::error::Result;
use crate::keys::{KeyNamespace, KeyRegistry};
use crate::reader::TableReader;
use crate::records::{ProcedureRow, ProviderRow};

pub fn build_provider_dimension(
    df: &DataFrame,
    registry: &mut KeyRegistry,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ProviderRow>> {
    let reader = TableReader::new(df, TableName::Providers, Stage::StaticDimension, diagnostics)?;
    let business_keys: Vec<String> = (0..reader.height())
        .map(|row| reader.text(row, "provider_id"))
        .collect();
    let keys = assign_keys(
        TableName::Providers,
        KeyNamespace::Providers,
        &business_keys,
        registry,
        diagnostics,
    );

    let rows: Vec<ProviderRow> = business_keys
        .into_iter()
        .enumerate()
        .map(|(row, provider_id)| ProviderRow {
            provider_key: keys.get(&provider_id).copied(),
            name: reader.text(row, "name"),
            specialty: reader.text(row, "specialty"),
            dept_id: reader.integer(row, "dept_id").unwrap_or(0),
            npi: reader.integer(row, "npi").unwrap_or(0),
            source_db: reader.text(row, "source_db"),
            provider_id,
        })
        .collect();
    info!(rows = rows.len(), distinct = keys.len(), "provider dimension built");
    Ok(rows)
}

pub fn build_procedure_dimension(
    df: &DataFrame,
    registry: &mut KeyRegistry,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ProcedureRow>> {
    let reader =
        TableReader::new(df, TableName::Procedures, Stage::StaticDimension, diagnostics)?;
    let business_keys: Vec<String> = (0..reader.height())
        .map(|row| reader.text(row, "procedure_code"))
        .collect();
    let keys = assign_keys(
        TableName::Procedures,
        KeyNamespace::Procedures,
        &business_keys,
        registry,
        diagnostics,
    );

    let rows: Vec<ProcedureRow> = business_keys
        .into_iter()
        .enumerate()
        .map(|(row, procedure_code)| ProcedureRow {
            procedure_key: keys.get(&procedure_code).copied(),
            description: reader.text(row, "description"),
            category: reader.text(row, "category"),
            procedure_code,
        })
        .collect();
    info!(rows = rows.len(), distinct = keys.len(), "procedure dimension built");
    Ok(rows)
}

/// Look up or issue a surrogate key for every distinct business key.
///
/// Blank keys and repeated keys are reported; repeated rows still share one
/// surrogate key and are all kept.
fn assign_keys(
    table: TableName,
    namespace: KeyNamespace,
    business_keys: &[String],
    registry: &mut KeyRegistry,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, i64> {
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for (row, key) in business_keys.iter().enumerate() {
        if key.is_empty() {
            diagnostics.record(
                DataQualityIssue::new(
                    Stage::StaticDimension,
                    table,
                    IssueKind::MissingIdentifier,
                    "row has no business key, left without a surrogate key",
                )
                .at_row(row),
            );
            continue;
        }
        *occurrences.entry(key.as_str()).or_insert(0) += 1;
    }
    for (key, count) in occurrences.iter().filter(|(_, count)| **count > 1) {
        diagnostics.record(DataQualityIssue::new(
            Stage::StaticDimension,
            table,
            IssueKind::DuplicateBusinessKey,
            format!("business key `{key}` appears on {count} rows"),
        ));
    }
    registry.assign(namespace, occurrences.keys().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_common::text_frame;

    fn frame(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
        text_frame(columns).unwrap()
    }

    #[test]
    fn providers_share_keys_per_business_key() {
        let df = frame(vec![
            ("provider_id", vec!["D2", "D1", "D2"]),
            ("name", vec!["Dr. Iyer", "Dr. Rao", "Dr. Iyer (b)"]),
            ("dept_id", vec!["10", "", "11"]),
        ]);
        let mut registry = KeyRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let rows = build_provider_dimension(&df, &mut registry, &mut diagnostics).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].provider_key, Some(2));
        assert_eq!(rows[1].provider_key, Some(1));
        assert_eq!(rows[2].provider_key, Some(2));
        assert_eq!(rows[2].name, "Dr. Iyer (b)");
        assert_eq!(rows[1].dept_id, 0);
        assert_eq!(diagnostics.count(IssueKind::DuplicateBusinessKey), 1);
    }

    #[test]
    fn blank_business_keys_stay_unkeyed() {
        let df = frame(vec![
            ("procedure_code", vec!["99213", ""]),
            ("description", vec!["Office visit", "Orphan"]),
        ]);
        let mut registry = KeyRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let rows = build_procedure_dimension(&df, &mut registry, &mut diagnostics).unwrap();

        assert_eq!(rows[0].procedure_key, Some(1));
        assert_eq!(rows[1].procedure_key, None);
        assert_eq!(diagnostics.count(IssueKind::MissingIdentifier), 1);
    }

    #[test]
    fn rebuild_reuses_registry_keys() {
        let mut registry = KeyRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let first = frame(vec![("procedure_code", vec!["99214", "99213"])]);
        build_procedure_dimension(&first, &mut registry, &mut diagnostics).unwrap();

        let second = frame(vec![("procedure_code", vec!["10060", "99214"])]);
        let rows = build_procedure_dimension(&second, &mut registry, &mut diagnostics).unwrap();
        assert_eq!(rows[0].procedure_key, Some(3));
        assert_eq!(rows[1].procedure_key, Some(2));
    }

    #[test]
    fn table_without_business_key_column_is_fatal() {
        let df = frame(vec![("description", vec!["Office visit"])]);
        let mut registry = KeyRegistry::new();
        let mut diagnostics = Diagnostics::new();
        assert!(build_procedure_dimension(&df, &mut registry, &mut diagnostics).is_err());
    }
}
