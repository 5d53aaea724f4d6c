//! Schema-aware access to normalized frames.
//!
//! Sources occasionally drop or add columns. A [`TableReader`] checks a frame
//! against the declared schema once: a missing business key is fatal, any
//! other missing column is reported and then reads as its backfill default.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use rcm_common::{column_value_string, has_column, parse_f64, parse_i64};
use rcm_model::{
    Backfill, DataQualityIssue, Diagnostics, IssueKind, Stage, TableName, TableSchema,
};

use crate::calendar::parse_calendar_date;
use crate::error::{ModelError, Result};

pub struct TableReader<'a> {
    df: &'a DataFrame,
    table: TableName,
    schema: &'static TableSchema,
    stage: Stage,
    present: BTreeSet<&'static str>,
}

impl<'a> TableReader<'a> {
    pub fn new(
        df: &'a DataFrame,
        table: TableName,
        stage: Stage,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let schema = table.schema();
        let mut present = BTreeSet::new();
        for column in schema.columns {
            if has_column(df, column.name) {
                present.insert(column.name);
            } else if column.is_required() {
                return Err(ModelError::MissingBusinessKey {
                    stage,
                    table,
                    column: column.name,
                });
            } else {
                diagnostics.record(
                    DataQualityIssue::new(
                        stage,
                        table,
                        IssueKind::MissingColumn,
                        format!(
                            "column `{}` missing, backfilled as {}",
                            column.name, column.semantic
                        ),
                    )
                    .in_column(column.name),
                );
            }
        }
        Ok(Self {
            df,
            table,
            schema,
            stage,
            present,
        })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn table(&self) -> TableName {
        self.table
    }

    pub fn is_present(&self, column: &str) -> bool {
        self.present.contains(column)
    }

    /// Trimmed text. Missing columns read as the empty string.
    pub fn text(&self, row: usize, column: &str) -> String {
        if !self.is_present(column) {
            return String::new();
        }
        column_value_string(self.df, column, row).trim().to_string()
    }

    /// Whole number. A missing column reads as its backfill (zero); a blank
    /// or unparseable cell reads as `None`.
    pub fn integer(&self, row: usize, column: &str) -> Option<i64> {
        if !self.is_present(column) {
            return self.zero_backfill(column).then_some(0);
        }
        parse_i64(&column_value_string(self.df, column, row))
    }

    /// Monetary or other decimal measure. Blank cells and missing columns read
    /// as zero; unparseable text reads as zero and is reported.
    pub fn decimal(&self, row: usize, column: &str, diagnostics: &mut Diagnostics) -> f64 {
        if !self.is_present(column) {
            return 0.0;
        }
        let raw = column_value_string(self.df, column, row);
        if raw.trim().is_empty() {
            return 0.0;
        }
        match parse_f64(&raw) {
            Some(value) => value,
            None => {
                diagnostics.record(
                    DataQualityIssue::new(
                        self.stage,
                        self.table,
                        IssueKind::UnparseableNumber,
                        format!("`{}` is not a number, read as 0", raw.trim()),
                    )
                    .at_row(row)
                    .in_column(column),
                );
                0.0
            }
        }
    }

    /// Calendar date. Missing columns and unparseable values read as `None`.
    pub fn date(&self, row: usize, column: &str) -> Option<NaiveDate> {
        if !self.is_present(column) {
            return None;
        }
        parse_calendar_date(&column_value_string(self.df, column, row))
    }

    fn zero_backfill(&self, column: &str) -> bool {
        self.schema
            .column(column)
            .is_some_and(|spec| spec.semantic.backfill() == Backfill::Zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_common::text_frame;

    fn frame(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
        text_frame(columns).unwrap()
    }

    #[test]
    fn missing_business_key_is_fatal() {
        let df = frame(vec![("name", vec!["Dr. Rao"])]);
        let mut diagnostics = Diagnostics::new();
        let err = TableReader::new(
            &df,
            TableName::Providers,
            Stage::StaticDimension,
            &mut diagnostics,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ModelError::MissingBusinessKey {
                column: "provider_id",
                ..
            }
        ));
    }

    #[test]
    fn missing_columns_backfill_by_semantic_type() {
        let df = frame(vec![("provider_id", vec!["D1"]), ("name", vec!["Dr. Rao"])]);
        let mut diagnostics = Diagnostics::new();
        let reader = TableReader::new(
            &df,
            TableName::Providers,
            Stage::StaticDimension,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(reader.text(0, "specialty"), "");
        assert_eq!(reader.integer(0, "dept_id"), Some(0));
        assert_eq!(reader.text(0, "name"), "Dr. Rao");
        // specialty, dept_id, npi and source_db were absent.
        assert_eq!(diagnostics.count(IssueKind::MissingColumn), 4);
    }

    #[test]
    fn unparseable_measures_read_as_zero_and_are_reported() {
        let df = frame(vec![
            ("transaction_id", vec!["T1", "T2"]),
            ("amount", vec!["$1,200.50", "twelve"]),
            ("transaction_date", vec!["2024-03-05", "someday"]),
        ]);
        let mut diagnostics = Diagnostics::new();
        let reader = TableReader::new(
            &df,
            TableName::Transactions,
            Stage::FactResolution,
            &mut diagnostics,
        )
        .unwrap();
        let before = diagnostics.len();

        assert_eq!(reader.decimal(0, "amount", &mut diagnostics), 1200.5);
        assert_eq!(reader.decimal(1, "amount", &mut diagnostics), 0.0);
        assert_eq!(reader.decimal(0, "paid_amount", &mut diagnostics), 0.0);
        assert_eq!(diagnostics.len() - before, 1);
        assert!(reader.date(0, "transaction_date").is_some());
        assert!(reader.date(1, "transaction_date").is_none());
    }
}
