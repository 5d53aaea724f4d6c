//! Conformed date dimension.
//!
//! Covers exactly the calendar dates observed in the fact sources, so every
//! fact with a parseable date resolves to a `date_key`.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use polars::prelude::DataFrame;
use tracing::info;

use rcm_common::column_strings;
use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::calendar::{date_key, day_of_week, parse_calendar_date, quarter};
use crate::records::DateRow;

/// Parse every value of a fact date column, dropping the ones that fail.
///
/// A missing column contributes no dates.
pub fn collect_fact_dates(
    df: &DataFrame,
    table: TableName,
    column: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<NaiveDate> {
    let Some(values) = column_strings(df, column) else {
        return Vec::new();
    };
    let mut dates = Vec::with_capacity(values.len());
    for (row, raw) in values.iter().enumerate() {
        match parse_calendar_date(raw) {
            Some(date) => dates.push(date),
            None => {
                let detail = if raw.is_empty() {
                    "empty date dropped from the date dimension".to_string()
                } else {
                    format!("`{raw}` is not a date, dropped from the date dimension")
                };
                diagnostics.record(
                    DataQualityIssue::new(
                        Stage::DateDimension,
                        table,
                        IssueKind::UnparseableDate,
                        detail,
                    )
                    .at_row(row)
                    .in_column(column),
                );
            }
        }
    }
    dates
}

pub fn date_row(date: NaiveDate) -> DateRow {
    DateRow {
        date_key: date_key(date),
        date,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        quarter: quarter(date),
        day_of_week: day_of_week(date),
    }
}

/// One row per distinct date, in ascending order.
pub fn build_date_dimension<I>(dates: I) -> Vec<DateRow>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let rows: Vec<DateRow> = distinct.into_iter().map(date_row).collect();
    info!(rows = rows.len(), "date dimension built");
    rows
}

/// Date dimension over transaction and claim dates.
pub fn build_date_dimension_from_facts(
    transactions: &DataFrame,
    claims: &DataFrame,
    diagnostics: &mut Diagnostics,
) -> Vec<DateRow> {
    let mut dates = collect_fact_dates(
        transactions,
        TableName::Transactions,
        "transaction_date",
        diagnostics,
    );
    dates.extend(collect_fact_dates(
        claims,
        TableName::Claims,
        "claim_date",
        diagnostics,
    ));
    build_date_dimension(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_common::text_frame;

    #[test]
    fn union_of_fact_dates_without_duplicates() {
        let transactions = text_frame(vec![(
            "transaction_date",
            vec!["2024-03-05", "2024-03-05 10:00:00", "garbage", ""],
        )])
        .unwrap();
        let claims = text_frame(vec![("claim_date", vec!["03/07/2024", "2024-03-05"])]).unwrap();
        let mut diagnostics = Diagnostics::new();

        let rows = build_date_dimension_from_facts(&transactions, &claims, &mut diagnostics);

        let keys: Vec<i64> = rows.iter().map(|r| r.date_key).collect();
        assert_eq!(keys, vec![20240305, 20240307]);
        assert_eq!(diagnostics.count(IssueKind::UnparseableDate), 2);
    }

    #[test]
    fn rows_carry_calendar_attributes() {
        let row = date_row(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(row.date_key, 20240305);
        assert_eq!((row.year, row.month, row.day), (2024, 3, 5));
        assert_eq!(row.quarter, 1);
        // Tuesday
        assert_eq!(row.day_of_week, 1);
    }

    #[test]
    fn missing_date_column_contributes_nothing() {
        let claims = text_frame(vec![("claim_id", vec!["C1"])]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let dates = collect_fact_dates(&claims, TableName::Claims, "claim_date", &mut diagnostics);
        assert!(dates.is_empty());
        assert!(diagnostics.is_empty());
    }
}
