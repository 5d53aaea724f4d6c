//! DataFrame cell access.

use polars::prelude::{AnyValue, Column, DataFrame, IntoColumn, NamedFrom, PolarsResult, Series};

use crate::values::any_to_string;

/// Returns true when the frame has a column with this exact name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Get a string value from a DataFrame column at the given row index.
///
/// Missing columns and out-of-range rows read as empty strings.
pub fn column_value_string(df: &DataFrame, name: &str, idx: usize) -> String {
    match df.column(name) {
        Ok(column) => any_to_string(column.get(idx).unwrap_or(AnyValue::Null)),
        Err(_) => String::new(),
    }
}

/// Extract all trimmed string values from a DataFrame column.
///
/// Returns `None` when the column does not exist, which callers use to tell a
/// missing column apart from a column of blanks.
pub fn column_strings(df: &DataFrame, name: &str) -> Option<Vec<String>> {
    let column = df.column(name).ok()?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = any_to_string(column.get(idx).unwrap_or(AnyValue::Null));
        values.push(value.trim().to_string());
    }
    Some(values)
}

/// Build a frame of text columns, in the order given.
pub fn string_frame(columns: Vec<(String, Vec<String>)>) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| Series::new(name.as_str().into(), values).into_column())
        .collect();
    DataFrame::new(columns)
}

/// Build a text frame from borrowed literals. Mostly used by tests.
pub fn text_frame(columns: Vec<(&str, Vec<&str>)>) -> PolarsResult<DataFrame> {
    string_frame(
        columns
            .into_iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.into_iter().map(String::from).collect(),
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        string_frame(vec![
            ("patient_id".to_string(), vec![" P1 ".to_string(), "P2".to_string()]),
            ("phone".to_string(), vec!["555".to_string(), String::new()]),
        ])
        .unwrap()
    }

    #[test]
    fn reads_cells_by_name() {
        let df = frame();
        assert_eq!(column_value_string(&df, "phone", 0), "555");
        assert_eq!(column_value_string(&df, "phone", 5), "");
        assert_eq!(column_value_string(&df, "missing", 0), "");
    }

    #[test]
    fn column_strings_trims_and_reports_missing() {
        let df = frame();
        assert_eq!(
            column_strings(&df, "patient_id"),
            Some(vec!["P1".to_string(), "P2".to_string()])
        );
        assert!(column_strings(&df, "gender").is_none());
        assert!(has_column(&df, "phone"));
        assert!(!has_column(&df, "gender"));
    }
}
