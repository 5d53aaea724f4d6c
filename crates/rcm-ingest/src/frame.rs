//! Provenance tagging and stacking of source frames.

use polars::prelude::*;

use crate::error::Result;

/// Set `column` to `value` on every row, replacing any existing column.
pub fn tag_constant(df: &mut DataFrame, column: &str, value: &str) -> Result<()> {
    let values = vec![value.to_string(); df.height()];
    df.with_column(Series::new(column.into(), values))?;
    Ok(())
}

/// Stack frames vertically over the union of their columns.
///
/// Columns keep the order in which they are first seen. A frame lacking a
/// column contributes nulls for it. Returns `None` for an empty input.
pub fn stack_frames(frames: Vec<DataFrame>) -> Result<Option<DataFrame>> {
    let mut union: Vec<PlSmallStr> = Vec::new();
    for frame in &frames {
        for name in frame.get_column_names() {
            if !union.contains(name) {
                union.push(name.clone());
            }
        }
    }

    let mut stacked: Option<DataFrame> = None;
    for mut frame in frames {
        for name in &union {
            if frame.column(name.as_str()).is_err() {
                let height = frame.height();
                frame.with_column(Series::full_null(name.clone(), height, &DataType::String))?;
            }
        }
        let frame = frame.select(union.iter().cloned())?;
        match stacked.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&frame)?;
            }
            None => stacked = Some(frame),
        }
    }
    Ok(stacked)
}
