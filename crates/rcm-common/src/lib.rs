//! Shared utilities for the revenue-cycle warehouse crates.
//!
//! Polars `AnyValue` conversions and DataFrame cell access used by the
//! extractor, the normalizer and the dimensional model.

pub mod frame;
pub mod values;

pub use frame::{column_strings, column_value_string, has_column, string_frame, text_frame};
pub use values::{
    any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric, parse_f64,
    parse_i64,
};
