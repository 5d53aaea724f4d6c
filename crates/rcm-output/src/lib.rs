//! Output side of the revenue-cycle warehouse.
//!
//! - [`Sink`] and the filesystem [`CsvSink`], which routes tables to the
//!   bronze, silver and gold layers and records a load manifest per run
//! - [`write_schema_summary`] for the declared output tables
//! - [`StateStore`] for the patient snapshot and key registry carried
//!   between runs

pub mod error;
pub mod manifest;
pub mod schema_summary;
pub mod sink;
pub mod state;

pub use error::{SinkError, StateError};
pub use manifest::{CLEANED_SUFFIX, LoadManifest, LoadRecord, ManifestColumn, declared_table};
pub use schema_summary::{
    SCHEMA_SUMMARY_FILE, SchemaSummaryRow, schema_summary_rows, write_schema_summary,
};
pub use sink::{CsvSink, Layer, LoadOptions, Sink};
pub use state::{PriorState, StateStore};
