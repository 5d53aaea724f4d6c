//! Source extraction for the revenue-cycle warehouse.
//!
//! Hospital exports, insurer claim files and the CPT reference are read as
//! all-text polars frames, tagged with their provenance and stacked per
//! logical table. No cleaning happens here.

pub mod discovery;
pub mod error;
pub mod extract;
pub mod frame;
pub mod reader;

pub use discovery::list_csv_files;
pub use error::{IngestError, Result};
pub use extract::{
    Extraction, HOSPITAL_TABLES, HospitalSource, MissingSource, SourceLayout, extract_sources,
};
pub use frame::{stack_frames, tag_constant};
pub use reader::{SourceOutcome, read_csv_source};
