//! Shared vocabulary of the revenue-cycle warehouse: logical table names,
//! declared column contracts and data-quality diagnostics.

pub mod diagnostics;
pub mod schema;
pub mod table;

pub use diagnostics::{DataQualityIssue, Diagnostics, IssueKind, Stage};
pub use schema::{Backfill, ColumnRole, ColumnSpec, SemanticType, TableSchema, schema_for};
pub use table::{TableName, UnknownTable};
