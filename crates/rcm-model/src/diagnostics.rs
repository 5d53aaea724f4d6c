//! Structured data-quality warnings.
//!
//! Upstream defects (missing identifiers, unparseable dates, duplicates,
//! unresolved references) never abort a run. Each one is recorded here so the
//! operator can see what the pipeline recovered from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::table::TableName;

/// Pipeline stage that observed an issue or raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Normalize,
    PatientHistory,
    StaticDimension,
    DateDimension,
    FactResolution,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::PatientHistory => "patient history",
            Stage::StaticDimension => "static dimension",
            Stage::DateDimension => "date dimension",
            Stage::FactResolution => "fact resolution",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A declared column was absent and has been backfilled.
    MissingColumn,
    /// A row lacks the identifier or provenance needed for its identity.
    MissingIdentifier,
    /// Two incoming rows resolved to the same unified key.
    DuplicateIdentity,
    /// A business key appears on more than one dimension row.
    DuplicateBusinessKey,
    UnparseableDate,
    UnparseableNumber,
    /// A fact references a dimension member that does not exist.
    UnresolvedReference,
    /// A key matched several current dimension rows.
    AmbiguousMatch,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::MissingColumn => "missing column",
            IssueKind::MissingIdentifier => "missing identifier",
            IssueKind::DuplicateIdentity => "duplicate identity",
            IssueKind::DuplicateBusinessKey => "duplicate business key",
            IssueKind::UnparseableDate => "unparseable date",
            IssueKind::UnparseableNumber => "unparseable number",
            IssueKind::UnresolvedReference => "unresolved reference",
            IssueKind::AmbiguousMatch => "ambiguous match",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub stage: Stage,
    pub table: TableName,
    pub kind: IssueKind,
    /// Zero-based row index in the table the stage was reading.
    pub row: Option<usize>,
    pub column: Option<String>,
    pub detail: String,
}

impl DataQualityIssue {
    pub fn new(stage: Stage, table: TableName, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            table,
            kind,
            row: None,
            column: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Accumulated warnings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    issues: Vec<DataQualityIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: DataQualityIssue) {
        debug!(
            stage = %issue.stage,
            table = %issue.table,
            kind = %issue.kind,
            row = ?issue.row,
            column = ?issue.column,
            "{}",
            issue.detail
        );
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn count_for(&self, table: TableName, kind: IssueKind) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.table == table && issue.kind == kind)
            .count()
    }

    /// Issue counts grouped by table and kind.
    pub fn summary(&self) -> BTreeMap<(TableName, IssueKind), usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry((issue.table, issue.kind)).or_insert(0) += 1;
        }
        counts
    }

    /// Emit one warning per table and kind.
    pub fn log_summary(&self) {
        for ((table, kind), count) in self.summary() {
            warn!(%table, %kind, count, "data-quality issues recovered");
        }
    }
}
