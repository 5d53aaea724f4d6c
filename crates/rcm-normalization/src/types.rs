//! Normalization rules and pipelines.

use chrono::NaiveDate;

use rcm_model::TableName;

/// How a target column is produced from the raw extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationType {
    /// Trimmed text.
    CopyDirect,
    Gender,
    Phone,
    /// ISO `YYYY-MM-DD`; unparseable values are kept as found.
    IsoDate,
    /// Float measure; blank and unparseable values become `0`.
    Decimal,
    /// Whole years from the `dob` column at the context date, falling back to
    /// the raw value of the column itself.
    AgeFromDob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationRule {
    /// Column name in the declared schema.
    pub target_column: &'static str,
    /// Canonical raw headers accepted for this column, in priority order.
    pub source_aliases: Vec<String>,
    pub transform_type: NormalizationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationPipeline {
    pub table: TableName,
    pub rules: Vec<NormalizationRule>,
}

impl NormalizationPipeline {
    pub fn rule(&self, target: &str) -> Option<&NormalizationRule> {
        self.rules.iter().find(|rule| rule.target_column == target)
    }
}

/// Run-wide inputs to normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationContext {
    /// Reference date for derived ages.
    pub as_of: NaiveDate,
}

impl NormalizationContext {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }
}
