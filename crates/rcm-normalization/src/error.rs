use polars::prelude::PolarsError;
use thiserror::Error;

use rcm_model::TableName;

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("table `{0}` is not a source table")]
    NotASourceTable(TableName),

    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
}
