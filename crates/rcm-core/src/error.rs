use chrono::NaiveDateTime;
use polars::prelude::PolarsError;
use thiserror::Error;

use rcm_model::{Stage, TableName};

/// Structural failures that abort a model build.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{stage}: required table `{table}` is missing from the input set")]
    MissingTable { stage: Stage, table: TableName },

    #[error("{stage}: table `{table}` has no business-key column `{column}`")]
    MissingBusinessKey {
        stage: Stage,
        table: TableName,
        column: &'static str,
    },

    #[error(
        "patient history: build time {build_time} is not after the effective date \
         {effective_date} of the current version of `{unified_key}`"
    )]
    NonMonotonicBuildTime {
        unified_key: String,
        effective_date: NaiveDateTime,
        build_time: NaiveDateTime,
    },

    #[error("failed to assemble table `{table}`: {source}")]
    Frame {
        table: TableName,
        #[source]
        source: PolarsError,
    },
}

impl ModelError {
    pub(crate) fn frame(table: TableName, source: PolarsError) -> Self {
        Self::Frame { table, source }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
