use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use comfy_table::Table;
use tracing::info;

use rcm_cli::config::RcmConfig;
use rcm_cli::pipeline::{PipelineConfig, run_pipeline};
use rcm_cli::types::RunResult;
use rcm_model::TableName;

use crate::cli::{RunArgs, SchemaArgs};
use crate::summary::apply_table_style;

pub fn run_build(args: &RunArgs) -> Result<RunResult> {
    let mut config = RcmConfig::load(args.config.as_deref())?;
    if let Some(raw_dir) = &args.raw_dir {
        let rebased = RcmConfig::with_raw_dir(raw_dir, &config.output_dir);
        config.sources = rebased.sources;
        config.claims_dir = rebased.claims_dir;
        config.cpt_file = rebased.cpt_file;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(state_dir) = &args.state_dir {
        config.state_dir.clone_from(state_dir);
    }
    let build_time = args.build_time.unwrap_or_else(default_build_time);
    info!(
        sources = config.sources.len(),
        output = %config.output_dir.display(),
        state = %config.state_dir.display(),
        "starting run"
    );

    run_pipeline(&PipelineConfig {
        layout: config.source_layout(),
        output_dir: config.output_dir,
        state_dir: config.state_dir,
        build_time,
    })
}

/// Current UTC time. SCD2 timestamps are UTC so they never run backwards
/// across a DST change or a host timezone change.
fn default_build_time() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn run_schema(args: &SchemaArgs) -> Result<()> {
    let tables: Vec<TableName> = match &args.table {
        Some(name) => vec![name.parse().context("unknown table")?],
        None => TableName::INPUTS
            .into_iter()
            .chain(TableName::OUTPUTS)
            .collect(),
    };
    let mut table = Table::new();
    table.set_header(vec!["Table", "Column", "Type", "Role"]);
    apply_table_style(&mut table);
    for name in tables {
        for column in name.schema().columns {
            table.add_row(vec![
                name.as_str(),
                column.name,
                column.semantic.as_str(),
                column.role.as_str(),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}
