use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use rcm_cli::types::RunResult;
use rcm_output::Layer;

pub fn print_summary(result: &RunResult) {
    println!("Build time: {}", result.build_time);
    println!("Output: {}", result.output_dir.display());
    println!("Manifest: {}", result.manifest.display());
    println!("Schema summary: {}", result.schema_summary.display());
    print_load_table(result);
    print_history(result);
    print_kpi_table(result);
    print_issue_table(result);
    if !result.missing_sources.is_empty() {
        eprintln!("Missing sources:");
        for missing in &result.missing_sources {
            eprintln!("- {} ({})", missing.table, missing.path.display());
        }
    }
}

fn print_load_table(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Layer"),
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Partition"),
        header_cell("Cluster"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    let mut total_rows = 0usize;
    for load in &result.loads {
        total_rows += load.rows;
        table.add_row(vec![
            layer_cell(load.layer),
            Cell::new(&load.table),
            Cell::new(load.rows),
            optional_cell(load.options.partition_column.as_deref()),
            optional_cell(
                Some(load.options.cluster_columns.join(", ")).filter(|joined| !joined.is_empty()),
            ),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} tables", result.loads.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn print_history(result: &RunResult) {
    let history = &result.history;
    println!(
        "Patient history: {} new, {} changed, {} unchanged, {} rejected",
        history.new_members, history.new_versions, history.unchanged, history.rejected
    );
}

fn print_kpi_table(result: &RunResult) {
    let kpis = &result.kpis;
    let mut table = Table::new();
    table.set_header(vec![header_cell("KPI"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![
        Cell::new("Total revenue"),
        Cell::new(format!("{:.2}", kpis.total_revenue)),
    ]);
    for (source, revenue) in &kpis.revenue_by_source {
        table.add_row(vec![
            Cell::new(format!("  {source}")).fg(Color::DarkGrey),
            Cell::new(format!("{revenue:.2}")),
        ]);
    }
    table.add_row(vec![
        Cell::new("Claim approval rate"),
        match kpis.claim_approval_rate {
            Some(rate) => Cell::new(format!("{rate:.1}%")),
            None => dim_cell("-"),
        },
    ]);
    table.add_row(vec![
        Cell::new("Unique patients"),
        Cell::new(kpis.unique_patients),
    ]);
    println!();
    println!("KPIs:");
    println!("{table}");
}

fn print_issue_table(result: &RunResult) {
    let summary = result.diagnostics.summary();
    if summary.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Issue"),
        header_cell("Count"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for ((name, kind), count) in summary {
        table.add_row(vec![
            Cell::new(name.as_str()).fg(Color::Blue),
            Cell::new(kind.as_str()),
            Cell::new(count).fg(Color::Yellow),
        ]);
    }
    println!();
    println!("Data-quality issues (recovered):");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn layer_cell(layer: Layer) -> Cell {
    let color = match layer {
        Layer::Bronze => Color::DarkYellow,
        Layer::Silver => Color::Grey,
        Layer::Gold => Color::Yellow,
    };
    Cell::new(layer.as_str()).fg(color)
}

fn optional_cell<T: ToString>(value: Option<T>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
