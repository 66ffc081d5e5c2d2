use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use serde_json::json;

use pds_codec::{FlatStore, TypeCodec};
use pds_model::FormSchema;
use pds_session::LotSummary;
use pds_validate::{Issue, Phase, ScreenResult, ValidationReport};

pub fn print_report(report: &ValidationReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Screen"),
        header_cell("Lot"),
        header_cell("Issues"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for result in report.iter() {
        table.add_row(vec![
            Cell::new(&result.screen_id),
            lot_cell(result.lot),
            count_cell(result.issues.len()),
            status_cell(result),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(report.issue_count()).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_issue_table(report);
}

fn print_issue_table(report: &ValidationReport) {
    let rows = issue_rows(report);
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Screen"),
        header_cell("Lot"),
        header_cell("Phase"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for row in rows {
        let color = phase_color(row.phase);
        table.add_row(vec![
            Cell::new(row.screen),
            lot_cell(row.lot),
            Cell::new(row.phase.label()).fg(color),
            Cell::new(row.field),
            Cell::new(row.message),
        ]);
    }
    println!("{table}");
}

/// One issue with the screen and lot it was reported for.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRow {
    pub screen: String,
    pub lot: Option<usize>,
    pub phase: Phase,
    pub field: String,
    pub message: String,
}

/// Issues in report order: screen, then lot, then emission order.
pub fn issue_rows(report: &ValidationReport) -> Vec<IssueRow> {
    report
        .failing()
        .flat_map(|result| {
            result.issues.iter().map(|issue| IssueRow {
                screen: result.screen_id.clone(),
                lot: result.lot,
                phase: issue.phase(),
                field: issue.field().to_string(),
                message: issue.message(),
            })
        })
        .collect()
}

/// Machine-readable report for `--format json`.
pub fn report_json(report: &ValidationReport) -> serde_json::Value {
    let results: Vec<serde_json::Value> = report
        .iter()
        .map(|result| {
            json!({
                "screen": result.screen_id,
                "lot": result.lot,
                "valid": result.is_valid(),
                "issues": result.issues.iter().map(issue_json).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "valid": report.is_valid(),
        "issue_count": report.issue_count(),
        "results": results,
    })
}

fn issue_json(issue: &Issue) -> serde_json::Value {
    json!({
        "phase": issue.phase().label(),
        "field": issue.field(),
        "message": issue.message(),
    })
}

pub fn print_store(store: &FlatStore) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Address"),
        header_cell("Type"),
        header_cell("Value"),
    ]);
    apply_table_style(&mut table);
    for (address, value) in store {
        table.add_row(vec![
            Cell::new(address),
            dim_cell(value.type_name()),
            Cell::new(value),
        ]);
    }
    println!("{table}");
}

/// Flat store as a JSON object of stored values keyed by address.
pub fn store_json(store: &FlatStore, codec: &TypeCodec) -> serde_json::Value {
    let entries = store
        .iter()
        .map(|(address, value)| (address.to_string(), codec.normalize_for_storage(value)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(entries)
}

pub fn print_screens(form: &FormSchema) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Screen"),
        header_cell("Title"),
        header_cell("Scope"),
        header_cell("Fields"),
        header_cell("Rules"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for (position, screen) in form.screens.iter().enumerate() {
        let scope = if screen.lot_scoped {
            Cell::new("per lot")
        } else {
            dim_cell("global")
        };
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(&screen.id),
            Cell::new(screen.display_name()),
            scope,
            Cell::new(screen.fields.len()),
            Cell::new(screen.cross_field.len() + screen.registry.len()),
        ]);
    }
    println!("{table}");
}

pub fn print_lots(lots: &[LotSummary]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Lot"), header_cell("Name")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for lot in lots {
        table.add_row(vec![Cell::new(lot.index), Cell::new(&lot.name)]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::LowerBoundary(Width::Fixed(5)),
            ColumnConstraint::LowerBoundary(Width::Fixed(11)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::LowerBoundary(Width::Percentage(40)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn lot_cell(lot: Option<usize>) -> Cell {
    match lot {
        Some(lot) => Cell::new(lot),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(Color::Red)
    }
}

fn status_cell(result: &ScreenResult) -> Cell {
    if result.is_valid() {
        Cell::new("ok").fg(Color::Green)
    } else {
        Cell::new("invalid")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Required => Color::Red,
        Phase::Cardinality => Color::Yellow,
        Phase::CrossField => Color::Magenta,
        Phase::Registry => Color::Blue,
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
