//! Terminal rendering of loaded tables and their labels.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::{AnyValue, DataFrame};
use tidy_model::LabelModel;

/// Table with the first `head` rows of `df`.
#[must_use]
pub fn preview_table(df: &DataFrame, head: usize) -> Table {
    let mut table = Table::new();
    table.set_header(
        df.get_column_names_str()
            .into_iter()
            .map(header_cell)
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut table);

    for row in 0..df.height().min(head) {
        let cells: Vec<Cell> = df
            .get_columns()
            .iter()
            .map(|column| match column.get(row) {
                Ok(AnyValue::Null) | Err(_) => dim_cell("null"),
                Ok(AnyValue::String(text)) => Cell::new(text),
                Ok(value) => Cell::new(value).set_alignment(CellAlignment::Right),
            })
            .collect();
        table.add_row(cells);
    }
    table
}

/// Variable name → label table, in column order.
#[must_use]
pub fn variable_label_table(labels: &LabelModel) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Variable"), header_cell("Label")]);
    apply_summary_table_style(&mut table);
    for (name, label) in labels.variables_in_order() {
        let label_cell = if label == name {
            dim_cell(label)
        } else {
            Cell::new(label)
        };
        table.add_row(vec![Cell::new(name).fg(Color::Green), label_cell]);
    }
    table
}

/// One row per labelled code.
#[must_use]
pub fn value_label_table(labels: &LabelModel) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Variable"),
        header_cell("Code"),
        header_cell("Label"),
    ]);
    apply_summary_table_style(&mut table);
    for (name, mapping) in labels.values() {
        for (code, label) in mapping {
            table.add_row(vec![
                Cell::new(name).fg(Color::Green),
                Cell::new(code).set_alignment(CellAlignment::Right),
                Cell::new(label),
            ]);
        }
    }
    table
}

/// Prints the preview, the shape and, when asked, the labels.
pub fn print_output(df: &DataFrame, labels: Option<&LabelModel>, head: usize, show_labels: bool) {
    println!("{}", preview_table(df, head));
    println!("shape: ({}, {})", df.height(), df.width());

    if !show_labels {
        return;
    }
    match labels {
        Some(labels) => {
            println!();
            println!("Variable labels:");
            println!("{}", variable_label_table(labels));
            if labels.values().is_empty() {
                println!("No value labels.");
            } else {
                println!("Value labels:");
                println!("{}", value_label_table(labels));
            }
        }
        None => println!("This format carries no labels."),
    }
}

fn apply_table_style(table: &mut Table) {
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
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string())
        .fg(Color::DarkGrey)
        .add_attribute(Attribute::Dim)
}
