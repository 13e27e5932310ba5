use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use chad_cli::commands::CategoryRow;
use chad_core::BuildSummary;
use chad_ingest::ConsolidatedCategory;

pub fn print_build_summary(summary: &BuildSummary) {
    println!("Database: {}", summary.database.display());
    println!("Schema: {}", summary.schema);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Categories"),
        header_cell("Source rows"),
        header_cell("Rows"),
        header_cell("Batches"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_source = 0usize;
    for row in &summary.tables {
        total_source += row.source_rows;
        table.add_row(vec![
            Cell::new(row.table).add_attribute(Attribute::Bold),
            Cell::new(row.categories),
            Cell::new(row.source_rows),
            rows_cell(row.rows, row.source_rows),
            count_cell(row.batches),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_source).add_attribute(Attribute::Bold),
        Cell::new(summary.total_rows()).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
    println!(
        "Patients with derived status: {}",
        summary.patients_with_status
    );
    println!("Indexes: {}", summary.indexes);
}

pub fn print_consolidate_summary(categories: &[ConsolidatedCategory]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Parts"),
        header_cell("Rows"),
        header_cell("File"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for category in categories {
        let parts = if category.parts > 1 {
            Cell::new(category.parts).fg(Color::Yellow)
        } else {
            dim_cell(category.parts)
        };
        table.add_row(vec![
            Cell::new(&category.category).add_attribute(Attribute::Bold),
            parts,
            Cell::new(category.rows),
            dim_cell(category.path.display()),
        ]);
    }
    println!("{table}");
}

pub fn print_categories(rows: &[CategoryRow]) {
    let with_presence = rows.iter().any(|row| row.present.is_some());
    let mut header = vec![
        header_cell("Category"),
        header_cell("Table"),
        header_cell("Shape"),
    ];
    if with_presence {
        header.push(header_cell("Present"));
    }
    let mut table = Table::new();
    table.set_header(header);
    apply_table_style(&mut table);
    if with_presence {
        align_column(&mut table, 3, CellAlignment::Center);
    }
    for row in rows {
        let mut cells = vec![
            Cell::new(&row.category).add_attribute(Attribute::Bold),
            Cell::new(&row.destination),
            dim_cell(row.shape),
        ];
        if let Some(present) = row.present {
            cells.push(presence_cell(present));
        }
        table.add_row(cells);
    }
    println!("{table}");
    let missing = rows.iter().filter(|row| row.present == Some(false)).count();
    if missing > 0 {
        eprintln!("{missing} categories missing");
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
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

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(value: usize) -> Cell {
    if value > 0 {
        Cell::new(value)
    } else {
        dim_cell(value)
    }
}

/// Highlights tables that lost rows to filtering.
fn rows_cell(rows: usize, source_rows: usize) -> Cell {
    if rows < source_rows {
        Cell::new(rows).fg(Color::Yellow)
    } else {
        count_cell(rows)
    }
}

fn presence_cell(present: bool) -> Cell {
    if present {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("missing")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}
