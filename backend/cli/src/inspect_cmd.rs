//! `altforge inspect`: show how a local CSV would be processed.

use std::path::Path;

use anyhow::{Context, Result};

use altforge_core::{HeaderInfo, RowTask};
use altforge_engine::{classify, column_letter, locate, ClassifyMode};
use altforge_sheets::parse_csv;

use crate::terminal_output::{
    note_info, note_success, note_warn, paint, render_table, Column, DIM, YELLOW,
};

pub async fn run(path: &Path, limit: usize) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let table = parse_csv(&bytes)?;
    let header = locate(&table)?;
    let rows: Vec<RowTask> = classify(&table, &header, ClassifyMode::Upload).collect();

    note_info(&describe_header(&header));
    if rows.is_empty() {
        note_warn("No data rows with image references found");
        return Ok(());
    }

    let pending = rows.iter().filter(|r| r.needs_description).count();
    println!("{}", render_rows(&rows, limit));
    if rows.len() > limit {
        println!("  {}", paint(&format!("... {} more rows", rows.len() - limit), DIM));
    }
    if pending == 0 {
        note_success(&format!("All {} rows are described", rows.len()));
    } else {
        note_info(&format!("{pending} of {} rows need a description", rows.len()));
    }
    Ok(())
}

fn describe_header(header: &HeaderInfo) -> String {
    let description = if header.description_column_is_new {
        format!("new column {}", column_letter(header.description_column_index))
    } else {
        format!("column {}", column_letter(header.description_column_index))
    };
    format!(
        "Header on row {}, images in column {}, descriptions in {description}",
        header.header_row_index + 1,
        column_letter(header.image_column_index),
    )
}

fn render_rows(rows: &[RowTask], limit: usize) -> String {
    let columns = [
        Column::right("Row"),
        Column::left("Image").max(48),
        Column::left("Description").max(60),
    ];
    let cells: Vec<Vec<String>> = rows
        .iter()
        .take(limit)
        .map(|row| {
            let description = if row.needs_description {
                paint("(pending)", YELLOW)
            } else {
                row.current_description.clone()
            };
            vec![(row.row_index + 1).to_string(), row.image_reference.clone(), description]
        })
        .collect();
    render_table(&columns, &cells)
}
