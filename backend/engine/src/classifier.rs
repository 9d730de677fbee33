//! Row classification: turns the data rows under a located header into
//! [`RowTask`]s, skipping rows that carry no usable image reference.

use serde::{Deserialize, Serialize};

use altforge_core::{HeaderInfo, RowTask, Table};

/// Which input path the table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyMode {
    /// Uploaded file: any non-empty reference is kept.
    #[default]
    Upload,
    /// Scheduled remote sheet: only `http://` and `https://` references are kept.
    Remote,
}

fn is_web_reference(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Iterate every data row below the header that holds an image reference.
///
/// Rows with an empty reference are excluded outright, as are non-URL
/// references in [`ClassifyMode::Remote`].
pub fn classify<'a>(
    table: &'a Table,
    header: &'a HeaderInfo,
    mode: ClassifyMode,
) -> impl Iterator<Item = RowTask> + 'a {
    let first = header.header_row_index + 1;
    let end = table.last_populated_row().map_or(0, |last| last + 1);

    (first..end.max(first)).filter_map(move |row_index| {
        let image_reference = table
            .text(row_index, header.image_column_index)
            .trim()
            .to_string();
        if image_reference.is_empty() {
            return None;
        }
        if mode == ClassifyMode::Remote && !is_web_reference(&image_reference) {
            return None;
        }

        let current_description = table.text(row_index, header.description_column_index);
        let needs_description = current_description.trim().is_empty();
        Some(RowTask {
            row_index,
            image_reference,
            current_description,
            needs_description,
        })
    })
}

/// Only the rows that still need a description.
pub fn pending<'a>(
    table: &'a Table,
    header: &'a HeaderInfo,
    mode: ClassifyMode,
) -> impl Iterator<Item = RowTask> + 'a {
    classify(table, header, mode).filter(|task| task.needs_description)
}
