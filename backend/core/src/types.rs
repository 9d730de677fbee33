use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Build a cell from raw text; the empty string becomes `Empty`.
    pub fn from_text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    /// True for `Empty` and for text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            // Integral numbers render without the trailing ".0".
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::from_text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

/// A snapshot of a rectangular-ish table. Rows may be ragged; a missing cell
/// always reads as [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a table from plain strings, as returned by text-only stores.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| CellValue::from_text(c)).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cells of row `index`, or an empty slice past the end.
    pub fn row(&self, index: usize) -> &[CellValue] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.row(row).get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, row: usize, column: usize) -> String {
        self.cell(row, column).as_text()
    }

    /// Index of the last row holding at least one non-blank cell.
    pub fn last_populated_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_blank()))
    }

    /// One past the right-most non-blank cell anywhere in the table.
    pub fn populated_width(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.iter().rposition(|c| !c.is_blank()))
            .map(|i| i + 1)
            .max()
            .unwrap_or(0)
    }

    /// Overwrite one cell, padding the table with empty cells as needed.
    /// Returns `false` and leaves the table untouched when a coordinate is
    /// `usize::MAX`.
    pub fn set(&mut self, row: usize, column: usize, value: impl Into<CellValue>) -> bool {
        let (Some(row_len), Some(column_len)) = (row.checked_add(1), column.checked_add(1)) else {
            return false;
        };
        if self.rows.len() < row_len {
            self.rows.resize_with(row_len, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() < column_len {
            cells.resize(column_len, CellValue::Empty);
        }
        cells[column] = value.into();
        true
    }

    /// Apply every write and return how many cells were set.
    pub fn apply(&mut self, writes: &[WriteOp]) -> usize {
        writes
            .iter()
            .filter(|op| self.set(op.row_index, op.column_index, op.value.as_str()))
            .count()
    }
}

/// Where the semantic columns of a table live. All indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderInfo {
    pub header_row_index: usize,
    pub image_column_index: usize,
    pub description_column_index: usize,
    pub description_column_is_new: bool,
}

/// One data row that carries an image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowTask {
    pub row_index: usize,
    pub image_reference: String,
    pub current_description: String,
    pub needs_description: bool,
}

/// A targeted single-cell mutation. The only unit ever sent to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOp {
    pub row_index: usize,
    pub column_index: usize,
    pub value: String,
}

/// What a store reports back after a batched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteReceipt {
    pub requested: usize,
    pub updated: usize,
}

impl WriteReceipt {
    pub fn complete(count: usize) -> Self {
        Self { requested: count, updated: count }
    }

    pub fn is_complete(&self) -> bool {
        self.updated >= self.requested
    }
}

/// A spreadsheet registered for unattended processing.
///
/// `display_name` is the sheet (tab) name inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTable {
    pub identifier: String,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
}

impl TrackedTable {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            registered_at: Utc::now(),
        }
    }
}

/// Per-row result surfaced to interactive callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    pub row_index: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RowOutcome {
    pub fn described(row_index: usize, description: impl Into<String>) -> Self {
        Self {
            row_index,
            success: true,
            description: Some(description.into()),
            error: None,
        }
    }

    pub fn failed(row_index: usize, error: impl fmt::Display) -> Self {
        Self {
            row_index,
            success: false,
            description: None,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells_read_as_empty() {
        let table = Table::from_strings(vec![vec!["id", "image_url"], vec!["1"]]);
        assert_eq!(table.cell(1, 1), &CellValue::Empty);
        assert_eq!(table.cell(7, 3), &CellValue::Empty);
        assert_eq!(table.text(1, 0), "1");
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn last_populated_row_skips_trailing_blank_rows() {
        let table = Table::from_strings(vec![
            vec!["image"],
            vec!["https://x/a.png"],
            vec!["  "],
            vec![""],
        ]);
        assert_eq!(table.last_populated_row(), Some(1));
        assert_eq!(Table::default().last_populated_row(), None);
    }

    #[test]
    fn set_pads_ragged_rows() {
        let mut table = Table::from_strings(vec![vec!["a"]]);
        table.set(2, 3, "x");
        assert_eq!(table.len(), 3);
        assert_eq!(table.row(2).len(), 4);
        assert_eq!(table.text(2, 3), "x");
        assert!(table.cell(1, 0).is_blank());
    }

    #[test]
    fn set_rejects_overflowing_coordinates() {
        let mut table = Table::from_strings(vec![vec!["a"]]);
        assert!(!table.set(usize::MAX, 0, "x"));
        assert!(!table.set(0, usize::MAX, "x"));
        let writes = vec![
            WriteOp { row_index: usize::MAX, column_index: 0, value: "x".into() },
            WriteOp { row_index: 0, column_index: 1, value: "y".into() },
        ];
        assert_eq!(table.apply(&writes), 1);
        assert_eq!(table, Table::from_strings(vec![vec!["a", "y"]]));
    }

    #[test]
    fn populated_width_ignores_trailing_blanks() {
        let table = Table::new(vec![
            vec!["a".into(), "b".into(), CellValue::Empty],
            vec!["c".into(), CellValue::Empty, CellValue::Empty, "d".into()],
        ]);
        assert_eq!(table.populated_width(), 4);
    }

    #[test]
    fn cells_serialize_as_plain_json_scalars() {
        let row = vec![CellValue::Empty, CellValue::Number(1.0), "x".into()];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,1.0,"x"]"#);
    }
}
