//! Reconciliation: turns generation results into the minimal set of cell
//! writes and ships them to a store in one batched call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use altforge_core::{
    AltError, AltResult, HeaderInfo, RowTask, Table, TableStore, WriteOp, WriteReceipt,
};

/// Default cap on description length, in characters.
pub const DEFAULT_MAX_CHARS: usize = 125;

const ELLIPSIS: &str = "...";

/// Length rule applied to every description before it becomes a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionPolicy {
    pub max_chars: Option<usize>,
}

impl Default for DescriptionPolicy {
    fn default() -> Self {
        Self { max_chars: Some(DEFAULT_MAX_CHARS) }
    }
}

impl DescriptionPolicy {
    pub fn unlimited() -> Self {
        Self { max_chars: None }
    }

    /// A configured limit; `0` disables the cap.
    pub fn from_limit(max_chars: usize) -> Self {
        Self { max_chars: (max_chars > 0).then_some(max_chars) }
    }

    /// Trim and, when over the cap, cut to `max_chars` characters ending in "...".
    pub fn apply(&self, text: &str) -> String {
        let text = text.trim();
        let Some(max) = self.max_chars else {
            return text.to_string();
        };
        if text.chars().count() <= max {
            return text.to_string();
        }
        if max <= ELLIPSIS.len() {
            return text.chars().take(max).collect();
        }
        let mut cut: String = text.chars().take(max - ELLIPSIS.len()).collect();
        cut.push_str(ELLIPSIS);
        cut
    }
}

/// The generation outcome for one classified row.
#[derive(Debug)]
pub struct GenerationResult {
    pub task: RowTask,
    pub outcome: AltResult<String>,
}

/// A row that produced no write, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_index: usize,
    pub reason: String,
}

/// Writes to send plus the rows left out of them.
#[derive(Debug, Default)]
pub struct WriteSet {
    pub writes: Vec<WriteOp>,
    pub failures: Vec<RowFailure>,
    /// Rows that were already described, or repeated in the input.
    pub skipped: Vec<usize>,
}

/// Build one write per successfully described row.
///
/// Only tasks classified `needs_description` are eligible, each row is written
/// at most once, and failed or empty results never produce a write.
pub fn build_writes(
    header: &HeaderInfo,
    results: impl IntoIterator<Item = GenerationResult>,
    policy: &DescriptionPolicy,
) -> WriteSet {
    let mut set = WriteSet::default();
    let mut seen = HashSet::new();

    for GenerationResult { task, outcome } in results {
        if !task.needs_description || !seen.insert(task.row_index) {
            set.skipped.push(task.row_index);
            continue;
        }
        match outcome {
            Ok(text) => {
                let value = policy.apply(&text);
                if value.is_empty() {
                    set.failures.push(RowFailure {
                        row_index: task.row_index,
                        reason: "generator returned empty text".to_string(),
                    });
                    continue;
                }
                set.writes.push(WriteOp {
                    row_index: task.row_index,
                    column_index: header.description_column_index,
                    value,
                });
            }
            Err(e) => set.failures.push(RowFailure {
                row_index: task.row_index,
                reason: e.to_string(),
            }),
        }
    }

    set
}

/// A caller-supplied description for one row (interactive download).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionEdit {
    pub row_index: usize,
    pub description: String,
}

/// Turn caller edits into description-column writes.
///
/// Only rows strictly below the header and no further down than the table's
/// last populated row are eligible. Ineligible rows, blank descriptions and
/// repeated rows are reported in `skipped`, so an edit can never clear an
/// existing cell, touch the header, or grow the table.
pub fn edits_to_writes(
    table: &Table,
    header: &HeaderInfo,
    edits: &[DescriptionEdit],
    policy: &DescriptionPolicy,
) -> WriteSet {
    let last_row = table.last_populated_row().unwrap_or(header.header_row_index);
    let mut set = WriteSet::default();
    let mut seen = HashSet::new();

    for edit in edits {
        let in_range = edit.row_index > header.header_row_index && edit.row_index <= last_row;
        let value = policy.apply(&edit.description);
        if !in_range || value.is_empty() || !seen.insert(edit.row_index) {
            set.skipped.push(edit.row_index);
            continue;
        }
        set.writes.push(WriteOp {
            row_index: edit.row_index,
            column_index: header.description_column_index,
            value,
        });
    }
    set
}

/// Send every write for one table in a single `batch_write` call.
///
/// A receipt short of the requested count becomes `PartialWriteFailure`; the
/// affected rows still look blank on the next read and are retried then.
pub async fn apply(writes: &[WriteOp], store: &dyn TableStore) -> AltResult<WriteReceipt> {
    if writes.is_empty() {
        return Ok(WriteReceipt::default());
    }

    let receipt = store.batch_write(writes).await?;
    if !receipt.is_complete() {
        warn!(
            store = %store.describe(),
            requested = receipt.requested,
            updated = receipt.updated,
            "Batch write only partially applied"
        );
        return Err(AltError::PartialWriteFailure {
            requested: receipt.requested,
            updated: receipt.updated,
        });
    }

    info!(store = %store.describe(), cells = receipt.updated, "Batch write applied");
    Ok(receipt)
}
