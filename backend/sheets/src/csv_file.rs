//! Local CSV spreadsheet store used by the upload path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use altforge_core::{AltError, AltResult, Table, TableStore, WriteOp, WriteReceipt};

/// Parse CSV bytes into a table. Ragged rows are kept as-is.
pub fn parse_csv(bytes: &[u8]) -> AltResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AltError::Storage(format!("invalid CSV: {e}")))?;
        rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
    }
    Ok(Table::from_strings(rows))
}

/// Render a table back into CSV bytes.
pub fn render_csv(table: &Table) -> AltResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.as_text()))
            .map_err(|e| AltError::Storage(format!("CSV encode failed: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| AltError::Storage(format!("CSV flush failed: {e}")))
}

/// A CSV file on local disk.
///
/// Reads always come from `source`; writes apply to a fresh snapshot of
/// `source` and land atomically at `output` (which defaults to `source`).
#[derive(Debug, Clone)]
pub struct CsvFileStore {
    source: PathBuf,
    output: PathBuf,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let source = path.into();
        Self { output: source.clone(), source }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

#[async_trait]
impl TableStore for CsvFileStore {
    fn describe(&self) -> String {
        self.source.display().to_string()
    }

    async fn read_table(&self) -> AltResult<Table> {
        let bytes = fs::read(&self.source).await.map_err(|e| {
            AltError::Storage(format!("failed to read {}: {e}", self.source.display()))
        })?;
        parse_csv(&bytes)
    }

    async fn batch_write(&self, writes: &[WriteOp]) -> AltResult<WriteReceipt> {
        let mut table = self.read_table().await?;
        let updated = table.apply(writes);
        let bytes = render_csv(&table)?;

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    AltError::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        // Write to a temp file, then rename over the target.
        let tmp = self.output.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, &bytes).await.map_err(|e| {
            AltError::Storage(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.output).await.map_err(|e| {
            AltError::Storage(format!("failed to replace {}: {e}", self.output.display()))
        })?;

        info!(path = %self.output.display(), cells = updated, "Wrote CSV");
        Ok(WriteReceipt { requested: writes.len(), updated })
    }
}
