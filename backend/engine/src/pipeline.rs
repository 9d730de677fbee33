//! One pass over one table: locate → classify → describe → reconcile → apply.

use std::time::Duration;

use tracing::{debug, info, warn};

use altforge_core::{
    AltResult, HeaderInfo, ImageFetcher, RowOutcome, RowTask, Table, TableStore, TextGenerator,
    WriteOp,
};

use crate::classifier::{classify, ClassifyMode};
use crate::locator::{locate, DESCRIPTION_LABEL};
use crate::reconciler::{apply, build_writes, DescriptionPolicy, GenerationResult, RowFailure};

/// Minimum gap between two generation calls against the same table.
pub const MIN_PACING: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: ClassifyMode,
    /// Delay inserted between consecutive generation calls.
    pub pacing: Duration,
    pub policy: DescriptionPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::scheduled(MIN_PACING)
    }
}

impl PipelineOptions {
    /// Options for unattended runs; pacing never drops below [`MIN_PACING`].
    pub fn scheduled(pacing: Duration) -> Self {
        Self {
            mode: ClassifyMode::Remote,
            pacing: pacing.max(MIN_PACING),
            policy: DescriptionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DescriptionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Summary of one table pass.
#[derive(Debug, Clone)]
pub struct TableReport {
    pub header: HeaderInfo,
    /// Rows carrying a usable image reference.
    pub candidates: usize,
    /// Candidates that still needed a description.
    pub pending: usize,
    /// Description cells written.
    pub written: usize,
    pub failures: Vec<RowFailure>,
}

/// Header label write for a newly allocated description column.
pub fn label_write(header: &HeaderInfo) -> Option<WriteOp> {
    header.description_column_is_new.then(|| WriteOp {
        row_index: header.header_row_index,
        column_index: header.description_column_index,
        value: DESCRIPTION_LABEL.to_string(),
    })
}

/// Fetch the image behind `reference` and describe it.
pub async fn describe_reference(
    reference: &str,
    fetcher: &dyn ImageFetcher,
    generator: &dyn TextGenerator,
) -> AltResult<String> {
    let image = fetcher.fetch(reference).await?;
    generator.generate(&image).await
}

/// Describe each task in order, sleeping `pacing` between consecutive calls.
pub async fn describe_tasks(
    tasks: Vec<RowTask>,
    fetcher: &dyn ImageFetcher,
    generator: &dyn TextGenerator,
    pacing: Duration,
) -> Vec<GenerationResult> {
    let mut results = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.into_iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            debug!(delay_ms = pacing.as_millis() as u64, "Pacing before next generation call");
            tokio::time::sleep(pacing).await;
        }
        let outcome = describe_reference(&task.image_reference, fetcher, generator).await;
        match &outcome {
            Ok(text) => debug!(row = task.row_index, chars = text.chars().count(), "Generated description"),
            Err(e) => warn!(row = task.row_index, error = %e, "Row failed"),
        }
        results.push(GenerationResult { task, outcome });
    }
    results
}

/// Run the full pipeline against one store.
///
/// Row failures are collected in the report. Table-level failures (no image
/// column, storage errors, partial writes) are returned as errors.
pub async fn process_table(
    store: &dyn TableStore,
    fetcher: &dyn ImageFetcher,
    generator: &dyn TextGenerator,
    options: &PipelineOptions,
) -> AltResult<TableReport> {
    let table = store.read_table().await?;
    let header = locate(&table)?;

    let tasks: Vec<RowTask> = classify(&table, &header, options.mode).collect();
    let candidates = tasks.len();
    let pending: Vec<RowTask> = tasks.into_iter().filter(|t| t.needs_description).collect();

    info!(
        store = %store.describe(),
        candidates,
        pending = pending.len(),
        "Classified rows"
    );

    let mut report = TableReport {
        header,
        candidates,
        pending: pending.len(),
        written: 0,
        failures: Vec::new(),
    };
    if pending.is_empty() {
        return Ok(report);
    }

    let results = describe_tasks(pending, fetcher, generator, options.pacing).await;
    let set = build_writes(&header, results, &options.policy);
    report.failures = set.failures;

    if set.writes.is_empty() {
        warn!(store = %store.describe(), failed = report.failures.len(), "No descriptions generated");
        return Ok(report);
    }

    let written = set.writes.len();
    let batch: Vec<WriteOp> = label_write(&header).into_iter().chain(set.writes).collect();
    apply(&batch, store).await?;
    report.written = written;
    Ok(report)
}

/// Describe specific rows of an uploaded table, reporting each row's outcome.
pub async fn describe_rows(
    table: &Table,
    header: &HeaderInfo,
    row_indices: &[usize],
    fetcher: &dyn ImageFetcher,
    generator: &dyn TextGenerator,
    policy: &DescriptionPolicy,
) -> Vec<RowOutcome> {
    let mut outcomes = Vec::with_capacity(row_indices.len());
    for &row_index in row_indices {
        if row_index <= header.header_row_index {
            outcomes.push(RowOutcome::failed(row_index, "row is not below the header"));
            continue;
        }
        let reference = table.text(row_index, header.image_column_index);
        let reference = reference.trim();
        if reference.is_empty() {
            outcomes.push(RowOutcome::failed(row_index, "No image URL found"));
            continue;
        }
        let outcome = match describe_reference(reference, fetcher, generator).await {
            Ok(text) => {
                let text = policy.apply(&text);
                if text.is_empty() {
                    RowOutcome::failed(row_index, "generator returned empty text")
                } else {
                    RowOutcome::described(row_index, text)
                }
            }
            Err(e) => {
                warn!(row = row_index, error = %e, "Row failed");
                RowOutcome::failed(row_index, e)
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}
