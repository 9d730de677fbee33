//! One scheduled cycle: every tracked table, each isolated from the others.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use altforge_core::{AltError, AltResult, ImageFetcher, StoreProvider, TextGenerator, TrackedTable};
use altforge_engine::{process_table, PipelineOptions, TableReport};
use altforge_logging::redact_sensitive_data;

use crate::registry::TableRegistry;
use crate::run_log::{RunLog, RunLogEntry};

/// Everything a cycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub stores: Arc<dyn StoreProvider>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub generator: Arc<dyn TextGenerator>,
}

/// Builds collaborators right before each cycle so late credentials are seen.
pub trait CollaboratorFactory: Send + Sync {
    /// Fails with `AltError::ConfigurationMissing` while credentials are absent.
    fn build(&self) -> AltResult<Collaborators>;

    /// Names still missing; empty once a cycle can start.
    fn missing_config(&self) -> Vec<String> {
        match self.build() {
            Err(AltError::ConfigurationMissing(vars)) => vars,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Ok,
    Skipped,
    Error,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// What happened to one table during a cycle.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: TrackedTable,
    pub status: TableStatus,
    pub started_at: DateTime<Utc>,
    pub candidates: usize,
    pub pending: usize,
    pub written: usize,
    pub failed: usize,
    pub error: Option<String>,
}

impl TableOutcome {
    fn from_report(table: TrackedTable, started_at: DateTime<Utc>, report: &TableReport) -> Self {
        Self {
            table,
            status: TableStatus::Ok,
            started_at,
            candidates: report.candidates,
            pending: report.pending,
            written: report.written,
            failed: report.failures.len(),
            error: None,
        }
    }

    fn from_error(table: TrackedTable, started_at: DateTime<Utc>, err: &AltError) -> Self {
        let status = match err {
            AltError::NoImageColumnFound { .. } => TableStatus::Skipped,
            _ => TableStatus::Error,
        };
        Self {
            table,
            status,
            started_at,
            candidates: 0,
            pending: 0,
            written: 0,
            failed: 0,
            error: Some(redact_sensitive_data(&err.to_string())),
        }
    }

    fn to_entry(&self, cycle_id: Uuid) -> RunLogEntry {
        RunLogEntry {
            id: Uuid::new_v4().to_string(),
            cycle_id: cycle_id.to_string(),
            table_id: self.table.identifier.clone(),
            sheet_name: self.table.display_name.clone(),
            started_at: self.started_at.timestamp(),
            status: self.status.as_str().to_string(),
            candidates: self.candidates as i64,
            written: self.written as i64,
            failed: self.failed as i64,
            error: self.error.clone(),
        }
    }
}

/// Result of a whole cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub outcomes: Vec<TableOutcome>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn total_written(&self) -> usize {
        self.outcomes.iter().map(|o| o.written).sum()
    }

    pub fn tables_with_status(&self, status: TableStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Runs cycles for the scheduler.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    /// Names of required settings that are absent. Empty means ready.
    fn missing_config(&self) -> Vec<String> {
        Vec::new()
    }

    /// Process every table. An `Err` means the cycle failed as a whole.
    async fn run_cycle(&self, registry: &TableRegistry) -> Result<CycleReport>;
}

/// Production cycle: locate, classify, describe and write back each table.
pub struct SheetsCycle<F> {
    factory: F,
    options: PipelineOptions,
    max_parallel: usize,
    run_log: Option<Mutex<RunLog>>,
}

impl<F: CollaboratorFactory> SheetsCycle<F> {
    pub fn new(factory: F, options: PipelineOptions) -> Self {
        Self { factory, options, max_parallel: 1, run_log: None }
    }

    /// Process up to `n` tables at once. Rows within a table stay sequential.
    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = n.max(1);
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(Mutex::new(run_log));
        self
    }

    async fn process(&self, collab: &Collaborators, table: &TrackedTable) -> TableOutcome {
        let started_at = Utc::now();
        let result = match collab.stores.open(table) {
            Ok(store) => {
                process_table(
                    store.as_ref(),
                    collab.fetcher.as_ref(),
                    collab.generator.as_ref(),
                    &self.options,
                )
                .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                info!(
                    table = %table.identifier,
                    sheet = %table.display_name,
                    candidates = report.candidates,
                    written = report.written,
                    failed = report.failures.len(),
                    "Table processed"
                );
                TableOutcome::from_report(table.clone(), started_at, &report)
            }
            Err(err) => {
                let outcome = TableOutcome::from_error(table.clone(), started_at, &err);
                let reason = outcome.error.as_deref().unwrap_or_default();
                match outcome.status {
                    TableStatus::Skipped => warn!(table = %table.identifier, reason, "Table skipped"),
                    _ => error!(table = %table.identifier, error = reason, "Table failed"),
                }
                outcome
            }
        }
    }

    fn record(&self, cycle_id: Uuid, outcomes: &[TableOutcome]) {
        let Some(run_log) = &self.run_log else { return };
        let Ok(log) = run_log.lock() else {
            warn!("Run log lock poisoned; outcomes not recorded");
            return;
        };
        for outcome in outcomes {
            if let Err(e) = log.record(&outcome.to_entry(cycle_id)) {
                warn!(error = %e, table = %outcome.table.identifier, "Failed to record run log entry");
            }
        }
    }
}

#[async_trait]
impl<F: CollaboratorFactory> CycleRunner for SheetsCycle<F> {
    fn missing_config(&self) -> Vec<String> {
        self.factory.missing_config()
    }

    async fn run_cycle(&self, registry: &TableRegistry) -> Result<CycleReport> {
        let collab = self.factory.build()?;
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        info!(cycle = %cycle_id, tables = registry.len(), "Cycle started");

        let outcomes: Vec<TableOutcome> = if self.max_parallel <= 1 {
            let mut outcomes = Vec::with_capacity(registry.len());
            for table in registry.iter() {
                outcomes.push(self.process(&collab, table).await);
            }
            outcomes
        } else {
            let pending: Vec<_> = registry.iter().map(|table| self.process(&collab, table)).collect();
            stream::iter(pending)
                .buffered(self.max_parallel)
                .collect::<Vec<_>>()
                .await
        };

        self.record(cycle_id, &outcomes);

        let report = CycleReport { cycle_id, outcomes, elapsed: started.elapsed() };
        info!(
            cycle = %cycle_id,
            described = report.total_written(),
            skipped = report.tables_with_status(TableStatus::Skipped),
            failed = report.tables_with_status(TableStatus::Error),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Cycle finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use altforge_core::{CellValue, Table, TableStore, WriteOp, WriteReceipt};

    /// Tables held in memory, keyed by identifier. Missing ids fail on read.
    #[derive(Default)]
    struct MemoryStores {
        tables: Mutex<HashMap<String, Table>>,
    }

    impl MemoryStores {
        fn with(tables: &[(&str, Vec<Vec<&str>>)]) -> Arc<Self> {
            let map = tables
                .iter()
                .map(|(id, rows)| (id.to_string(), Table::from_strings(rows.clone())))
                .collect();
            Arc::new(Self { tables: Mutex::new(map) })
        }

        fn cell(&self, id: &str, row: usize, col: usize) -> CellValue {
            self.tables.lock().unwrap()[id].cell(row, col).clone()
        }
    }

    struct MemoryStore {
        stores: Arc<MemoryStores>,
        id: String,
    }

    #[async_trait]
    impl TableStore for MemoryStore {
        fn describe(&self) -> String {
            self.id.clone()
        }

        async fn read_table(&self) -> AltResult<Table> {
            self.stores
                .tables
                .lock()
                .unwrap()
                .get(&self.id)
                .cloned()
                .ok_or_else(|| AltError::Storage(format!("no table {} Bearer secret-token", self.id)))
        }

        async fn batch_write(&self, writes: &[WriteOp]) -> AltResult<WriteReceipt> {
            let mut tables = self.stores.tables.lock().unwrap();
            let table = tables.get_mut(&self.id).unwrap();
            table.apply(writes);
            Ok(WriteReceipt::complete(writes.len()))
        }
    }

    struct SharedStores(Arc<MemoryStores>);

    impl StoreProvider for SharedStores {
        fn open(&self, table: &TrackedTable) -> AltResult<Box<dyn TableStore>> {
            Ok(Box::new(MemoryStore { stores: self.0.clone(), id: table.identifier.clone() }))
        }
    }

    struct StaticFetcher;

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> AltResult<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _image: &[u8]) -> AltResult<String> {
            Ok("A product photo".to_string())
        }
    }

    struct Factory {
        stores: Arc<MemoryStores>,
        missing: Vec<String>,
    }

    impl CollaboratorFactory for Factory {
        fn build(&self) -> AltResult<Collaborators> {
            if !self.missing.is_empty() {
                return Err(AltError::ConfigurationMissing(self.missing.clone()));
            }
            Ok(Collaborators {
                stores: Arc::new(SharedStores(self.stores.clone())),
                fetcher: Arc::new(StaticFetcher),
                generator: Arc::new(FixedGenerator),
            })
        }
    }

    fn registry(ids: &[&str]) -> TableRegistry {
        TableRegistry::new(ids.iter().map(|id| TrackedTable::new(*id, "Sheet1")).collect())
    }

    fn stores() -> Arc<MemoryStores> {
        MemoryStores::with(&[
            ("good", vec![vec!["id", "image_url"], vec!["1", "https://x/a.jpg"]]),
            ("no-images", vec![vec!["id", "name"], vec!["1", "chair"]]),
        ])
    }

    #[tokio::test]
    async fn table_failures_do_not_abort_the_cycle() {
        let stores = stores();
        let cycle = SheetsCycle::new(
            Factory { stores: stores.clone(), missing: vec![] },
            PipelineOptions::default(),
        )
        .with_run_log(RunLog::open(":memory:").unwrap());

        let report = cycle.run_cycle(&registry(&["missing", "no-images", "good"])).await.unwrap();

        let statuses: Vec<TableStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![TableStatus::Error, TableStatus::Skipped, TableStatus::Ok]);
        assert_eq!(report.total_written(), 1);
        assert_eq!(stores.cell("good", 0, 2), CellValue::from("alt_text"));
        assert_eq!(stores.cell("good", 1, 2), CellValue::from("A product photo"));

        let error = report.outcomes[0].error.as_deref().unwrap();
        assert!(!error.contains("secret-token"));

        let log = cycle.run_log.as_ref().unwrap().lock().unwrap();
        assert_eq!(log.recent("good", 5).unwrap()[0].written, 1);
        assert_eq!(log.recent("no-images", 5).unwrap()[0].status, "skipped");
    }

    #[tokio::test]
    async fn second_cycle_writes_nothing() {
        let stores = stores();
        let cycle = SheetsCycle::new(
            Factory { stores: stores.clone(), missing: vec![] },
            PipelineOptions::default(),
        );
        let tables = registry(&["good"]);
        assert_eq!(cycle.run_cycle(&tables).await.unwrap().total_written(), 1);
        assert_eq!(cycle.run_cycle(&tables).await.unwrap().total_written(), 0);
    }

    #[tokio::test]
    async fn parallel_cycles_keep_registry_order() {
        let cycle = SheetsCycle::new(Factory { stores: stores(), missing: vec![] }, PipelineOptions::default())
            .with_max_parallel(4);
        let report = cycle.run_cycle(&registry(&["good", "no-images", "missing"])).await.unwrap();
        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.table.identifier.as_str()).collect();
        assert_eq!(ids, vec!["good", "no-images", "missing"]);
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_whole_cycle() {
        let cycle = SheetsCycle::new(
            Factory { stores: stores(), missing: vec!["GOOGLE_SHEETS_TOKEN".into()] },
            PipelineOptions::default(),
        );
        assert_eq!(cycle.missing_config(), vec!["GOOGLE_SHEETS_TOKEN".to_string()]);
        let err = cycle.run_cycle(&registry(&["good"])).await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_SHEETS_TOKEN"));
    }
}
