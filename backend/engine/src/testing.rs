//! In-memory collaborators shared by the engine's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use altforge_core::{
    AltError, AltResult, ImageFetcher, Table, TableStore, TextGenerator, WriteOp, WriteReceipt,
};

pub(crate) struct MemoryStore {
    table: Mutex<Table>,
    batch_calls: AtomicUsize,
    persist_limit: Option<usize>,
}

impl MemoryStore {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table: Mutex::new(table),
            batch_calls: AtomicUsize::new(0),
            persist_limit: None,
        }
    }

    /// Simulate a store that drops everything past the first `n` cells.
    pub(crate) fn persist_at_most(mut self, n: usize) -> Self {
        self.persist_limit = Some(n);
        self
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> Table {
        self.table.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn read_table(&self) -> AltResult<Table> {
        Ok(self.snapshot())
    }

    async fn batch_write(&self, writes: &[WriteOp]) -> AltResult<WriteReceipt> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let kept = self.persist_limit.unwrap_or(writes.len()).min(writes.len());
        self.table.lock().unwrap().apply(&writes[..kept]);
        Ok(WriteReceipt { requested: writes.len(), updated: kept })
    }
}

/// Returns the URL itself as the "image", failing for URLs containing "broken".
pub(crate) struct UrlFetcher;

#[async_trait]
impl ImageFetcher for UrlFetcher {
    async fn fetch(&self, url: &str) -> AltResult<Vec<u8>> {
        if url.contains("broken") {
            return Err(AltError::Download(format!("404 for {url}")));
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Describes an image by echoing its bytes; "nogen" fails and "blank" is empty.
#[derive(Default)]
pub(crate) struct EchoGenerator {
    calls: Mutex<Vec<Instant>>,
}

impl EchoGenerator {
    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, image: &[u8]) -> AltResult<String> {
        self.calls.lock().unwrap().push(Instant::now());
        let source = String::from_utf8_lossy(image);
        if source.contains("nogen") {
            return Err(AltError::Generation("model refused".into()));
        }
        if source.contains("blank") {
            return Ok(String::new());
        }
        Ok(format!("Photo from {source}"))
    }
}
