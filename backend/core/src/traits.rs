use async_trait::async_trait;

use crate::error::AltResult;
use crate::types::{Table, TrackedTable, WriteOp, WriteReceipt};

/// A tabular resource the engine reads from and writes back into.
///
/// Each implementation is bound to one handle (a local file, or a spreadsheet
/// id plus sheet name), so the methods carry no addressing of their own.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Human-readable handle for logs.
    fn describe(&self) -> String;

    /// Take a full snapshot of the table.
    async fn read_table(&self) -> AltResult<Table>;

    /// Apply every write in one mutation call.
    async fn batch_write(&self, writes: &[WriteOp]) -> AltResult<WriteReceipt>;
}

/// Produces descriptive text for raw image bytes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Describe the image. Failures are `AltError::Generation`.
    async fn generate(&self, image: &[u8]) -> AltResult<String>;
}

/// Downloads the image behind a reference.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch image bytes. Failures are `AltError::Download`.
    async fn fetch(&self, url: &str) -> AltResult<Vec<u8>>;
}

/// Opens the store behind a tracked table.
pub trait StoreProvider: Send + Sync {
    fn open(&self, table: &TrackedTable) -> AltResult<Box<dyn TableStore>>;
}
