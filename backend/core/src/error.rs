use thiserror::Error;

/// Top-level error type shared by every altforge crate.
///
/// Variants are grouped by how far they are allowed to travel: row-level
/// failures (`Download`, `Generation`) stay with the row, table-level failures
/// (`NoImageColumnFound`, `PartialWriteFailure`, `Storage`) stay with the table,
/// and only `ConfigurationMissing` or `Other` reach the scheduler.
#[derive(Debug, Error)]
pub enum AltError {
    #[error("configuration missing: {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),

    #[error(
        "no image column found in the first {scanned} rows \
         (expected a header containing one of: image_url, image, url, image_link, imageurl)"
    )]
    NoImageColumnFound { scanned: usize },

    #[error("image download failed: {0}")]
    Download(String),

    #[error("description generation failed: {0}")]
    Generation(String),

    #[error("partial write: {updated} of {requested} cells persisted")]
    PartialWriteFailure { requested: usize, updated: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AltError {
    pub fn missing(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::ConfigurationMissing(vars.into_iter().map(Into::into).collect())
    }

    /// Whether the failure belongs to a single row and must not escalate.
    pub fn is_row_scoped(&self) -> bool {
        matches!(self, Self::Download(_) | Self::Generation(_))
    }
}

pub type AltResult<T> = std::result::Result<T, AltError>;
