pub mod classifier;
pub mod coords;
pub mod locator;
pub mod pipeline;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{classify, pending, ClassifyMode};
pub use coords::{cell_address, column_letter, to_index, to_letter};
pub use locator::{locate, DESCRIPTION_LABEL, HEADER_SCAN_ROWS};
pub use pipeline::{
    describe_reference, describe_rows, describe_tasks, label_write, process_table,
    PipelineOptions, TableReport, MIN_PACING,
};
pub use reconciler::{
    apply, build_writes, edits_to_writes, DescriptionEdit, DescriptionPolicy, GenerationResult,
    RowFailure, WriteSet,
};
