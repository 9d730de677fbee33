pub mod error;
pub mod traits;
pub mod types;

pub use error::{AltError, AltResult};
pub use traits::{ImageFetcher, StoreProvider, TableStore, TextGenerator};
pub use types::{
    CellValue, HeaderInfo, RowOutcome, RowTask, Table, TrackedTable, WriteOp, WriteReceipt,
};
