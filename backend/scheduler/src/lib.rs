//! Scheduled reconciliation of tracked spreadsheets.

pub mod cycle;
pub mod registry;
pub mod retry;
pub mod run_log;
pub mod scheduler;
pub mod trigger;

pub use cycle::{
    CollaboratorFactory, Collaborators, CycleReport, CycleRunner, SheetsCycle, TableOutcome,
    TableStatus,
};
pub use registry::TableRegistry;
pub use retry::{BackoffPolicy, RetryState};
pub use run_log::{RunLog, RunLogEntry};
pub use scheduler::{Clock, Scheduler, SchedulerSettings, SchedulerState, TokioClock};
pub use trigger::Trigger;
