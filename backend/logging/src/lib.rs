//! Structured logging for altforge.
//!
//! Console plus daily-rolling JSON file output, and secret scrubbing for
//! collaborator error messages.

pub mod logger;
pub mod redact;

pub use logger::{init_console_logger, init_logger, LOG_FILE_PREFIX};
pub use redact::redact_sensitive_data;
