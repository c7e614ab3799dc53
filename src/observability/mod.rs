//! Observability for crew runs
//!
//! Structured diagnostic logging and span macros for runs, tasks and tools.

pub mod logging;

pub use logging::{init_default_logging, init_logging, resolve_level, LogFormat};

// Span macros for structured logging
pub use logging::{run_span, task_span, tool_span};
