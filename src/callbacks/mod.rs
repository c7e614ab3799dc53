//! Lifecycle callbacks emitted during a crew run
//!
//! The executor reports every LLM call, tool call, agent action and task
//! completion as a [`CallbackEvent`]. Handlers turn those into log lines,
//! transcripts, or test recordings.

pub mod events;
pub mod log_adapter;
pub mod transcript;

pub use events::{CallbackEvent, CallbackHandler, NoOpHandler};
pub use log_adapter::{truncate_tool_output, LogAdapter, TOOL_OUTPUT_PREVIEW_CHARS};
pub use transcript::{replay_transcript, TranscriptRecorder};
