//! research-crew
//!
//! A two-agent research pipeline with a live terminal log.
//!
//! # Overview
//!
//! A researcher agent gathers findings on a topic and a writer agent turns
//! them into a blog post. Every lifecycle event of the run (LLM calls, tool
//! calls, agent actions, finished tasks) is turned into a log line and drawn
//! as soon as it happens.
//!
//! - [`crew`]: agents, tasks, the tool-calling loop and sequential execution
//! - [`callbacks`]: lifecycle events, the event-to-log adapter and transcripts
//! - [`dashboard`]: form input, log buffer, display surfaces and the run boundary
//! - [`llm`]: provider trait and the OpenAI-compatible client
//! - [`tools`]: tool trait, schema-validated registry and web search
//!
//! # Quick Start
//!
//! ```rust
//! use research_crew::callbacks::{CallbackEvent, CallbackHandler, LogAdapter};
//! use research_crew::dashboard::{LogBuffer, TerminalSurface};
//!
//! let mut log = LogBuffer::new();
//! let mut surface = TerminalSurface::new(Vec::new());
//! let mut adapter = LogAdapter::new(&mut log, &mut surface);
//!
//! adapter
//!     .handle(&CallbackEvent::ToolStart {
//!         tool: "web_search".to_string(),
//!         input: "{\"query\":\"rust\"}".to_string(),
//!     })
//!     .unwrap();
//!
//! assert_eq!(
//!     log.as_str(),
//!     "🔧 Using tool: web_search with input: {\"query\":\"rust\"}\n"
//! );
//! ```

pub mod callbacks;
pub mod config;
pub mod crew;
pub mod dashboard;
pub mod error;
pub mod llm;
pub mod observability;
pub mod testing;
pub mod tools;

pub use config::CrewConfig;
pub use error::{CrewError, CrewResult};
