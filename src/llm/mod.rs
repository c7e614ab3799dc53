//! LLM provider abstraction layer
//!
//! Provider-agnostic completion interface plus the concrete OpenAI client.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
