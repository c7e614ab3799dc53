//! Testing utilities and mock implementations
//!
//! Mocks for running crews and the dashboard without an LLM endpoint or a
//! terminal.

pub mod mocks;

pub use mocks::*;
