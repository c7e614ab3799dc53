//! Error types for research crew runs
//!
//! Every failure inside a run funnels into [`CrewError`]. The dashboard shows
//! exactly one sanitized message per failed run via [`CrewError::user_message`].

use crate::config::ConfigError;
use crate::llm::provider::LlmError;
use crate::tools::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

static BEARER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(sk-[a-zA-Z0-9_-]{8,})").expect("bearer pattern is valid"));

const MAX_USER_MESSAGE_LEN: usize = 500;

/// Main error type for crew operations
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Agent '{agent}' exceeded maximum iterations ({max})")]
    IterationLimit { agent: String, max: u32 },

    #[error("Malformed callback event: {0}")]
    MalformedEvent(String),

    #[error("Transcript I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CrewError {
    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create iteration limit error
    pub fn iteration_limit<S: Into<String>>(agent: S, max: u32) -> Self {
        Self::IterationLimit {
            agent: agent.into(),
            max,
        }
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Message safe to show on the dashboard
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redact credentials and sensitive paths, then cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let sanitized = BEARER_PATTERN.replace_all(&sanitized, "sk-***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .into_owned();

    if sanitized.len() > MAX_USER_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_USER_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(truncate_suffix);
    }

    sanitized
}

/// Result type for crew operations
pub type CrewResult<T> = Result<T, CrewError>;
