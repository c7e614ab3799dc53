//! Terminal dashboard
//!
//! Collects the form input, runs one pipeline while streaming its events
//! into the log panel, and shows the result. [`Dashboard::start`] is the
//! only place a run's errors are turned into user-visible messages.

pub mod log_buffer;
pub mod surface;

pub use log_buffer::LogBuffer;
pub use surface::{Notice, Surface, TerminalSurface};

use crate::callbacks::{replay_transcript, LogAdapter, TranscriptRecorder};
use crate::config::CrewConfig;
use crate::crew::{PipelineFactory, PipelineResult};
use crate::error::{CrewError, CrewResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const MISSING_API_KEY: &str = "Please enter your OpenAI API key.";
pub const MISSING_TOPIC: &str = "Please enter a research topic.";
pub const RUN_COMPLETE: &str = "Research complete!";

/// First line of every run's log, drawn before any agent event arrives
pub const LOG_BANNER: &str = "SYSTEM_LOG_INIT: Waiting for agents...";

/// What the user typed into the form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    pub api_key: String,
    pub topic: String,
}

impl FormInput {
    pub fn new(api_key: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            topic: topic.into(),
        }
    }

    /// Fill the form from command-line values, falling back to the
    /// configured API key environment variable
    pub fn resolve(api_key: Option<String>, topic: Option<String>, config: &CrewConfig) -> Self {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| config.get_llm_api_key().ok())
            .unwrap_or_default();

        Self {
            api_key,
            topic: topic.unwrap_or_default(),
        }
    }
}

/// How a start request ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Required input was missing; nothing was run
    MissingInput,
    Completed(String),
    /// The message shown to the user
    Failed(String),
}

/// Owns the log buffer and the display surface for the session
pub struct Dashboard<S: Surface> {
    surface: S,
    log: LogBuffer,
    transcript: Option<PathBuf>,
}

impl<S: Surface> Dashboard<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            log: LogBuffer::new(),
            transcript: None,
        }
    }

    /// Record every event of subsequent runs to `path` as JSON lines
    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript = Some(path.into());
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn log(&self) -> &str {
        self.log.as_str()
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Handle the start action: validate the form, run the pipeline, show the outcome
    pub async fn start(&mut self, form: &FormInput, factory: &dyn PipelineFactory) -> RunOutcome {
        if form.api_key.trim().is_empty() {
            self.surface.notify(Notice::Warning(MISSING_API_KEY.to_string()));
            return RunOutcome::MissingInput;
        }
        if form.topic.trim().is_empty() {
            self.surface.notify(Notice::Warning(MISSING_TOPIC.to_string()));
            return RunOutcome::MissingInput;
        }

        self.begin_run();
        self.surface.notify(Notice::Status(format!(
            "Researching \"{}\"...",
            form.topic.trim()
        )));

        match self.run(form, factory).await {
            Ok(result) => {
                info!(output_length = result.output().len(), "Run completed");
                self.surface.render_result(result.output());
                self.surface.notify(Notice::Success(RUN_COMPLETE.to_string()));
                RunOutcome::Completed(result.output().to_string())
            }
            Err(e) => RunOutcome::Failed(self.report_error(&e)),
        }
    }

    async fn run(
        &mut self,
        form: &FormInput,
        factory: &dyn PipelineFactory,
    ) -> CrewResult<PipelineResult> {
        let pipeline = factory
            .build(form.api_key.trim(), form.topic.trim())
            .await?;

        let adapter = LogAdapter::new(&mut self.log, &mut self.surface);
        match &self.transcript {
            Some(path) => {
                let mut recorder = TranscriptRecorder::create(path, adapter)?;
                pipeline.kickoff(&mut recorder).await
            }
            None => {
                let mut adapter = adapter;
                pipeline.kickoff(&mut adapter).await
            }
        }
    }

    /// Re-render a recorded transcript into a fresh log
    pub fn replay(&mut self, path: &Path) -> CrewResult<usize> {
        self.begin_run();
        let file = File::open(path)?;
        let mut adapter = LogAdapter::new(&mut self.log, &mut self.surface);
        let count = replay_transcript(BufReader::new(file), &mut adapter)?;
        info!(path = %path.display(), events = count, "Transcript replayed");
        Ok(count)
    }

    /// Show an error once and return the message shown
    pub fn report_error(&mut self, e: &CrewError) -> String {
        error!(error = %e, "Run failed");
        let message = format!("An error occurred: {}", e.user_message());
        self.surface.notify(Notice::Error(message.clone()));
        message
    }

    fn begin_run(&mut self) {
        self.log.reset();
        self.log.append_line(LOG_BANNER);
        self.surface.render_log(self.log.as_str());
    }
}
