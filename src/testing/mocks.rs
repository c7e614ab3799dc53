//! Mock implementations for testing
//!
//! Provides scripted LLM providers, tools, callback handlers, surfaces and
//! pipeline factories so crews and the dashboard can be tested without
//! network access.

use crate::callbacks::{CallbackEvent, CallbackHandler};
use crate::crew::{Pipeline, PipelineFactory, PipelineResult};
use crate::dashboard::{Notice, Surface};
use crate::error::{CrewError, CrewResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

const MOCK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

/// Mock LLM provider replaying a script of responses.
///
/// Once the script runs out the last response repeats. Every request is
/// recorded for later inspection.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<CompletionResponse>,
    pub current_response: Arc<Mutex<usize>>,
    pub recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses,
            ..Self::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// A final answer
    pub fn text(content: impl Into<String>) -> CompletionResponse {
        CompletionResponse {
            content: Some(content.into()),
            model: "mock-model".to_string(),
            usage: MOCK_USAGE,
            finish_reason: FinishReason::Stop,
            tool_calls: None,
        }
    }

    /// A response requesting a single tool call
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> CompletionResponse {
        let name = name.into();
        CompletionResponse {
            content: None,
            model: "mock-model".to_string(),
            usage: MOCK_USAGE,
            finish_reason: FinishReason::ToolCalls,
            tool_calls: Some(vec![ToolCall::new(format!("call_{name}"), name, arguments)]),
        }
    }

    /// A response requesting a tool call whose argument text is not JSON
    pub fn malformed_tool_call(name: impl Into<String>, raw_arguments: &str) -> CompletionResponse {
        let name = name.into();
        let error = serde_json::from_str::<Value>(raw_arguments)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        CompletionResponse {
            content: None,
            model: "mock-model".to_string(),
            usage: MOCK_USAGE,
            finish_reason: FinishReason::ToolCalls,
            tool_calls: Some(vec![ToolCall::malformed(
                format!("call_{name}"),
                name,
                raw_arguments,
                error,
            )]),
        }
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.recorded_requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.recorded_requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let index = (*current).min(self.responses.len().saturating_sub(1));
        *current += 1;

        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| LlmError::InvalidResponse("Mock script is empty".to_string()))
    }
}

/// Mock tool returning a fixed result for any `{"query": ...}` call
pub struct MockTool {
    name: String,
    result: Value,
    should_fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            result,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            ..Self::new(name, Value::Null)
        }
    }
}

#[async_trait]
impl Tool for MockTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: format!("Mock tool {}", self.name),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    async fn initialize(&mut self, _config: Option<&Value>) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ToolError::ExecutionError("Mock tool failure".to_string()));
        }
        Ok(self.result.clone())
    }
}

/// Callback handler that keeps every event it sees
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<CallbackEvent>,
}

impl RecordingHandler {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(CallbackEvent::name).collect()
    }
}

impl CallbackHandler for RecordingHandler {
    fn handle(&mut self, event: &CallbackEvent) -> CrewResult<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Surface that records every draw call
#[derive(Debug, Default)]
pub struct RecordingSurface {
    /// Full log text passed to each redraw
    pub logs: Vec<String>,
    pub results: Vec<String>,
    pub notices: Vec<Notice>,
}

impl Surface for RecordingSurface {
    fn render_log(&mut self, log: &str) {
        self.logs.push(log.to_string());
    }

    fn render_result(&mut self, result: &str) {
        self.results.push(result.to_string());
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// Pipeline factory producing pipelines that emit a fixed event script
pub struct MockPipelineFactory {
    events: Vec<CallbackEvent>,
    result: String,
    kickoff_error: Mutex<Option<CrewError>>,
    build_error: Mutex<Option<CrewError>>,
    builds: AtomicUsize,
}

impl MockPipelineFactory {
    /// Pipelines emit `events` and then return `result`
    pub fn succeeding(events: Vec<CallbackEvent>, result: impl Into<String>) -> Self {
        Self {
            events,
            result: result.into(),
            kickoff_error: Mutex::new(None),
            build_error: Mutex::new(None),
            builds: AtomicUsize::new(0),
        }
    }

    /// The first pipeline emits `events` and then fails with `error`
    pub fn failing(events: Vec<CallbackEvent>, error: CrewError) -> Self {
        Self {
            kickoff_error: Mutex::new(Some(error)),
            ..Self::succeeding(events, "")
        }
    }

    /// The first build fails with `error`
    pub fn build_error(error: CrewError) -> Self {
        Self {
            build_error: Mutex::new(Some(error)),
            ..Self::succeeding(Vec::new(), "")
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineFactory for MockPipelineFactory {
    async fn build(&self, _api_key: &str, _topic: &str) -> CrewResult<Box<dyn Pipeline>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.build_error.lock().await.take() {
            return Err(error);
        }

        Ok(Box::new(MockPipeline {
            events: self.events.clone(),
            result: self.result.clone(),
            error: Mutex::new(self.kickoff_error.lock().await.take()),
        }))
    }
}

struct MockPipeline {
    events: Vec<CallbackEvent>,
    result: String,
    error: Mutex<Option<CrewError>>,
}

#[async_trait]
impl Pipeline for MockPipeline {
    async fn kickoff(&self, callbacks: &mut dyn CallbackHandler) -> CrewResult<PipelineResult> {
        for event in &self.events {
            callbacks.handle(event)?;
        }

        match self.error.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(PipelineResult::Text(self.result.clone())),
        }
    }
}
