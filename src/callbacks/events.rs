use crate::error::{CrewError, CrewResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named lifecycle notification emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallbackEvent {
    /// An LLM call is about to be made with these rendered prompts
    LlmStart { prompts: Vec<String> },
    /// A tool is about to run
    ToolStart { tool: String, input: String },
    /// A tool finished; `output` is the full, untruncated result text
    ToolEnd { output: String },
    /// The agent decided to call a tool
    AgentAction {
        tool: String,
        tool_input: String,
        log: String,
    },
    /// An agent finished its task
    ChainEnd { outputs: Value },
}

impl CallbackEvent {
    /// Short event name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            CallbackEvent::LlmStart { .. } => "llm_start",
            CallbackEvent::ToolStart { .. } => "tool_start",
            CallbackEvent::ToolEnd { .. } => "tool_end",
            CallbackEvent::AgentAction { .. } => "agent_action",
            CallbackEvent::ChainEnd { .. } => "chain_end",
        }
    }

    /// Decode an event from its JSON form; missing fields are fatal
    pub fn from_json(line: &str) -> CrewResult<Self> {
        serde_json::from_str(line).map_err(|e| CrewError::MalformedEvent(e.to_string()))
    }
}

/// Receiver of lifecycle events.
///
/// Implementors either override the typed `on_*` hooks, or override
/// [`CallbackHandler::handle`] to see every event whole. An error returned from
/// any hook aborts the run.
pub trait CallbackHandler: Send {
    fn handle(&mut self, event: &CallbackEvent) -> CrewResult<()> {
        match event {
            CallbackEvent::LlmStart { prompts } => self.on_llm_start(prompts),
            CallbackEvent::ToolStart { tool, input } => self.on_tool_start(tool, input),
            CallbackEvent::ToolEnd { output } => self.on_tool_end(output),
            CallbackEvent::AgentAction {
                tool,
                tool_input,
                log,
            } => self.on_agent_action(tool, tool_input, log),
            CallbackEvent::ChainEnd { outputs } => self.on_chain_end(outputs),
        }
    }

    fn on_llm_start(&mut self, _prompts: &[String]) -> CrewResult<()> {
        Ok(())
    }

    fn on_tool_start(&mut self, _tool: &str, _input: &str) -> CrewResult<()> {
        Ok(())
    }

    fn on_tool_end(&mut self, _output: &str) -> CrewResult<()> {
        Ok(())
    }

    fn on_agent_action(&mut self, _tool: &str, _tool_input: &str, _log: &str) -> CrewResult<()> {
        Ok(())
    }

    fn on_chain_end(&mut self, _outputs: &Value) -> CrewResult<()> {
        Ok(())
    }
}

/// Handler that ignores everything
pub struct NoOpHandler;

impl CallbackHandler for NoOpHandler {}
