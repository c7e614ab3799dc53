//! Turns lifecycle events into lines of the dashboard log panel

use crate::callbacks::events::CallbackHandler;
use crate::dashboard::{LogBuffer, Surface};
use crate::error::CrewResult;
use serde_json::Value;
use std::borrow::Cow;

/// Tool outputs longer than this many characters are cut in the log
pub const TOOL_OUTPUT_PREVIEW_CHARS: usize = 200;

const THINKING_LINE: &str = "🤔 Thinking...";
const DONE_LINE: &str = "✨ Done!";

/// First [`TOOL_OUTPUT_PREVIEW_CHARS`] characters plus `...`, or the input unchanged
pub fn truncate_tool_output(output: &str) -> Cow<'_, str> {
    match output.char_indices().nth(TOOL_OUTPUT_PREVIEW_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &output[..cut])),
        None => Cow::Borrowed(output),
    }
}

/// Appends one formatted line per event and redraws the log panel after each.
///
/// Every event is appended; nothing is batched, dropped or deduplicated.
pub struct LogAdapter<'a> {
    buffer: &'a mut LogBuffer,
    surface: &'a mut dyn Surface,
}

impl<'a> LogAdapter<'a> {
    pub fn new(buffer: &'a mut LogBuffer, surface: &'a mut dyn Surface) -> Self {
        Self { buffer, surface }
    }

    fn append(&mut self, line: &str) -> CrewResult<()> {
        self.buffer.append_line(line);
        self.surface.render_log(self.buffer.as_str());
        Ok(())
    }
}

impl CallbackHandler for LogAdapter<'_> {
    fn on_llm_start(&mut self, _prompts: &[String]) -> CrewResult<()> {
        self.append(THINKING_LINE)
    }

    fn on_tool_start(&mut self, tool: &str, input: &str) -> CrewResult<()> {
        self.append(&format!("🔧 Using tool: {tool} with input: {input}"))
    }

    fn on_tool_end(&mut self, output: &str) -> CrewResult<()> {
        self.append(&format!("✅ Tool output: {}", truncate_tool_output(output)))
    }

    fn on_agent_action(&mut self, tool: &str, tool_input: &str, _log: &str) -> CrewResult<()> {
        self.append(&format!("🎯 Action: {tool} with input: {tool_input}"))
    }

    fn on_chain_end(&mut self, _outputs: &Value) -> CrewResult<()> {
        self.append(DONE_LINE)
    }
}
