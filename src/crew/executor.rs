//! Agent execution loop
//!
//! One agent works one task: the model is called repeatedly, any requested
//! tools are run and their results fed back, until the model answers without
//! tool calls. Every step is reported to the run's callback handler.

use crate::callbacks::{CallbackEvent, CallbackHandler};
use crate::crew::agent::Agent;
use crate::crew::task::task_prompt;
use crate::error::{CrewError, CrewResult};
use crate::llm::provider::{
    CompletionRequest, LlmProvider, Message, MessageRole, TokenUsage, ToolCall,
};
use crate::tool_span;
use crate::tools::{render_tool_output, ToolDescription, ToolRegistry};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn, Instrument};

/// Name of the synthetic tool offered to delegating agents
pub const DELEGATE_TOOL: &str = "delegate_work";

const DELEGATED_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Model parameters shared by every agent of a crew
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Final answer of one agent on one task
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    pub output: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct DelegateArgs {
    coworker: String,
    task: String,
    #[serde(default)]
    context: Option<String>,
}

/// Runs a single agent against a task
pub struct AgentExecutor<'a> {
    agent: &'a Agent,
    llm: &'a dyn LlmProvider,
    tools: &'a ToolRegistry,
    settings: &'a LlmSettings,
    coworkers: Vec<&'a Agent>,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(
        agent: &'a Agent,
        llm: &'a dyn LlmProvider,
        tools: &'a ToolRegistry,
        settings: &'a LlmSettings,
    ) -> Self {
        Self {
            agent,
            llm,
            tools,
            settings,
            coworkers: Vec::new(),
        }
    }

    /// Agents this executor may delegate to; ignored unless the agent allows delegation
    pub fn with_coworkers(mut self, coworkers: Vec<&'a Agent>) -> Self {
        self.coworkers = coworkers;
        self
    }

    fn can_delegate(&self) -> bool {
        self.agent.allow_delegation && !self.coworkers.is_empty()
    }

    /// Tool descriptions offered to the model for this agent
    pub fn available_tools(&self) -> Vec<ToolDescription> {
        let mut tools: Vec<ToolDescription> = self
            .agent
            .tools
            .iter()
            .filter_map(|name| {
                let description = self.tools.describe_tool(name);
                if description.is_none() {
                    warn!(agent = %self.agent.role, tool = %name, "Agent tool is not registered");
                }
                description
            })
            .collect();

        if self.can_delegate() {
            tools.push(self.delegate_tool_description());
        }

        tools
    }

    fn delegate_tool_description(&self) -> ToolDescription {
        let roles: Vec<&str> = self.coworkers.iter().map(|a| a.role.as_str()).collect();
        ToolDescription {
            name: DELEGATE_TOOL.to_string(),
            description: format!(
                "Delegate a specific task to one of the following coworkers: {}. \
                 Provide the coworker's exact role, the task, and all the context they need, \
                 since they know nothing about your work.",
                roles.join(", ")
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "coworker": {"type": "string", "enum": roles},
                    "task": {"type": "string"},
                    "context": {"type": "string"}
                },
                "required": ["coworker", "task", "context"],
                "additionalProperties": false
            }),
        }
    }

    /// Work the task until the model produces a final answer
    pub async fn execute(
        &self,
        description: &str,
        expected_output: &str,
        context: Option<&str>,
        callbacks: &mut dyn CallbackHandler,
    ) -> CrewResult<ExecutionOutput> {
        let available_tools = self.available_tools();
        let mut messages = vec![
            Message::system(self.system_prompt()),
            Message::user(task_prompt(description, expected_output, context)),
        ];
        let mut usage = TokenUsage::default();

        for iteration in 1..=self.agent.max_iter {
            callbacks.handle(&CallbackEvent::LlmStart {
                prompts: vec![render_prompt(&messages)],
            })?;

            let response = self
                .llm
                .complete(self.completion_request(&messages, &available_tools))
                .await?;
            usage.add(&response.usage);

            if let Some(content) = response.content.as_ref().filter(|c| !c.is_empty()) {
                messages.push(Message::assistant(content.clone()));
            }

            let Some(tool_calls) = response.requested_tool_calls() else {
                let output = response.content.clone().unwrap_or_default();
                info!(
                    agent = %self.agent.role,
                    iterations = iteration,
                    output_length = output.len(),
                    "Agent produced final answer"
                );
                callbacks.handle(&CallbackEvent::ChainEnd {
                    outputs: json!({ "output": output }),
                })?;
                return Ok(ExecutionOutput { output, usage });
            };

            debug!(
                agent = %self.agent.role,
                iteration = iteration,
                tool_count = tool_calls.len(),
                "Processing tool calls"
            );

            let mut tool_results = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                let output = self
                    .run_tool_call(call, callbacks, &mut usage)
                    .instrument(tool_span!(agent = %self.agent.role, tool = %call.name))
                    .await?;
                tool_results.push(format!("Tool {} returned: {}", call.name, output));
            }
            messages.push(Message::user(format!(
                "Tool results:\n{}",
                tool_results.join("\n")
            )));
        }

        Err(CrewError::iteration_limit(
            self.agent.role.clone(),
            self.agent.max_iter,
        ))
    }

    fn system_prompt(&self) -> String {
        let now = chrono::Utc::now();
        format!(
            "{}\n\nCurrent date and time: {} UTC",
            self.agent.system_prompt(),
            now.format("%Y-%m-%d %H:%M:%S")
        )
    }

    fn completion_request(
        &self,
        messages: &[Message],
        available_tools: &[ToolDescription],
    ) -> CompletionRequest {
        CompletionRequest {
            messages: messages.to_vec(),
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: if available_tools.is_empty() {
                None
            } else {
                Some(available_tools.to_vec())
            },
        }
    }

    /// Run one requested tool; tool failures become the tool's output text
    async fn run_tool_call(
        &self,
        call: &ToolCall,
        callbacks: &mut dyn CallbackHandler,
        usage: &mut TokenUsage,
    ) -> CrewResult<String> {
        let tool_input = call.input_text();
        callbacks.handle(&CallbackEvent::AgentAction {
            tool: call.name.clone(),
            tool_input: tool_input.clone(),
            log: format!("Invoking `{}` with `{}`", call.name, tool_input),
        })?;
        callbacks.handle(&CallbackEvent::ToolStart {
            tool: call.name.clone(),
            input: tool_input,
        })?;

        let output = if let Some(error) = &call.argument_error {
            warn!(
                agent = %self.agent.role,
                tool = %call.name,
                "Model sent malformed tool arguments"
            );
            format!("Tool {} failed: invalid arguments: {}", call.name, error)
        } else if call.name == DELEGATE_TOOL && self.can_delegate() {
            match serde_json::from_value::<DelegateArgs>(call.arguments.clone()) {
                Ok(args) => {
                    let delegated = self.delegate(args, callbacks).await?;
                    usage.add(&delegated.usage);
                    delegated.output
                }
                Err(e) => format!("Tool {DELEGATE_TOOL} failed: invalid arguments: {e}"),
            }
        } else if !self.agent.tools.iter().any(|t| t == &call.name) {
            warn!(agent = %self.agent.role, tool = %call.name, "Model requested unavailable tool");
            format!(
                "Tool {} is not available to {}. Available tools: {}",
                call.name,
                self.agent.role,
                self.agent.tools.join(", ")
            )
        } else {
            match self.tools.execute_tool(&call.name, &call.arguments).await {
                Ok(value) => render_tool_output(&value),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                    format!("Tool {} failed: {}", call.name, e)
                }
            }
        };

        callbacks.handle(&CallbackEvent::ToolEnd {
            output: output.clone(),
        })?;
        Ok(output)
    }

    /// Hand a sub-task to a coworker, who may not delegate further
    fn delegate<'b>(
        &'b self,
        args: DelegateArgs,
        callbacks: &'b mut dyn CallbackHandler,
    ) -> BoxFuture<'b, CrewResult<ExecutionOutput>> {
        Box::pin(async move {
            let Some(coworker) = self
                .coworkers
                .iter()
                .copied()
                .find(|agent| agent.has_role(&args.coworker))
            else {
                let roles: Vec<&str> = self.coworkers.iter().map(|a| a.role.as_str()).collect();
                return Ok(ExecutionOutput {
                    output: format!(
                        "Tool {DELEGATE_TOOL} failed: unknown coworker '{}'. Choose one of: {}",
                        args.coworker,
                        roles.join(", ")
                    ),
                    usage: TokenUsage::default(),
                });
            };

            info!(
                from = %self.agent.role,
                to = %coworker.role,
                "Delegating work to coworker"
            );

            let executor = AgentExecutor::new(coworker, self.llm, self.tools, self.settings);
            executor
                .execute(
                    &args.task,
                    DELEGATED_EXPECTED_OUTPUT,
                    args.context.as_deref(),
                    callbacks,
                )
                .await
        })
    }
}

/// Flatten a conversation into the single prompt string reported on `llm_start`
fn render_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let label = match m.role {
                MessageRole::System => "System",
                MessageRole::User => "Human",
                MessageRole::Assistant => "AI",
            };
            format!("{label}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{MockLlmProvider, MockTool, RecordingHandler};

    fn settings() -> LlmSettings {
        LlmSettings {
            model: "mock-model".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }

    fn researcher() -> Agent {
        Agent::new("Researcher", "Find facts", "Curious.").with_tools(["lookup"])
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(MockTool::new("lookup", json!("fact A"))));
        registry
    }

    #[tokio::test]
    async fn test_final_answer_without_tools() {
        let agent = Agent::new("Writer", "Write", "Wordsmith.");
        let llm = MockLlmProvider::new(vec![MockLlmProvider::text("A finished post")]);
        let tools = ToolRegistry::new();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Write a post", "A post", None, &mut handler)
            .await
            .unwrap();

        assert_eq!(result.output, "A finished post");
        assert_eq!(result.usage.total_tokens, 15);
        assert_eq!(handler.event_names(), vec!["llm_start", "chain_end"]);
    }

    #[tokio::test]
    async fn test_tool_call_event_order_and_result_feedback() {
        let agent = researcher();
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::tool_call("lookup", json!({"query": "rust"})),
            MockLlmProvider::text("Report based on fact A"),
        ]);
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Research rust", "Report", None, &mut handler)
            .await
            .unwrap();

        assert_eq!(result.output, "Report based on fact A");
        assert_eq!(
            handler.event_names(),
            vec![
                "llm_start",
                "agent_action",
                "tool_start",
                "tool_end",
                "llm_start",
                "chain_end"
            ]
        );
        assert_eq!(
            handler.events[3],
            CallbackEvent::ToolEnd {
                output: "fact A".to_string()
            }
        );

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert!(last.content.contains("Tool lookup returned: fact A"));
        assert_eq!(requests[0].tools.as_ref().unwrap()[0].name, "lookup");
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back_not_fatal() {
        let agent = researcher();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MockTool::failing("lookup")));
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::tool_call("lookup", json!({"query": "rust"})),
            MockLlmProvider::text("Could not search"),
        ]);
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Research", "Report", None, &mut handler)
            .await
            .unwrap();

        assert_eq!(result.output, "Could not search");
        match &handler.events[3] {
            CallbackEvent::ToolEnd { output } => assert!(output.starts_with("Tool lookup failed")),
            other => panic!("expected tool_end, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_reported_to_model() {
        let agent = researcher();
        let lookup = MockTool::new("lookup", json!("fact A"));
        let calls = lookup.calls.clone();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(lookup));
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::malformed_tool_call("lookup", "{\"query\": \"rust"),
            MockLlmProvider::text("Retried without the tool"),
        ]);
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Research", "Report", None, &mut handler)
            .await
            .unwrap();

        assert_eq!(result.output, "Retried without the tool");
        assert_eq!(
            handler.event_names(),
            vec![
                "llm_start",
                "agent_action",
                "tool_start",
                "tool_end",
                "llm_start",
                "chain_end"
            ]
        );
        assert_eq!(
            handler.events[2],
            CallbackEvent::ToolStart {
                tool: "lookup".to_string(),
                input: "{\"query\": \"rust".to_string()
            }
        );
        match &handler.events[3] {
            CallbackEvent::ToolEnd { output } => {
                assert!(output.starts_with("Tool lookup failed: invalid arguments:"))
            }
            other => panic!("expected tool_end, got {other:?}"),
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let requests = llm.requests().await;
        let feedback = &requests[1].messages.last().unwrap().content;
        assert!(feedback.contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_unassigned_tool_is_refused() {
        let agent = Agent::new("Writer", "Write", "Wordsmith.");
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::tool_call("lookup", json!({"query": "rust"})),
            MockLlmProvider::text("ok"),
        ]);
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Write", "Post", None, &mut handler)
            .await
            .unwrap();

        match &handler.events[3] {
            CallbackEvent::ToolEnd { output } => assert!(output.contains("is not available")),
            other => panic!("expected tool_end, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let agent = researcher().with_max_iter(2);
        let llm = MockLlmProvider::new(vec![MockLlmProvider::tool_call(
            "lookup",
            json!({"query": "again"}),
        )]);
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Loop", "Never", None, &mut handler)
            .await;

        assert!(matches!(
            result,
            Err(CrewError::IterationLimit { max: 2, .. })
        ));
        assert!(!handler.event_names().contains(&"chain_end"));
    }

    #[tokio::test]
    async fn test_llm_failure_aborts() {
        let agent = researcher();
        let llm = MockLlmProvider::with_failure();
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let result = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .execute("Research", "Report", None, &mut handler)
            .await;

        assert!(matches!(result, Err(CrewError::Llm(_))));
        assert_eq!(handler.event_names(), vec!["llm_start"]);
    }

    #[tokio::test]
    async fn test_delegation_runs_coworker() {
        let writer = Agent::new("Writer", "Write", "Wordsmith.").with_delegation(true);
        let analyst = researcher();
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::tool_call(
                DELEGATE_TOOL,
                json!({"coworker": "researcher", "task": "Check a fact", "context": "blog"}),
            ),
            MockLlmProvider::text("Fact checked"),
            MockLlmProvider::text("Post with checked fact"),
        ]);
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        let executor = AgentExecutor::new(&writer, &llm, &tools, &settings)
            .with_coworkers(vec![&analyst]);
        assert!(executor
            .available_tools()
            .iter()
            .any(|t| t.name == DELEGATE_TOOL));

        let result = executor
            .execute("Write", "Post", None, &mut handler)
            .await
            .unwrap();

        assert_eq!(result.output, "Post with checked fact");
        assert_eq!(result.usage.total_tokens, 45);
        assert_eq!(
            handler.event_names(),
            vec![
                "llm_start",
                "agent_action",
                "tool_start",
                "llm_start",
                "chain_end",
                "tool_end",
                "llm_start",
                "chain_end"
            ]
        );

        let requests = llm.requests().await;
        assert!(requests[1].messages[0].content.starts_with("You are Researcher."));
    }

    #[tokio::test]
    async fn test_delegation_to_unknown_coworker_reports_choices() {
        let writer = Agent::new("Writer", "Write", "Wordsmith.").with_delegation(true);
        let analyst = researcher();
        let llm = MockLlmProvider::new(vec![
            MockLlmProvider::tool_call(
                DELEGATE_TOOL,
                json!({"coworker": "Editor", "task": "Edit", "context": ""}),
            ),
            MockLlmProvider::text("Done alone"),
        ]);
        let tools = registry();
        let settings = settings();
        let mut handler = RecordingHandler::default();

        AgentExecutor::new(&writer, &llm, &tools, &settings)
            .with_coworkers(vec![&analyst])
            .execute("Write", "Post", None, &mut handler)
            .await
            .unwrap();

        match &handler.events[3] {
            CallbackEvent::ToolEnd { output } => {
                assert!(output.contains("unknown coworker 'Editor'"));
                assert!(output.contains("Researcher"));
            }
            other => panic!("expected tool_end, got {other:?}"),
        }
    }

    #[test]
    fn test_no_delegate_tool_without_coworkers() {
        let writer = Agent::new("Writer", "Write", "Wordsmith.").with_delegation(true);
        let llm = MockLlmProvider::new(vec![]);
        let tools = ToolRegistry::new();
        let settings = settings();

        let executor = AgentExecutor::new(&writer, &llm, &tools, &settings);
        assert!(executor.available_tools().is_empty());
    }

    #[test]
    fn test_render_prompt_labels() {
        let rendered = render_prompt(&[Message::system("sys"), Message::user("task")]);
        assert_eq!(rendered, "System: sys\nHuman: task");
    }
}
