//! Sequential crew execution
//!
//! Tasks run strictly in order. Each task sees the outputs of every earlier
//! task as context; the last task's output is the crew's output.

use crate::callbacks::CallbackHandler;
use crate::crew::agent::Agent;
use crate::crew::executor::{AgentExecutor, LlmSettings};
use crate::crew::task::Task;
use crate::error::{CrewError, CrewResult};
use crate::llm::provider::{LlmProvider, TokenUsage};
use crate::tools::ToolRegistry;
use crate::{run_span, task_span};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Output of one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutput {
    pub description: String,
    /// Role of the agent that produced the output
    pub agent: String,
    pub output: String,
}

/// Record returned by a crew run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrewOutput {
    pub output: String,
    pub tasks_output: Vec<TaskOutput>,
    pub token_usage: TokenUsage,
}

/// Final value of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    Text(String),
    Record(CrewOutput),
}

impl PipelineResult {
    /// The displayable final text, whichever shape the result has
    pub fn output(&self) -> &str {
        match self {
            PipelineResult::Text(text) => text,
            PipelineResult::Record(record) => &record.output,
        }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output())
    }
}

/// Something that can be run once, reporting progress to a callback handler
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn kickoff(&self, callbacks: &mut dyn CallbackHandler) -> CrewResult<PipelineResult>;
}

/// Builds a pipeline for one run from the user's credential and topic
#[async_trait]
pub trait PipelineFactory: Send + Sync {
    async fn build(&self, api_key: &str, topic: &str) -> CrewResult<Box<dyn Pipeline>>;
}

/// A fixed set of agents working a fixed list of tasks in order
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    settings: LlmSettings,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("agents", &self.agents)
            .field("tasks", &self.tasks)
            .field("llm", &self.llm.name())
            .field("tools", &self.tools.list_tools())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Crew {
    /// Assemble a crew; every task must reference an agent of the crew
    pub fn new(
        agents: Vec<Agent>,
        tasks: Vec<Task>,
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        settings: LlmSettings,
    ) -> CrewResult<Self> {
        if tasks.is_empty() {
            return Err(CrewError::invalid_input("A crew needs at least one task"));
        }

        if let Some(task) = tasks.iter().find(|t| t.agent.0 >= agents.len()) {
            return Err(CrewError::invalid_input(format!(
                "Task '{}' is assigned to agent #{}, but the crew has {} agents",
                task.description,
                task.agent.0,
                agents.len()
            )));
        }

        Ok(Self {
            agents,
            tasks,
            llm,
            tools,
            settings,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run every task in order and return the combined record
    pub async fn kickoff(&self, callbacks: &mut dyn CallbackHandler) -> CrewResult<CrewOutput> {
        let run_id = Uuid::new_v4();
        let span = run_span!(run_id = %run_id, task_count = self.tasks.len());
        self.run_tasks(callbacks).instrument(span).await
    }

    async fn run_tasks(&self, callbacks: &mut dyn CallbackHandler) -> CrewResult<CrewOutput> {
        info!(
            agents = self.agents.len(),
            tasks = self.tasks.len(),
            model = %self.settings.model,
            "Crew run starting"
        );

        let mut tasks_output: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());
        let mut token_usage = TokenUsage::default();

        for (index, task) in self.tasks.iter().enumerate() {
            let agent = &self.agents[task.agent.0];
            let coworkers: Vec<&Agent> = self
                .agents
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != task.agent.0)
                .map(|(_, a)| a)
                .collect();

            let context = join_context(&tasks_output);
            let executor = AgentExecutor::new(agent, self.llm.as_ref(), &self.tools, &self.settings)
                .with_coworkers(coworkers);

            let result = executor
                .execute(
                    &task.description,
                    &task.expected_output,
                    context.as_deref(),
                    callbacks,
                )
                .instrument(task_span!(task_index = index, agent = %agent.role))
                .await?;

            token_usage.add(&result.usage);
            info!(
                task_index = index,
                agent = %agent.role,
                output_length = result.output.len(),
                "Task completed"
            );
            tasks_output.push(TaskOutput {
                description: task.description.clone(),
                agent: agent.role.clone(),
                output: result.output,
            });
        }

        let output = tasks_output
            .last()
            .map(|t| t.output.clone())
            .unwrap_or_default();

        info!(total_tokens = token_usage.total_tokens, "Crew run finished");

        Ok(CrewOutput {
            output,
            tasks_output,
            token_usage,
        })
    }
}

#[async_trait]
impl Pipeline for Crew {
    async fn kickoff(&self, callbacks: &mut dyn CallbackHandler) -> CrewResult<PipelineResult> {
        Crew::kickoff(self, callbacks)
            .await
            .map(PipelineResult::Record)
    }
}

/// Earlier task outputs joined into one context block
fn join_context(outputs: &[TaskOutput]) -> Option<String> {
    if outputs.is_empty() {
        return None;
    }
    Some(
        outputs
            .iter()
            .map(|t| t.output.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}
