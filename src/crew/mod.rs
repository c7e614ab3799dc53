//! Crew engine
//!
//! Agents, tasks, the per-agent tool loop and sequential crew execution.

pub mod agent;
pub mod executor;
pub mod orchestrator;
pub mod research;
pub mod task;

pub use agent::{Agent, DEFAULT_MAX_ITER};
pub use executor::{AgentExecutor, ExecutionOutput, LlmSettings, DELEGATE_TOOL};
pub use orchestrator::{Crew, CrewOutput, Pipeline, PipelineFactory, PipelineResult, TaskOutput};
pub use research::{research_crew, ResearchCrewFactory};
pub use task::{task_prompt, AgentRef, Task};
