//! The two-agent research pipeline
//!
//! A researcher gathers findings on the user's topic, then a writer turns
//! them into a blog post.

use crate::config::CrewConfig;
use crate::crew::agent::Agent;
use crate::crew::executor::LlmSettings;
use crate::crew::orchestrator::{Crew, Pipeline, PipelineFactory};
use crate::crew::task::{AgentRef, Task};
use crate::error::CrewResult;
use crate::llm::provider::LlmProvider;
use crate::llm::providers::{OpenAiConfig, OpenAiProvider};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub const RESEARCHER_ROLE: &str = "Senior Research Analyst";
pub const WRITER_ROLE: &str = "Tech Content Strategist";

/// Tool the researcher uses when it is available
pub const SEARCH_TOOL: &str = "web_search";

pub fn researcher(topic: &str) -> Agent {
    Agent::new(
        RESEARCHER_ROLE,
        format!("Uncover cutting-edge developments in {topic}"),
        "You work at a leading tech think tank. Your expertise lies in identifying \
         emerging trends. You have a knack for dissecting complex data and presenting \
         actionable insights.",
    )
    .with_tools([SEARCH_TOOL])
    .with_delegation(false)
}

pub fn writer(topic: &str) -> Agent {
    Agent::new(
        WRITER_ROLE,
        format!("Craft compelling content on {topic}"),
        "You are a renowned Content Strategist, known for your insightful and engaging \
         articles. You transform complex concepts into compelling narratives.",
    )
    .with_delegation(true)
}

pub fn research_task(topic: &str) -> Task {
    Task::new(
        format!(
            "Conduct a comprehensive analysis of the latest advancements in {topic}. \
             Identify key trends, breakthrough technologies, and potential industry impacts."
        ),
        "Full analysis report in bullet points",
        AgentRef(0),
    )
}

pub fn writing_task(topic: &str) -> Task {
    Task::new(
        format!(
            "Using the insights provided, develop an engaging blog post that highlights \
             the most significant advancements in {topic}. Your post should be informative \
             yet accessible, catering to a tech-savvy audience."
        ),
        "Full blog post of at least 4 paragraphs",
        AgentRef(1),
    )
}

/// Assemble the researcher/writer crew for `topic`.
///
/// The researcher only keeps tools that are actually registered.
pub fn research_crew(
    topic: &str,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    settings: LlmSettings,
    max_iter: u32,
) -> CrewResult<Crew> {
    let mut researcher = researcher(topic).with_max_iter(max_iter);
    researcher.tools.retain(|name| {
        let registered = tools.contains(name);
        if !registered {
            warn!(tool = %name, "Tool unavailable, researcher will work without it");
        }
        registered
    });
    let writer = writer(topic).with_max_iter(max_iter);

    Crew::new(
        vec![researcher, writer],
        vec![research_task(topic), writing_task(topic)],
        llm,
        tools,
        settings,
    )
}

/// Builds research crews backed by the configured OpenAI-compatible endpoint
pub struct ResearchCrewFactory {
    config: CrewConfig,
}

impl ResearchCrewFactory {
    pub fn new(config: CrewConfig) -> Self {
        Self { config }
    }

    fn settings(&self) -> LlmSettings {
        LlmSettings {
            model: self.config.llm.model.clone(),
            temperature: Some(self.config.llm.temperature),
            max_tokens: self.config.llm.max_tokens,
        }
    }
}

#[async_trait]
impl PipelineFactory for ResearchCrewFactory {
    async fn build(&self, api_key: &str, topic: &str) -> CrewResult<Box<dyn Pipeline>> {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: api_key.to_string(),
            base_url: self.config.llm.base_url.clone(),
            ..OpenAiConfig::default()
        })?;

        let mut registry = ToolRegistry::new();
        registry.initialize(&self.config.tools).await?;
        info!(
            model = %self.config.llm.model,
            tools = ?registry.list_tools(),
            "Research crew assembled"
        );

        let crew = research_crew(
            topic,
            Arc::new(provider),
            Arc::new(registry),
            self.settings(),
            self.config.crew.max_iter,
        )?;
        Ok(Box::new(crew))
    }
}
