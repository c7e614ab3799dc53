use serde::Serialize;

/// Index of an agent within its crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentRef(pub usize);

/// A unit of work assigned to one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: AgentRef,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: AgentRef,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
        }
    }
}

/// User prompt for a task, with earlier task outputs appended as context
pub fn task_prompt(description: &str, expected_output: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {description}\n\n\
         This is the expected criteria for your final answer: {expected_output}\n\
         You MUST return the actual complete content as the final answer, not a summary."
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }

    prompt
}
