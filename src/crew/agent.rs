use serde::Serialize;

/// Default bound on LLM round trips per task
pub const DEFAULT_MAX_ITER: u32 = 15;

/// A named role configuration.
///
/// Immutable once the crew is built; each run constructs its own agents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Names of registry tools this agent may call
    pub tools: Vec<String>,
    pub allow_delegation: bool,
    pub max_iter: u32,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            allow_delegation: false,
            max_iter: DEFAULT_MAX_ITER,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// System prompt establishing the agent's persona
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }

    /// Case-insensitive role comparison, used when resolving coworkers
    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }
}
