//! Tool system for crew agents
//!
//! Tools are registered by name, describe their parameters with JSON Schema,
//! and have their parameters validated before every execution.

use crate::config::ToolConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

pub mod builtin;

/// Tool interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON Schema of the parameters
    fn describe(&self) -> ToolDescription;

    /// Receives the tool's `config` table from the configuration file.
    /// Called once before the tool is registered.
    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError>;

    /// Receives parameters already validated against `describe().parameters`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool description offered to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of initialized tools available to a crew
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create and initialize every tool named in the configuration.
    ///
    /// Unknown tools and implementations are configuration errors.
    pub async fn initialize(
        &mut self,
        tool_configs: &HashMap<String, ToolConfig>,
    ) -> Result<(), ToolError> {
        for (tool_name, tool_config) in tool_configs {
            let mut tool = Self::create_tool(tool_name, tool_config)?;

            let config = match tool_config {
                ToolConfig::Simple(_) => None,
                ToolConfig::Complex { config, .. } => Some(
                    serde_json::to_value(config)
                        .map_err(|e| ToolError::InitializationError(e.to_string()))?,
                ),
            };

            // A tool that cannot start (usually a missing API key) is left out;
            // agents that list it run without it.
            if let Err(e) = tool.initialize(config.as_ref()).await {
                warn!(tool = %tool_name, error = %e, "Skipping tool that failed to initialize");
                continue;
            }
            debug!(tool = %tool_name, "Tool initialized");
            self.tools.insert(tool_name.clone(), tool);
        }

        Ok(())
    }

    /// Register an already initialized tool under its described name
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.describe().name;
        self.tools.insert(name, tool);
    }

    fn create_tool(tool_name: &str, config: &ToolConfig) -> Result<Box<dyn Tool>, ToolError> {
        let impl_name = match config {
            ToolConfig::Simple(impl_name) => impl_name,
            ToolConfig::Complex { implementation, .. } => implementation,
        };

        match impl_name.as_str() {
            "builtin" => Self::create_builtin_tool(tool_name),
            _ => Err(ToolError::UnknownImplementation(impl_name.clone())),
        }
    }

    fn create_builtin_tool(tool_name: &str) -> Result<Box<dyn Tool>, ToolError> {
        match tool_name {
            "web_search" => Ok(Box::new(builtin::WebSearchTool::new())),
            _ => Err(ToolError::UnknownTool(tool_name.to_string())),
        }
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    /// Get tool description
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        Self::validate_parameters(&tool.describe(), parameters)?;

        tool.execute(parameters).await
    }

    fn validate_parameters(
        description: &ToolDescription,
        parameters: &Value,
    ) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Names of registered tools, sorted
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unknown tool implementation: {0}")]
    UnknownImplementation(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

/// Render a tool result as the text the agent and the log see
pub fn render_tool_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
