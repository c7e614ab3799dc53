//! Configuration for research crew runs
//!
//! Loaded from an optional TOML file. Every section has defaults so the
//! binary runs without any configuration file at all.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Providers the crew can talk to
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai"];

/// Searched in order when no configuration file is given explicitly
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["research-crew.toml", "config/research-crew.toml"];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default = "default_tools")]
    pub tools: HashMap<String, ToolConfig>,
    #[serde(default)]
    pub crew: CrewSection,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            tools: default_tools(),
            crew: CrewSection::default(),
        }
    }
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name; only "openai" is supported
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable consulted when no key is given on the command line
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API base URL (OpenAI-compatible)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional completion token cap
    pub max_tokens: Option<u32>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolConfig {
    /// Simple form: tool_name = "builtin"
    Simple(String),
    /// Complex form: tool_name = { impl = "builtin", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

fn default_tools() -> HashMap<String, ToolConfig> {
    let mut tools = HashMap::new();
    tools.insert(
        "web_search".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    tools
}

/// Crew execution limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewSection {
    /// Maximum LLM round trips per agent per task
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,
}

impl Default for CrewSection {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
        }
    }
}

fn default_max_iter() -> u32 {
    15
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CrewConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the explicit file if given, else the first default location that
    /// exists, else the built-in defaults. Returns the file actually used.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => DEFAULT_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists()),
        };

        match path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                let config = Self::load_from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => {
                info!("No configuration file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CrewConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and provider support
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::UnsupportedProvider(self.llm.provider.clone()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.crew.max_iter == 0 {
            return Err(ConfigError::InvalidConfig(
                "crew.max_iter must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Look up the API key in the configured environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[llm]
provider = "openai"
model = "gpt-4o"
api_key_env = "MY_OPENAI_KEY"
base_url = "http://localhost:8080/v1"
temperature = 0.2
max_tokens = 1024

[tools]
web_search = { impl = "builtin", config = { max_results = 5 } }

[crew]
max_iter = 4
"#;

        let config = CrewConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "MY_OPENAI_KEY");
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.max_tokens, Some(1024));
        assert_eq!(config.crew.max_iter, 4);
        assert!(matches!(
            config.tools.get("web_search"),
            Some(ToolConfig::Complex { .. })
        ));
    }

    #[test]
    fn test_discover_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[crew]\nmax_iter = 3\n").unwrap();

        let (config, used) = CrewConfig::discover(Some(file.path())).unwrap();
        assert_eq!(config.crew.max_iter, 3);
        assert_eq!(used.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_discover_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = CrewConfig::discover(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CrewConfig::from_toml_str("").unwrap();
        assert_eq!(config, CrewConfig::default());
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.crew.max_iter, 15);
        assert!(config.tools.contains_key("web_search"));
    }

    #[test]
    fn test_explicit_empty_tools_table_disables_search() {
        let config = CrewConfig::from_toml_str("[tools]\n").unwrap();
        assert!(config.tools.is_empty());
    }

    #[test]
    fn test_unsupported_provider_rejected() {
        let result = CrewConfig::from_toml_str("[llm]\nprovider = \"cohere\"\n");
        assert!(matches!(result, Err(ConfigError::UnsupportedProvider(p)) if p == "cohere"));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let result = CrewConfig::from_toml_str("[llm]\ntemperature = 3.5\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_max_iter_rejected() {
        let result = CrewConfig::from_toml_str("[crew]\nmax_iter = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_api_key_env() {
        let mut config = CrewConfig::default();
        config.llm.api_key_env = "RESEARCH_CREW_TEST_UNSET_KEY_VAR".to_string();
        assert!(matches!(
            config.get_llm_api_key(),
            Err(ConfigError::EnvVarNotFound(_))
        ));
    }
}
