//! Web search tool implementation
//!
//! Searches the web through the Serper API. This is the researcher agent's
//! only tool.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";
const DEFAULT_API_KEY_ENV: &str = "SERPER_API_KEY";

/// Web search tool using Serper API
pub struct WebSearchTool {
    client: Option<reqwest::Client>,
    api_key: Option<String>,
    endpoint: String,
    max_results: usize,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            client: None,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_results: 5,
        }
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_search_payload(query: &str, num_results: usize, max_results: usize) -> Value {
        json!({
            "q": query,
            "num": std::cmp::min(num_results, max_results),
            "gl": "us",
            "hl": "en"
        })
    }

    fn parse_search_response(search_result: &Value, num_results: usize) -> Vec<Value> {
        let Some(organic) = search_result.get("organic").and_then(|o| o.as_array()) else {
            return Vec::new();
        };

        organic
            .iter()
            .filter_map(|result| {
                let title = result.get("title").and_then(|t| t.as_str())?;
                let link = result.get("link").and_then(|l| l.as_str())?;
                let snippet = result.get("snippet").and_then(|s| s.as_str()).unwrap_or("");
                Some(json!({
                    "title": title,
                    "url": link,
                    "snippet": snippet
                }))
            })
            .take(num_results)
            .collect()
    }

    fn extract_num_results(parameters: &Value, max_results: usize) -> usize {
        parameters
            .get("num_results")
            .and_then(|n| n.as_u64())
            .map(|n| n as usize)
            .unwrap_or(max_results)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "web_search".to_string(),
            description: "Search the internet for current information about a query".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        let api_key_env = config
            .and_then(|c| c.get("api_key_env"))
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_API_KEY_ENV);

        self.api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty());
        if self.api_key.is_none() {
            return Err(ToolError::InitializationError(format!(
                "{api_key_env} environment variable not set"
            )));
        }

        if let Some(config) = config {
            if let Some(max_results) = config.get("max_results").and_then(|v| v.as_u64()) {
                self.max_results = max_results as usize;
            }
            if let Some(endpoint) = config.get("endpoint").and_then(|v| v.as_str()) {
                self.endpoint = endpoint.to_string();
            }
        }

        self.client = Some(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| ToolError::InitializationError(e.to_string()))?,
        );

        Ok(())
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ToolError::ExecutionError("Tool not initialized".to_string()))?;
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ToolError::ExecutionError("API key not configured".to_string()))?;

        let query = parameters["query"]
            .as_str()
            .ok_or_else(|| ToolError::ExecutionError("Query parameter is required".to_string()))?;
        let num_results = Self::extract_num_results(parameters, self.max_results);
        let payload = Self::build_search_payload(query, num_results, self.max_results);

        let response = client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolError::ExecutionError(format!(
                "Serper API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let search_result: Value = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to parse response: {e}")))?;

        Ok(json!({
            "query": query,
            "results": Self::parse_search_response(&search_result, num_results)
        }))
    }
}
