//! OpenAI provider implementation
//!
//! Chat completions against any OpenAI-compatible endpoint, with function
//! tools and a short retry ladder for transient failures.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, TokenUsage, ToolCall as ProviderToolCall,
};
use crate::tools::ToolDescription;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn convert_to_openai_request(
        request: &CompletionRequest,
        messages: Vec<OpenAiMessage>,
        tools: Option<Vec<OpenAiTool>>,
    ) -> OpenAiCompletionRequest {
        OpenAiCompletionRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
        }
    }

    fn parse_completion_response(
        openai_response: OpenAiCompletionResponse,
    ) -> Result<CompletionResponse, LlmError> {
        let choice = openai_response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from OpenAI".to_string())
        })?;

        let usage = openai_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| Self::extract_tool_calls(calls));

        Ok(CompletionResponse {
            content: choice.message.content,
            model: openai_response.model,
            usage,
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
            tool_calls,
        })
    }

    /// Calls with unparseable arguments are kept so the executor can report them to the model
    fn extract_tool_calls(calls: &[OpenAiToolCall]) -> Vec<ProviderToolCall> {
        calls
            .iter()
            .map(|call| {
                match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
                    Ok(args) => ProviderToolCall::new(&call.id, &call.function.name, args),
                    Err(e) => {
                        warn!(
                            tool = %call.function.name,
                            error = %e,
                            "Tool call arguments are not valid JSON"
                        );
                        ProviderToolCall::malformed(
                            &call.id,
                            &call.function.name,
                            &call.function.arguments,
                            e.to_string(),
                        )
                    }
                }
            })
            .collect()
    }

    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    fn convert_message(message: &Message) -> OpenAiMessage {
        OpenAiMessage {
            role: match message.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: Some(message.content.clone()),
            tool_calls: None,
        }
    }

    fn convert_tool(tool_desc: &ToolDescription) -> OpenAiTool {
        OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: tool_desc.name.clone(),
                description: tool_desc.description.clone(),
                parameters: tool_desc.parameters.clone(),
            },
        }
    }

    /// Only network failures and 5xx responses are worth another attempt
    fn should_retry(error: &LlmError) -> bool {
        matches!(error, LlmError::NetworkError(_) | LlmError::ServerError(_))
    }

    fn classify_client_error(status: StatusCode, body: String) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("OpenAI API error: {status} - {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("OpenAI API error: {status} - {body}"))
            }
            _ => LlmError::ApiError(format!("OpenAI API error: {status} - {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let openai_messages: Vec<OpenAiMessage> =
            request.messages.iter().map(Self::convert_message).collect();

        let tools = request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(Self::convert_tool).collect());

        debug!(
            model = %request.model,
            messages = openai_messages.len(),
            "OpenAI request"
        );

        let openai_request = Self::convert_to_openai_request(&request, openai_messages, tools);
        self.complete_with_retry(&openai_request).await
    }
}

impl OpenAiProvider {
    async fn complete_with_retry(
        &self,
        openai_request: &OpenAiCompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!("OpenAI retry attempt {} after {}ms delay", attempt, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.make_api_request(openai_request).await {
                Ok(openai_response) => {
                    let response = Self::parse_completion_response(openai_response)?;
                    debug!(
                        total_tokens = response.usage.total_tokens,
                        finish_reason = ?response.finish_reason,
                        tool_calls = response.tool_calls.as_ref().map(|tc| tc.len()).unwrap_or(0),
                        "OpenAI response"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!("OpenAI request attempt {} failed: {}", attempt + 1, e);
                    if !Self::should_retry(&e) {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("OpenAI request failed after all retries");
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    async fn make_api_request(
        &self,
        openai_request: &OpenAiCompletionRequest,
    ) -> Result<OpenAiCompletionResponse, LlmError> {
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(openai_request)
            .send()
            .await
            .map_err(|e| {
                LlmError::NetworkError(format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                ))
            })?;

        let status = response.status();

        if status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ServerError(format!(
                "OpenAI API error: {status} - {error_text}"
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_client_error(status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct OpenAiCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation_without_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_provider_creation_with_blank_api_key() {
        let config = OpenAiConfig {
            api_key: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            OpenAiProvider::new(config),
            Err(LlmError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_provider_name() {
        let config = OpenAiConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_finish_reason_conversion() {
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("stop")),
            FinishReason::Stop
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("tool_calls")),
            FinishReason::ToolCalls
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(None),
            FinishReason::Error
        );
    }

    #[test]
    fn test_malformed_tool_arguments_are_kept() {
        let calls = vec![
            OpenAiToolCall {
                id: "call_1".to_string(),
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name: "web_search".to_string(),
                    arguments: "{\"query\": \"rust\"}".to_string(),
                },
            },
            OpenAiToolCall {
                id: "call_2".to_string(),
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name: "web_search".to_string(),
                    arguments: "{not json".to_string(),
                },
            },
        ];

        let extracted = OpenAiProvider::extract_tool_calls(&calls);
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].arguments["query"], "rust");
        assert!(extracted[0].argument_error.is_none());
        assert_eq!(extracted[1].id, "call_2");
        assert_eq!(extracted[1].input_text(), "{not json");
        assert!(extracted[1].argument_error.is_some());
    }

    #[test]
    fn test_only_network_and_server_errors_retry() {
        assert!(OpenAiProvider::should_retry(&LlmError::NetworkError(
            "reset".to_string()
        )));
        assert!(OpenAiProvider::should_retry(&LlmError::ServerError(
            "503".to_string()
        )));
        assert!(!OpenAiProvider::should_retry(
            &OpenAiProvider::classify_client_error(
                StatusCode::BAD_REQUEST,
                "upstream server error in tokenizer".to_string(),
            )
        ));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(matches!(
            OpenAiProvider::classify_client_error(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiProvider::classify_client_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            OpenAiProvider::classify_client_error(StatusCode::BAD_REQUEST, String::new()),
            LlmError::ApiError(_)
        ));
    }

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let request = OpenAiCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![OpenAiProvider::convert_message(&Message::user("Hello"))],
            max_tokens: None,
            temperature: Some(0.7),
            tools: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"gpt-4o-mini\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("tools"));
    }
}
