//! Integration tests for the web_search tool against a mock Serper endpoint

use research_crew::config::ToolConfig;
use research_crew::tools::{ToolError, ToolRegistry};
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn registry_for(server: &MockServer, key_env: &str, max_results: u64) -> ToolRegistry {
    std::env::set_var(key_env, "serper-test-key");

    let mut config = HashMap::new();
    config.insert("api_key_env".to_string(), json!(key_env));
    config.insert("max_results".to_string(), json!(max_results));
    config.insert(
        "endpoint".to_string(),
        json!(format!("{}/search", server.uri())),
    );

    let mut tool_configs = HashMap::new();
    tool_configs.insert(
        "web_search".to_string(),
        ToolConfig::Complex {
            implementation: "builtin".to_string(),
            config,
        },
    );

    let mut registry = ToolRegistry::new();
    registry.initialize(&tool_configs).await.unwrap();
    registry
}

#[tokio::test]
async fn test_search_returns_normalized_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "serper-test-key"))
        .and(body_partial_json(json!({"q": "rust agents", "num": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                {"title": "One", "link": "https://one.example", "snippet": "first"},
                {"title": "Two", "link": "https://two.example"},
                {"title": "Three", "link": "https://three.example", "snippet": "third"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, "RESEARCH_CREW_TEST_SERPER_KEY_A", 2).await;
    assert!(registry.contains("web_search"));

    let result = registry
        .execute_tool("web_search", &json!({"query": "rust agents"}))
        .await
        .unwrap();

    assert_eq!(result["query"], "rust agents");
    let results = result["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["url"], "https://one.example");
    assert_eq!(results[1]["snippet"], "");
}

#[tokio::test]
async fn test_search_api_error_is_execution_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "RESEARCH_CREW_TEST_SERPER_KEY_B", 5).await;
    let result = registry
        .execute_tool("web_search", &json!({"query": "rust"}))
        .await;

    match result {
        Err(ToolError::ExecutionError(message)) => assert!(message.contains("403")),
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_search_rejects_unknown_parameters() {
    let server = MockServer::start().await;
    let registry = registry_for(&server, "RESEARCH_CREW_TEST_SERPER_KEY_C", 5).await;

    let result = registry
        .execute_tool("web_search", &json!({"query": "rust", "page": 2}))
        .await;

    assert!(matches!(result, Err(ToolError::ValidationError(_))));
}
