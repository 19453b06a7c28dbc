//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI itself and any endpoint exposing the same
//! `/chat/completions` and `/embeddings` API (Azure OpenAI gateways,
//! OpenRouter, vLLM, Ollama).
//!
//! Supports:
//! - Chat completions with tool use / function calling
//! - Embeddings
//! - Health checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use workroom_config::ProviderConfig;
use workroom_core::error::ProviderError;
use workroom_core::message::{Message, MessageToolCall, Role};
use workroom_core::provider::*;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> std::result::Result<Self, ProviderError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            Duration::from_secs(120),
        )
    }

    /// Build the provider described by the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> std::result::Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;
        let name = if config.api_url.contains("api.openai.com") {
            "openai"
        } else {
            "openai_compat"
        };
        Self::new(
            name,
            config.api_url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                // Assistant turns that only request tools carry no text.
                content: if m.role == Role::Assistant
                    && m.content.is_empty()
                    && !m.tool_calls.is_empty()
                {
                    None
                } else {
                    Some(m.content.clone())
                },
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;
        check_status(response).await
    }
}

/// Map non-success HTTP statuses onto provider errors.
async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

#[async_trait]
impl workroom_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self.post("chat/completions", &body).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("chat completion: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let message = Message {
            role: Role::Assistant,
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            tool_call_id: None,
        };

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self.post("embeddings", &body).await?;

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("embedding: {e}")))?;

        let mut data = api_resp.data;
        data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        if embeddings.len() != request.inputs.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                request.inputs.len(),
                embeddings.len()
            )));
        }

        let usage = api_resp.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model,
            usage,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
    usage: Option<EmbeddingApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use workroom_core::Provider;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider(base_url: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, "sk-test", Duration::from_secs(5)).unwrap()
    }

    fn request(tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4-turbo-preview".into(),
            messages: vec![Message::system("You are helpful"), Message::user("Hello")],
            temperature: 0.7,
            max_tokens: Some(2000),
            tools,
        }
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test").unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.base_url().contains("api.openai.com"));
    }

    #[test]
    fn from_config_requires_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            OpenAiCompatProvider::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));

        let config = ProviderConfig {
            api_key: Some("sk-test".into()),
            api_url: "http://localhost:11434/v1/".into(),
            ..ProviderConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai_compat");
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "get_campaign_status".into(),
            arguments: r#"{"campaign_code":"SMI-001"}"#.into(),
        }];
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert!(api_msgs[0].content.is_none());
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "get_campaign_status");
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = Message::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn request_body_offers_tools_only_when_present() {
        let body = OpenAiCompatProvider::request_body(&request(vec![]));
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert_eq!(body["max_tokens"], 2000);

        let body = OpenAiCompatProvider::request_body(&request(vec![ToolDefinition {
            name: "get_wip_summary".into(),
            description: "WIP".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]));
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_wip_summary");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn parse_embedding_response() {
        let data = r#"{
            "data": [
                {"embedding": [0.4, 0.5, 0.6], "index": 1},
                {"embedding": [0.1, 0.2, 0.3], "index": 0}
            ],
            "model": "text-embedding-ada-002",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1].index, 0);
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 8);
    }

    #[tokio::test]
    async fn complete_parses_tool_calls() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["tool_choice"], "auto");
                Json(serde_json::json!({
                    "model": "gpt-4-turbo-preview",
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_9",
                                "type": "function",
                                "function": {
                                    "name": "get_campaign_status",
                                    "arguments": "{\"campaign_code\":\"SMI-001\"}"
                                }
                            }]
                        }
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                }))
            }),
        );
        let base = serve(router).await;

        let tools = vec![ToolDefinition {
            name: "get_campaign_status".into(),
            description: "Get status and metrics for a specific campaign".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let response = provider(&base).complete(request(tools)).await.unwrap();
        assert_eq!(response.message.content, "");
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].id, "call_9");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn rate_limit_is_mapped() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down") }),
        );
        let base = serve(router).await;
        let err = provider(&base).complete(request(vec![])).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 7 }));
    }

    #[tokio::test]
    async fn auth_failure_is_mapped() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = serve(router).await;
        let err = provider(&base)
            .embed(EmbeddingRequest {
                model: "text-embedding-ada-002".into(),
                inputs: vec!["hi".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = serve(router).await;
        let err = provider(&base).complete(request(vec![])).await.unwrap_err();
        match err {
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn embed_orders_by_index() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                Json(serde_json::json!({
                    "data": [
                        {"embedding": [0.0, 1.0], "index": 1},
                        {"embedding": [1.0, 0.0], "index": 0}
                    ],
                    "model": "text-embedding-ada-002"
                }))
            }),
        );
        let base = serve(router).await;
        let response = provider(&base)
            .embed(EmbeddingRequest {
                model: "text-embedding-ada-002".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
