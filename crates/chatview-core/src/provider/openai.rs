//! OpenAI-compatible client for chat completions and image generation.
//!
//! Talks to `{base_url}/v1/chat/completions`, `{base_url}/v1/images/generations`
//! and `{base_url}/v1/models`.  Any server speaking the OpenAI REST format works,
//! so `base_url` can point at a local proxy as well as `api.openai.com`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AiProvider, CompletionRequest};
use crate::error::ProviderError;
use crate::settings::ApiKey;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

// ── Wire types ───────────────────────────────────────────────────────────────

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_owned(),
            content: content.into(),
        }
    }
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Assistant message as returned upstream.  `content` is `null` for
/// refusals, content-filter stops and tool-call turns.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ReplyMessage,
}

/// Response body for `POST /v1/chat/completions`; only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Request body for `POST /v1/images/generations`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub n: u32,
    pub size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// `{"error": {"message": "..."}}` as returned on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Tunables for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub chat_model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub image_size: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            chat_model: "gpt-3.5-turbo".to_owned(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1000,
            image_size: "512x512".to_owned(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Build the upstream message list: system prompt, history, then the prompt.
    pub fn build_messages(&self, request: &CompletionRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = self.config.system_prompt.as_deref() {
            messages.push(ChatMessage::new("system", system));
        }
        for turn in &request.history {
            let role = if turn.ai { "assistant" } else { "user" };
            messages.push(ChatMessage::new(role, turn.text.as_str()));
        }
        messages.push(ChatMessage::new("user", request.prompt.as_str()));
        messages
    }
}

/// Turn a non-2xx response into [`ProviderError::Api`], preferring the
/// upstream `error.message` over the raw body.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_owned()
            } else {
                body
            }
        });
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: &ApiKey,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.config.chat_model.clone(),
            messages: self.build_messages(request),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        debug!(model = %body.model, history = request.history.len(), prompt_len = request.prompt.len(), "chat completion request");

        let resp = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;
        let parsed: ChatCompletionResponse = check_status(resp).await?.json().await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(ProviderError::EmptyResponse("no completion choices"))?;

        info!(model = %self.config.chat_model, output_len = content.len(), "chat completion done");
        Ok(content)
    }

    async fn generate_image(&self, prompt: &str, api_key: &ApiKey) -> Result<String, ProviderError> {
        let body = ImageGenerationRequest {
            prompt: prompt.to_owned(),
            n: 1,
            size: self.config.image_size.clone(),
        };
        debug!(size = %body.size, prompt_len = prompt.len(), "image generation request");

        let resp = self
            .http
            .post(self.endpoint("images/generations"))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;
        let parsed: ImageGenerationResponse = check_status(resp).await?.json().await?;

        let url = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or(ProviderError::EmptyResponse("no image url"))?;

        info!("image generation done");
        Ok(url)
    }

    async fn verify_key(&self, api_key: &ApiKey) -> Result<(), ProviderError> {
        let resp = self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(api_key.expose())
            .send()
            .await?;
        check_status(resp).await?;
        debug!(key = %api_key, "API key verified");
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::provider::Turn;
    use axum::extract::Json as AxumJson;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::{json, Value};

    const GOOD_KEY: &str = "sk-good-key-123456";

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {GOOD_KEY}");
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }

    /// Fake OpenAI endpoints on an ephemeral port; returns the base URL.
    async fn spawn_fake_api() -> String {
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(|headers: HeaderMap, AxumJson(body): AxumJson<Value>| async move {
                    if !authorized(&headers) {
                        return (
                            StatusCode::UNAUTHORIZED,
                            AxumJson(json!({ "error": { "message": "Incorrect API key provided" } })),
                        );
                    }
                    let messages = body["messages"].as_array().cloned().unwrap_or_default();
                    let last = messages
                        .last()
                        .and_then(|m| m["content"].as_str())
                        .unwrap_or_default()
                        .to_owned();
                    if last == "empty" {
                        return (StatusCode::OK, AxumJson(json!({ "choices": [] })));
                    }
                    if last == "refuse" {
                        return (
                            StatusCode::OK,
                            AxumJson(json!({
                                "choices": [{
                                    "index": 0,
                                    "message": { "role": "assistant", "content": null, "refusal": "I can't help with that." },
                                    "finish_reason": "content_filter"
                                }]
                            })),
                        );
                    }
                    let reply = format!("{} messages, last: {last}", messages.len());
                    (
                        StatusCode::OK,
                        AxumJson(json!({
                            "choices": [{ "index": 0, "message": { "role": "assistant", "content": reply } }]
                        })),
                    )
                }),
            )
            .route(
                "/v1/images/generations",
                post(|headers: HeaderMap, AxumJson(body): AxumJson<Value>| async move {
                    if !authorized(&headers) {
                        return (StatusCode::UNAUTHORIZED, AxumJson(json!({})));
                    }
                    let size = body["size"].as_str().unwrap_or_default().to_owned();
                    (
                        StatusCode::OK,
                        AxumJson(json!({ "created": 0, "data": [{ "url": format!("https://img.test/{size}.png") }] })),
                    )
                }),
            )
            .route(
                "/v1/models",
                get(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        (StatusCode::OK, "{\"data\":[]}".to_owned())
                    } else {
                        (StatusCode::UNAUTHORIZED, "nope".to_owned())
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig {
            base_url,
            system_prompt: Some("You are a helpful assistant.".into()),
            ..OpenAiConfig::default()
        })
        .unwrap()
    }

    fn key(s: &str) -> ApiKey {
        ApiKey::parse(s).unwrap()
    }

    #[test]
    fn build_messages_orders_system_history_prompt() {
        let c = client("http://unused".into());
        let req = CompletionRequest::new("and now?").with_history(vec![
            Turn { ai: false, text: "hi".into() },
            Turn { ai: true, text: "hello".into() },
        ]);
        let roles: Vec<_> = c.build_messages(&req).into_iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let c = client("http://localhost:9/".into());
        assert_eq!(c.endpoint("models"), "http://localhost:9/v1/models");
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let c = client(spawn_fake_api().await);
        let req = CompletionRequest::new("ping")
            .with_history(vec![Turn { ai: false, text: "earlier".into() }]);
        let out = c.complete(&req, &key(GOOD_KEY)).await.unwrap();
        assert_eq!(out, "3 messages, last: ping");
    }

    #[tokio::test]
    async fn complete_maps_upstream_error_message() {
        let c = client(spawn_fake_api().await);
        let err = c
            .complete(&CompletionRequest::new("ping"), &key("sk-wrong-key-0000"))
            .await
            .unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_with_no_choices_is_empty_response() {
        let c = client(spawn_fake_api().await);
        let err = c
            .complete(&CompletionRequest::new("empty"), &key(GOOD_KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn complete_with_null_content_is_blank_reply() {
        let c = client(spawn_fake_api().await);
        let out = c
            .complete(&CompletionRequest::new("refuse"), &key(GOOD_KEY))
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn generate_image_returns_first_url() {
        let c = client(spawn_fake_api().await);
        let url = c.generate_image("a cat", &key(GOOD_KEY)).await.unwrap();
        assert_eq!(url, "https://img.test/512x512.png");
    }

    #[tokio::test]
    async fn verify_key_distinguishes_good_and_bad_keys() {
        let c = client(spawn_fake_api().await);
        assert!(c.verify_key(&key(GOOD_KEY)).await.is_ok());
        let err = c.verify_key(&key("sk-wrong-key-0000")).await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let c = OpenAiClient::new(OpenAiConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(2),
            ..OpenAiConfig::default()
        })
        .unwrap();
        let err = c.verify_key(&key(GOOD_KEY)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }
}
