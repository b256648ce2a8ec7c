//! OpenAiChatProvider -- concrete [`LlmProvider`] implementation for the
//! OpenAI Chat Completions API.
//!
//! Sends requests to `/v1/chat/completions` with a `json_schema`
//! response format derived from [`ChatReply`], so the model's answer
//! parses directly into the structured reply contract.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never
//! logged or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

use charisma_core::llm::LlmProvider;
use charisma_observe::genai_attrs::{
    GEN_AI_OPERATION_NAME, GEN_AI_PROVIDER_NAME, GEN_AI_REQUEST_MAX_TOKENS, GEN_AI_REQUEST_MODEL,
    OPERATION_CHAT,
};
use charisma_types::config::ModelConfig;
use charisma_types::llm::{ChatReply, ChatTurnRequest, LlmError};

use super::types::{JsonSchemaFormat, OpenAiMessage, OpenAiRequest, OpenAiResponse, ResponseFormat};

/// OpenAI chat model provider.
///
/// A provider built without an API key fails every call with
/// `AuthenticationFailed`; the orchestrator turns that into a fallback
/// reply, so the service stays up when the key is absent.
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl OpenAiChatProvider {
    /// Create a new OpenAI provider from model configuration.
    pub fn new(config: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_openai_request(&self, request: &ChatTurnRequest) -> Result<OpenAiRequest, LlmError> {
        let schema = serde_json::to_value(schemars::schema_for!(ChatReply))
            .map_err(|e| LlmError::InvalidRequest(format!("schema generation failed: {e}")))?;

        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        Ok(OpenAiRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "chat_reply".to_string(),
                    strict: true,
                    schema,
                },
            },
        })
    }
}

// OpenAiChatProvider intentionally does NOT derive Debug so the key can
// never leak through formatting.

impl LlmProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &ChatTurnRequest) -> Result<ChatReply, LlmError> {
        let span = tracing::info_span!(
            "chat completion",
            { GEN_AI_OPERATION_NAME } = OPERATION_CHAT,
            { GEN_AI_PROVIDER_NAME } = "openai",
            { GEN_AI_REQUEST_MODEL } = %request.model,
            { GEN_AI_REQUEST_MAX_TOKENS } = request.max_tokens,
        );
        self.call_api(request).instrument(span).await
    }
}

impl OpenAiChatProvider {
    async fn call_api(&self, request: &ChatTurnRequest) -> Result<ChatReply, LlmError> {
        let Some(api_key) = &self.api_key else {
            return Err(LlmError::AuthenticationFailed);
        };

        let body = self.to_openai_request(request)?;
        let url = self.url("/v1/chat/completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Provider {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 => LlmError::InvalidRequest(error_body),
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited { retry_after_ms },
                529 => LlmError::Overloaded(error_body),
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(format!("failed to parse response: {e}")))?;

        let content = openai_resp
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }

        serde_json::from_str(content)
            .map_err(|e| LlmError::Malformed(format!("reply did not match contract: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_types::llm::{ChatTurnMessage, ModelAction};
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(api_key: Option<&str>, base_url: String) -> OpenAiChatProvider {
        let config = ModelConfig {
            api_key: api_key.map(SecretString::from),
            ..Default::default()
        };
        OpenAiChatProvider::new(&config).with_base_url(base_url)
    }

    fn request() -> ChatTurnRequest {
        ChatTurnRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatTurnMessage::user("hello")],
            max_tokens: 512,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn test_generate_parses_structured_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"message":"hi Ada","actions":[{"type":"affinity","value":"60"}]}"#,
            )))
            .mount(&server)
            .await;

        let provider = provider(Some("sk-test"), server.uri());
        let reply = provider.generate(&request()).await.unwrap();
        assert_eq!(reply.message, "hi Ada");
        assert_eq!(
            reply.actions,
            vec![ModelAction::Affinity {
                value: "60".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let provider = provider(None, "http://127.0.0.1:9".to_string());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_401_maps_to_authentication_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = provider(Some("sk-bad"), server.uri());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_429_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let provider = provider(Some("sk-test"), server.uri());
        let err = provider.generate(&request()).await.unwrap_err();
        match err {
            LlmError::RateLimited { retry_after_ms } => {
                assert_eq!(retry_after_ms, Some(2000));
            }
            other => panic!("expected rate limited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unstructured_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("just plain prose")),
            )
            .mount(&server)
            .await;

        let provider = provider(Some("sk-test"), server.uri());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_empty_content_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("")))
            .mount(&server)
            .await;

        let provider = provider(Some("sk-test"), server.uri());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }
}
