//! OpenRouter chat-completions client behind the [`InferencePort`].
//!
//! Structured calls request `json_object` output and embed the contract's
//! JSON Schema in the system prompt; the reply is then recovered with
//! [`extract_json`]. Validation against the contract is the caller's job.

mod json;

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use marketscope_shared::{
    CapabilityError, InferencePort, InferenceRequest, MarketScopeError, OpenRouterConfig,
    OutputContract, Result,
};

pub use json::extract_json;

/// User-Agent string for inference requests.
const USER_AGENT: &str = concat!("MarketScope/", env!("CARGO_PKG_VERSION"));

/// Characters of an error body kept in diagnostics.
const ERROR_BODY_PREVIEW: usize = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// One completed call, with the metrics we log.
#[derive(Debug, Clone)]
struct Completion {
    text: String,
    tokens_in: u64,
    tokens_out: u64,
    model: String,
    latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// OpenRouter (OpenAI-compatible) chat-completions client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenRouterClient {
    /// Build a client, reading the API key from the env var named in config.
    pub fn from_config(config: &OpenRouterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                MarketScopeError::config(format!(
                    "OpenRouter API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: &OpenRouterConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MarketScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.default_model.clone(),
        })
    }

    async fn complete(
        &self,
        request: &InferenceRequest,
        system_prompt: &str,
        response_format: Option<ResponseFormat>,
    ) -> std::result::Result<Completion, CapabilityError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::from_transport(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let preview: String = detail.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!(status = status.as_u16(), body = %preview, "inference request rejected");
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    CapabilityError::Blocked(format!("{url}: HTTP {status}"))
                }
                StatusCode::UNAUTHORIZED | StatusCode::PAYMENT_REQUIRED => {
                    CapabilityError::Unavailable(format!("{url}: HTTP {status}: {preview}"))
                }
                _ => CapabilityError::HttpStatus {
                    url,
                    status: status.as_u16(),
                },
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(format!("{url}: invalid completion payload: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CapabilityError::Malformed(format!("{url}: completion had no content")))?;
        let usage = parsed.usage.unwrap_or_default();

        Ok(Completion {
            text,
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl InferencePort for OpenRouterClient {
    #[instrument(skip_all, fields(task = request.task.as_str(), contract = contract.name))]
    async fn generate_structured(
        &self,
        request: &InferenceRequest,
        contract: &OutputContract,
    ) -> std::result::Result<Value, CapabilityError> {
        let system_prompt = structured_system_prompt(&request.system_prompt, contract);
        let completion = self
            .complete(
                request,
                &system_prompt,
                Some(ResponseFormat {
                    format_type: "json_object",
                }),
            )
            .await?;

        info!(
            model = %completion.model,
            tokens_in = completion.tokens_in,
            tokens_out = completion.tokens_out,
            latency_ms = completion.latency_ms,
            "structured completion received"
        );

        extract_json(&completion.text).ok_or_else(|| {
            debug!(reply_len = completion.text.len(), "reply held no JSON object");
            CapabilityError::Malformed(format!(
                "model reply for {} is not a JSON object",
                contract.name
            ))
        })
    }

    #[instrument(skip_all, fields(task = request.task.as_str()))]
    async fn generate_text(
        &self,
        request: &InferenceRequest,
    ) -> std::result::Result<String, CapabilityError> {
        let completion = self.complete(request, &request.system_prompt, None).await?;

        info!(
            model = %completion.model,
            tokens_in = completion.tokens_in,
            tokens_out = completion.tokens_out,
            latency_ms = completion.latency_ms,
            "text completion received"
        );

        Ok(completion.text.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// System prompt with the contract schema appended.
fn structured_system_prompt(base: &str, contract: &OutputContract) -> String {
    let schema = serde_json::to_string_pretty(&contract.schema)
        .unwrap_or_else(|_| contract.schema.to_string());
    format!(
        "{base}\n\nRespond ONLY with a JSON object matching the `{}` schema below. No prose, no code fences.\n\n```json\n{schema}\n```",
        contract.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketscope_shared::TaskKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenRouterClient {
        let config = OpenRouterConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            default_model: "test/model".into(),
            ..OpenRouterConfig::default()
        };
        OpenRouterClient::with_api_key(&config, "sk-test").expect("client")
    }

    fn request(task: TaskKind) -> InferenceRequest {
        InferenceRequest {
            task,
            system_prompt: "You are a market analyst.".into(),
            user_prompt: "List competitors.".into(),
            max_tokens: 300,
            temperature: 0.2,
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "model": "test/model",
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 34}
        })
    }

    #[tokio::test]
    async fn structured_call_sends_schema_and_parses_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test/model",
                "max_tokens": 300,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("```json\n{\"competitors\": [\"A\"]}\n```")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let contract = OutputContract {
            name: "competitor_list",
            schema: json!({"type": "object"}),
        };
        let value = client(&server)
            .generate_structured(&request(TaskKind::DiscoverCompetitors), &contract)
            .await
            .unwrap();
        assert_eq!(value, json!({"competitors": ["A"]}));
    }

    #[tokio::test]
    async fn structured_call_without_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help.")))
            .mount(&server)
            .await;

        let contract = OutputContract {
            name: "chart_data",
            schema: json!({"type": "object"}),
        };
        let err = client(&server)
            .generate_structured(&request(TaskKind::BuildChartData), &contract)
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed(_)));
    }

    #[tokio::test]
    async fn text_call_trims_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("\n Summary: fine\n")),
            )
            .mount(&server)
            .await;

        let text = client(&server)
            .generate_text(&request(TaskKind::AnalyzePage))
            .await
            .unwrap();
        assert_eq!(text, "Summary: fine");
    }

    #[tokio::test]
    async fn rate_limit_and_server_errors_map_to_capability_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.generate_text(&request(TaskKind::Summarize)).await.unwrap_err();
        assert!(matches!(first, CapabilityError::Blocked(_)));
        let second = client.generate_text(&request(TaskKind::Summarize)).await.unwrap_err();
        assert!(matches!(second, CapabilityError::HttpStatus { status: 502, .. }));
    }

    #[test]
    fn missing_key_is_config_error() {
        let config = OpenRouterConfig {
            api_key_env: "MARKETSCOPE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..OpenRouterConfig::default()
        };
        let err = OpenRouterClient::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("MARKETSCOPE_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn debug_redacts_key() {
        let client = OpenRouterClient::with_api_key(&OpenRouterConfig::default(), "sk-secret")
            .expect("client");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
