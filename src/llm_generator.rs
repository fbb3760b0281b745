//! Text generation against hosted language models.
//!
//! A fixed catalog of models across three providers is exposed through
//! [`ModelSpec`]. [`LlmGenerator`] sends one request per prompt and never
//! retries; [`MockGenerator`] produces deterministic offline drafts.

use crate::error::{GenerationError, InputError};
use crate::http_client::{HttpClient, HttpError};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet";

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Anthropic, Provider::OpenAi, Provider::Gemini];

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic Claude",
            Provider::OpenAi => "OpenAI GPT",
            Provider::Gemini => "Google Gemini",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GOOGLE_API_KEY",
        }
    }
}

/// One selectable model: its CLI key, provider, wire id and output bound.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub key: &'static str,
    pub provider: Provider,
    pub model_id: &'static str,
    pub name: &'static str,
    pub max_tokens: u32,
}

pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        key: "claude-3-5-sonnet",
        provider: Provider::Anthropic,
        model_id: "claude-sonnet-4-20250514",
        name: "Claude 3.5 Sonnet (Latest)",
        max_tokens: 16000,
    },
    ModelSpec {
        key: "claude-3-5-haiku",
        provider: Provider::Anthropic,
        model_id: "claude-3-5-haiku-20241022",
        name: "Claude 3.5 Haiku (Fast)",
        max_tokens: 8192,
    },
    ModelSpec {
        key: "claude-3-opus",
        provider: Provider::Anthropic,
        model_id: "claude-3-opus-20240229",
        name: "Claude 3 Opus (Most Capable)",
        max_tokens: 4096,
    },
    ModelSpec {
        key: "gpt-4",
        provider: Provider::OpenAi,
        model_id: "gpt-4-turbo-preview",
        name: "GPT-4 Turbo (Most Capable)",
        max_tokens: 4096,
    },
    ModelSpec {
        key: "gpt-4o",
        provider: Provider::OpenAi,
        model_id: "gpt-4o",
        name: "GPT-4o (Multimodal)",
        max_tokens: 16000,
    },
    ModelSpec {
        key: "gpt-3.5-turbo",
        provider: Provider::OpenAi,
        model_id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo (Fast & Efficient)",
        max_tokens: 4096,
    },
    ModelSpec {
        key: "gemini-pro",
        provider: Provider::Gemini,
        model_id: "gemini-pro",
        name: "Gemini Pro",
        max_tokens: 8192,
    },
    ModelSpec {
        key: "gemini-1.5-pro",
        provider: Provider::Gemini,
        model_id: "gemini-1.5-pro-latest",
        name: "Gemini 1.5 Pro (Latest)",
        max_tokens: 8192,
    },
    ModelSpec {
        key: "gemini-1.5-flash",
        provider: Provider::Gemini,
        model_id: "gemini-1.5-flash-latest",
        name: "Gemini 1.5 Flash (Fast)",
        max_tokens: 8192,
    },
];

impl ModelSpec {
    /// Looks up a model by its CLI key.
    pub fn find(key: &str) -> Result<&'static ModelSpec, InputError> {
        MODELS
            .iter()
            .find(|model| model.key == key)
            .ok_or_else(|| InputError::UnknownModel { key: key.to_string() })
    }

    pub fn by_provider(provider: Provider) -> impl Iterator<Item = &'static ModelSpec> {
        MODELS.iter().filter(move |model| model.provider == provider)
    }
}

/// Text produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub content: String,
    pub character_count: usize,
}

impl GenerationResult {
    pub fn new(content: String) -> Self {
        let character_count = content.chars().count();
        Self {
            content,
            character_count,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` and returns the generated document.
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError>;

    /// Human-readable name of the backing model.
    fn name(&self) -> &str;
}

struct ApiRequest {
    url: String,
    headers: Vec<(&'static str, String)>,
    body: Value,
}

pub struct LlmGenerator {
    http: Box<dyn HttpClient>,
    model: &'static ModelSpec,
    api_key: Option<String>,
}

impl LlmGenerator {
    pub fn new(http: Box<dyn HttpClient>, model: &'static ModelSpec, api_key: Option<String>) -> Self {
        Self { http, model, api_key }
    }

    fn build_request(&self, prompt: &str, api_key: &str) -> ApiRequest {
        let model = self.model;
        match model.provider {
            Provider::Anthropic => ApiRequest {
                url: ANTHROPIC_URL.to_string(),
                headers: vec![
                    ("x-api-key", api_key.to_string()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                    ("content-type", "application/json".to_string()),
                ],
                body: json!({
                    "model": model.model_id,
                    "max_tokens": model.max_tokens,
                    "messages": [{ "role": "user", "content": prompt }]
                }),
            },
            Provider::OpenAi => ApiRequest {
                url: OPENAI_URL.to_string(),
                headers: vec![
                    ("authorization", format!("Bearer {}", api_key)),
                    ("content-type", "application/json".to_string()),
                ],
                body: json!({
                    "model": model.model_id,
                    "max_tokens": model.max_tokens,
                    "messages": [{ "role": "user", "content": prompt }]
                }),
            },
            Provider::Gemini => ApiRequest {
                url: format!("{}/{}:generateContent", GEMINI_URL, model.model_id),
                headers: vec![
                    ("x-goog-api-key", api_key.to_string()),
                    ("content-type", "application/json".to_string()),
                ],
                body: json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "maxOutputTokens": model.max_tokens }
                }),
            },
        }
    }

    /// Pulls the generated text out of a provider response body.
    fn extract_text(&self, response: &Value) -> Option<String> {
        let text = match self.model.provider {
            Provider::Anthropic => response
                .get("content")
                .and_then(|c| c.as_array())
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                        .collect::<String>()
                }),
            Provider::OpenAi => response
                .pointer("/choices/0/message/content")
                .and_then(|t| t.as_str())
                .map(str::to_string),
            Provider::Gemini => response
                .pointer("/candidates/0/content/parts")
                .and_then(|p| p.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                        .collect::<String>()
                }),
        };
        text.filter(|t| !t.trim().is_empty())
    }

    fn service_error(&self, message: impl Into<String>) -> GenerationError {
        GenerationError::Service {
            model: self.model.name.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError> {
        let provider = self.model.provider;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::MissingApiKey {
                provider: provider.display_name().to_string(),
                env_var: provider.env_var(),
            })?;

        let request = self.build_request(prompt, api_key);
        let headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();

        info!("Sending request to {} ({})", self.model.name, self.model.model_id);
        let response = self
            .http
            .post_json(&request.url, &headers, &request.body)
            .await
            .map_err(|e| match e {
                HttpError::Timeout => GenerationError::Timeout {
                    model: self.model.name.to_string(),
                },
                other => self.service_error(other.to_string()),
            })?;

        if !response.is_success() {
            warn!("{} returned HTTP {}", self.model.name, response.status);
            return Err(self.service_error(format!("HTTP {}: {}", response.status, response.body)));
        }

        let parsed: Value = serde_json::from_str(&response.body).map_err(|e| {
            self.service_error(format!("malformed response ({}): {}", e, response.body))
        })?;
        debug!("Raw generation response: {}", parsed);

        let content = self
            .extract_text(&parsed)
            .ok_or_else(|| self.service_error(format!("response contained no text: {}", response.body)))?;

        let result = GenerationResult::new(content);
        info!("Generated {} characters", result.character_count);
        Ok(result)
    }

    fn name(&self) -> &str {
        self.model.name
    }
}

/// Offline generator used when mock mode is enabled.
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    fn requirement<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
        prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(label))
            .map(str::trim)
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError> {
        info!("Using mock generator (DOCDRAFT_USE_MOCK=1)");
        let doc_type = Self::requirement(prompt, "- Type:").unwrap_or("document");
        let audience = Self::requirement(prompt, "- Audience:").unwrap_or("readers");
        let length = Self::requirement(prompt, "- Length:").unwrap_or("unspecified");

        let content = format!(
            "# Mock {doc_type} draft\n\n\
             This {doc_type} was produced offline for {audience}, without calling a language model.\n\n\
             ## Requirements\n\n\
             - Type: {doc_type}\n\
             - Audience: {audience}\n\
             - Length: {length}\n\n\
             ## Prompt size\n\n\
             The request carried {} characters.\n",
            prompt.chars().count()
        );
        Ok(GenerationResult::new(content))
    }

    fn name(&self) -> &str {
        "Mock generator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpResponse;
    use crate::http_client::mock::MockHttpClient;
    use std::sync::Arc;

    fn generator(key: &str, http: MockHttpClient, api_key: Option<&str>) -> LlmGenerator {
        LlmGenerator::new(
            Box::new(http),
            ModelSpec::find(key).unwrap(),
            api_key.map(str::to_string),
        )
    }

    #[test]
    fn test_find_known_and_unknown_models() {
        let model = ModelSpec::find("gpt-4o").unwrap();
        assert_eq!(model.provider, Provider::OpenAi);
        assert_eq!(model.model_id, "gpt-4o");

        assert!(matches!(
            ModelSpec::find("gpt-9"),
            Err(InputError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_default_model_is_in_catalog() {
        let model = ModelSpec::find(DEFAULT_MODEL).unwrap();
        assert_eq!(model.provider, Provider::Anthropic);
    }

    #[test]
    fn test_catalog_groups_by_provider() {
        for provider in Provider::ALL {
            assert_eq!(ModelSpec::by_provider(provider).count(), 3);
        }
    }

    #[test]
    fn test_character_count_counts_chars_not_bytes() {
        let result = GenerationResult::new("héllo".to_string());
        assert_eq!(result.character_count, 5);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let http = MockHttpClient::new(vec![]);
        let generator = generator("claude-3-5-sonnet", http, None);

        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::MissingApiKey { env_var: "ANTHROPIC_API_KEY", .. }
        ));
    }

    #[tokio::test]
    async fn test_anthropic_request_and_response() {
        let http = MockHttpClient::ok(r##"{"content":[{"type":"text","text":"# Title\n\nBody"}]}"##);
        let generator = generator("claude-3-5-sonnet", http, Some("sk-ant-test"));

        let result = generator.generate("write it").await.unwrap();
        assert_eq!(result.content, "# Title\n\nBody");
        assert_eq!(result.character_count, 13);
    }

    #[tokio::test]
    async fn test_anthropic_request_shape() {
        let http = Arc::new(MockHttpClient::ok(r#"{"content":[{"text":"ok"}]}"#));

        let generator = LlmGenerator::new(
            Box::new(http.clone()),
            ModelSpec::find("claude-3-5-sonnet").unwrap(),
            Some("sk-ant-test".to_string()),
        );
        generator.generate("write it").await.unwrap();

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, ANTHROPIC_URL);
        assert_eq!(requests[0].header("x-api-key"), Some("sk-ant-test"));
        let body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 16000);
        assert_eq!(body["messages"][0]["content"], "write it");
    }

    #[tokio::test]
    async fn test_openai_response_extraction() {
        let http = MockHttpClient::ok(r#"{"choices":[{"message":{"role":"assistant","content":"Draft"}}]}"#);
        let generator = generator("gpt-4o", http, Some("sk-test"));
        assert_eq!(generator.generate("p").await.unwrap().content, "Draft");
    }

    #[tokio::test]
    async fn test_gemini_response_extraction() {
        let http = MockHttpClient::ok(
            r#"{"candidates":[{"content":{"parts":[{"text":"Part one. "},{"text":"Part two."}]}}]}"#,
        );
        let generator = generator("gemini-1.5-flash", http, Some("g-key"));
        assert_eq!(
            generator.generate("p").await.unwrap().content,
            "Part one. Part two."
        );
    }

    #[tokio::test]
    async fn test_non_2xx_is_service_error_with_body() {
        let http = MockHttpClient::new(vec![Ok(HttpResponse::new(
            401,
            r#"{"error":{"message":"invalid x-api-key"}}"#,
        ))]);
        let generator = generator("claude-3-5-haiku", http, Some("bad"));

        match generator.generate("p").await.unwrap_err() {
            GenerationError::Service { message, .. } => {
                assert!(message.contains("401"));
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_service_error() {
        let http = MockHttpClient::ok("<html>gateway</html>");
        let generator = generator("gpt-4", http, Some("k"));
        assert!(matches!(
            generator.generate("p").await,
            Err(GenerationError::Service { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_text_is_service_error() {
        let http = MockHttpClient::ok(r#"{"content":[]}"#);
        let generator = generator("claude-3-opus", http, Some("k"));
        assert!(matches!(
            generator.generate("p").await,
            Err(GenerationError::Service { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_service_error() {
        let http = MockHttpClient::new(vec![Err(HttpError::NotUtf8 { status: 200 })]);
        let generator = generator("gemini-1.5-pro", http, Some("k"));
        match generator.generate("p").await {
            Err(GenerationError::Service { message, .. }) => assert!(message.contains("UTF-8")),
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_timeout_maps_to_timeout() {
        let http = MockHttpClient::new(vec![Err(HttpError::Timeout)]);
        let generator = generator("claude-3-5-sonnet", http, Some("k"));
        assert!(matches!(
            generator.generate("p").await,
            Err(GenerationError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_generator_echoes_requirements() {
        let prompt = "intro\n- Type: blog post\n- Length: 500 words\n- Audience: small business owners\n";
        let result = MockGenerator::new().generate(prompt).await.unwrap();

        assert!(result.content.starts_with("# Mock blog post draft"));
        assert!(result.content.contains("- Audience: small business owners"));
        assert!(result.content.contains("- Length: 500 words"));
    }
}
