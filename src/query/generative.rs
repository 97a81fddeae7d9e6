//! Primary provider: a hosted generative model answering from its own
//! knowledge.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::provider::{send_json, AnswerProvider, ProviderError, ProviderReply};
use crate::types::Provider;
use crate::util::validate_endpoint;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Builds the prompt sent for `query`.
///
/// The model is told to use one of two fixed refusal sentences when it has
/// no current data, so the phrase detector can recognize the refusal.
pub fn build_prompt(query: &str) -> String {
    format!(
        "You are a news and current affairs assistant. Answer the user's question \
         briefly and objectively using up-to-date information.\n\n\
         If you cannot reach current information or search the web, reply with \
         \"I cannot access current information\" or \"I am unable to search the web\" \
         instead of answering. Do not answer news questions from outdated or general \
         knowledge.\n\n\
         Question: {query}"
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u32,
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// First part of the first candidate, or empty.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default()
    }
}

pub struct GenerativeClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    max_output_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for GenerativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GenerativeClient {
    /// # Errors
    ///
    /// [`ProviderError::InsecureEndpoint`] unless `base_url` is HTTPS (plain
    /// HTTP is accepted for localhost only).
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: Option<SecretString>,
    ) -> Result<Self, ProviderError> {
        validate_endpoint(base_url).map_err(ProviderError::InsecureEndpoint)?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            client,
            endpoint,
            api_key,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    pub fn with_generation(mut self, max_output_tokens: u32, temperature: f32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl AnswerProvider for GenerativeClient {
    fn kind(&self) -> Provider {
        Provider::Primary
    }

    async fn answer(&self, query: &str) -> Result<ProviderReply, ProviderError> {
        let prompt = build_prompt(query);
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                candidate_count: 1,
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-goog-api-key", key.expose_secret());
        }

        let response: GenerateResponse = send_json(request).await?;
        Ok(ProviderReply {
            text: response.into_text(),
            query: query.to_string(),
            results: Vec::new(),
        })
    }
}
