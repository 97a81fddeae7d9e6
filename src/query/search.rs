//! Secondary provider: a news search API returning ranked results and a
//! short generated summary.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::provider::{send_json, AnswerProvider, ProviderError, ProviderReply};
use crate::types::{Provider, SupportingResult};
use crate::util::validate_endpoint;

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_SEARCH_DEPTH: &str = "basic";
pub const DEFAULT_MAX_RESULTS: u32 = 8;
pub const DEFAULT_DAYS: u32 = 7;

/// Answer text used when the search returns no summary.
pub const NO_SUMMARY: &str = "No summary available";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub search_depth: String,
    pub max_results: u32,
    /// Restricts results to the last N days.
    pub days: u32,
    pub include_images: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_depth: DEFAULT_SEARCH_DEPTH.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            days: DEFAULT_DAYS,
            include_images: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    topic: &'static str,
    max_results: u32,
    include_answer: &'static str,
    include_images: bool,
    days: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    answer: Option<String>,
    query: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
    #[serde(default)]
    images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
    published_date: Option<String>,
}

/// Image entries come back as bare URLs, or as objects when descriptions
/// are requested.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageEntry {
    Url(String),
    Described { url: String },
}

impl ImageEntry {
    fn into_url(self) -> String {
        match self {
            ImageEntry::Url(url) | ImageEntry::Described { url } => url,
        }
    }
}

impl SearchResponse {
    fn into_reply(self, request_query: &str) -> ProviderReply {
        let text = self
            .answer
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string());
        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| request_query.to_string());

        // Images are query-level; they are paired with results by position.
        let mut images = self.images.into_iter().map(ImageEntry::into_url);
        let results = self
            .results
            .into_iter()
            .map(|hit| SupportingResult {
                title: hit.title,
                link: hit.url,
                snippet: hit.content,
                score: hit.score.clamp(0.0, 1.0),
                published: hit.published_date,
                image: images.next(),
            })
            .collect();

        ProviderReply {
            text,
            query,
            results,
        }
    }
}

pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    options: SearchOptions,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("options", &self.options)
            .finish()
    }
}

impl SearchClient {
    /// # Errors
    ///
    /// [`ProviderError::InsecureEndpoint`] unless `base_url` is HTTPS (plain
    /// HTTP is accepted for localhost only).
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<SecretString>,
        options: SearchOptions,
    ) -> Result<Self, ProviderError> {
        validate_endpoint(base_url).map_err(ProviderError::InsecureEndpoint)?;
        Ok(Self {
            client,
            endpoint: format!("{}/search", base_url.trim_end_matches('/')),
            api_key,
            options,
        })
    }
}

#[async_trait]
impl AnswerProvider for SearchClient {
    fn kind(&self) -> Provider {
        Provider::Secondary
    }

    async fn answer(&self, query: &str) -> Result<ProviderReply, ProviderError> {
        let body = SearchRequest {
            query,
            search_depth: &self.options.search_depth,
            topic: "news",
            max_results: self.options.max_results,
            include_answer: "basic",
            include_images: self.options.include_images,
            days: self.options.days,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response: SearchResponse = send_json(request).await?;
        let reply = response.into_reply(query);
        tracing::debug!(results = reply.results.len(), "Search returned");
        Ok(reply)
    }
}
