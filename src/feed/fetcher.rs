use crate::classify::Classifier;
use crate::feed::parser::{parse_items, ParseOptions};
use crate::types::{Item, Source};
use crate::util::{validate_endpoint, validate_url, UrlValidationError};
use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;

const MAX_ENVELOPE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Public CORS proxy that wraps any document in a `{"contents": ...}` envelope.
pub const DEFAULT_PROXY_URL: &str = "https://api.allorigins.win/get";

/// Errors that can occur while retrieving one source.
///
/// These never escape [`fetch_source`]; they exist so the failure reason
/// can be logged and tested.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Source locator failed validation (bad scheme, private host, etc.)
    #[error("Invalid source URL: {0}")]
    InvalidUrl(UrlValidationError),
    /// Proxy endpoint is not HTTPS (and not localhost)
    #[error("Refusing proxy endpoint: {0}")]
    InsecureProxy(UrlValidationError),
    /// Network-level error (DNS, connection, TLS, client timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Proxy answered with a non-2xx status, or reported one for the origin
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Envelope exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Proxy body was not the expected JSON envelope
    #[error("Malformed proxy envelope: {0}")]
    Envelope(String),
    /// Wrapped document could not be parsed as a feed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Everything a single fetch needs besides the HTTP client.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub proxy_url: String,
    pub parse: ParseOptions,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            parse: ParseOptions::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    contents: Option<String>,
    #[serde(default)]
    status: Option<ProxyStatus>,
}

#[derive(Debug, Deserialize)]
struct ProxyStatus {
    http_code: Option<u16>,
}

/// Fetches one source and returns its classified items.
///
/// Never fails: network errors, proxy errors, malformed envelopes and
/// unparseable documents are logged and produce an empty list, so one bad
/// source can't take down a refresh cycle. No retries are attempted.
pub async fn fetch_source(
    client: &reqwest::Client,
    settings: &FetchSettings,
    classifier: &Classifier,
    source: &Source,
) -> Vec<Item> {
    match fetch_items(client, settings, classifier, source).await {
        Ok(items) => {
            tracing::debug!(source = %source.title, items = items.len(), "Fetched source");
            items
        }
        Err(e) => {
            tracing::warn!(
                source = %source.title,
                url = %source.url,
                error = %e,
                "Source fetch failed, contributing no items"
            );
            Vec::new()
        }
    }
}

async fn fetch_items(
    client: &reqwest::Client,
    settings: &FetchSettings,
    classifier: &Classifier,
    source: &Source,
) -> Result<Vec<Item>, FetchError> {
    let document = fetch_document(client, &settings.proxy_url, &source.url).await?;
    parse_items(&document, &source.title, &settings.parse, classifier)
        .map_err(|e| FetchError::Parse(e.to_string()))
}

/// Retrieves the raw feed document for `url` through the fetch proxy.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] / [`FetchError::InsecureProxy`] before any request
/// - [`FetchError::Network`] for transport failures
/// - [`FetchError::HttpStatus`] for non-2xx proxy responses, or when the
///   proxy reports the origin answered with an error status
/// - [`FetchError::ResponseTooLarge`] past 10MB
/// - [`FetchError::Envelope`] when the body isn't `{"contents": "..."}`
pub async fn fetch_document(
    client: &reqwest::Client,
    proxy_url: &str,
    url: &str,
) -> Result<String, FetchError> {
    let source_url = validate_url(url).map_err(FetchError::InvalidUrl)?;
    let mut endpoint = validate_endpoint(proxy_url).map_err(FetchError::InsecureProxy)?;
    endpoint
        .query_pairs_mut()
        .append_pair("url", source_url.as_str());

    let response = client.get(endpoint).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_ENVELOPE_SIZE).await?;
    let envelope: ProxyEnvelope =
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Envelope(e.to_string()))?;

    if let Some(code) = envelope.status.and_then(|s| s.http_code) {
        if !(200..300).contains(&code) {
            return Err(FetchError::HttpStatus(code));
        }
    }

    envelope
        .contents
        .ok_or_else(|| FetchError::Envelope("missing `contents` field".to_string()))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED_URL: &str = "https://news.example.com/rss.xml";

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Senate vote tonight</title><link>https://news.example.com/1</link></item>
    <item><title>Quiet afternoon</title><link>https://news.example.com/2</link></item>
</channel></rss>"#;

    fn settings(server: &MockServer) -> FetchSettings {
        FetchSettings {
            proxy_url: format!("{}/get", server.uri()),
            parse: ParseOptions::default(),
        }
    }

    fn source() -> Source {
        Source::new("1", FEED_URL, "Example News")
    }

    #[tokio::test]
    async fn test_fetch_source_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("url", FEED_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contents": VALID_RSS,
                "status": { "http_code": 200 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let items = fetch_source(
            &client,
            &settings(&mock_server),
            &Classifier::default(),
            &source(),
        )
        .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, "Example News");
        assert_eq!(items[0].category, "Politics");
        assert_eq!(items[1].category, "General");
    }

    #[tokio::test]
    async fn test_proxy_500_yields_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1) // No retries on the feed path
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &settings(&mock_server).proxy_url, FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(500)));

        let items = fetch_source(
            &client,
            &settings(&mock_server),
            &Classifier::default(),
            &source(),
        )
        .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_origin_error_reported_by_proxy() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contents": "<html>Not Found</html>",
                "status": { "http_code": 404 }
            })))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &settings(&mock_server).proxy_url, FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_non_json_envelope() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &settings(&mock_server).proxy_url, FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_null_contents() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "contents": null })))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &settings(&mock_server).proxy_url, FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_malformed_feed_yields_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "contents": "<rss><channel><item></rss>" })),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_items(
            &client,
            &settings(&mock_server),
            &Classifier::default(),
            &source(),
        )
        .await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_private_source_rejected_before_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(
            &client,
            &settings(&mock_server).proxy_url,
            "http://192.168.1.1/rss.xml",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_insecure_proxy_rejected() {
        let client = reqwest::Client::new();
        let err = fetch_document(&client, "http://proxy.example.com/get", FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InsecureProxy(_)));
    }

    #[tokio::test]
    async fn test_oversized_envelope_rejected() {
        let mock_server = MockServer::start().await;
        let huge = "x".repeat(MAX_ENVELOPE_SIZE + 1);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(huge))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &settings(&mock_server).proxy_url, FEED_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge));
    }
}
