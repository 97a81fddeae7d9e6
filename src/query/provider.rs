use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{Provider, SupportingResult};
use crate::util::UrlValidationError;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Refusing provider endpoint: {0}")]
    InsecureEndpoint(UrlValidationError),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Raw outcome of one provider call, before the orchestrator stamps it with
/// timing and provider identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderReply {
    pub text: String,
    /// Query as the provider echoed it back.
    pub query: String,
    pub results: Vec<SupportingResult>,
}

/// A backend able to answer a free-text query.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    fn kind(&self) -> Provider;

    async fn answer(&self, query: &str) -> Result<ProviderReply, ProviderError>;
}

/// Sends a prepared request and decodes a size-limited JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus(response.status().as_u16()));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return Err(ProviderError::ResponseTooLarge(MAX_RESPONSE_SIZE));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > MAX_RESPONSE_SIZE {
            return Err(ProviderError::ResponseTooLarge(MAX_RESPONSE_SIZE));
        }
        bytes.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Malformed(e.to_string()))
}
