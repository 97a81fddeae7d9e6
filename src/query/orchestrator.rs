use std::time::Instant;

use thiserror::Error;

use super::detector::{FallbackDetector, PhraseDetector};
use super::provider::{AnswerProvider, ProviderError};
use crate::types::QueryAnswer;

/// Whether a failed primary attempt may be escalated to the secondary
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Auto,
    Disabled,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query is empty")]
    EmptyQuery,

    /// Primary could not answer and escalation was disabled.
    #[error(
        "The AI assistant cannot access current information for this query. \
         Enable fallback search for broader coverage."
    )]
    PrimaryUnavailable,

    /// Secondary failed after the primary had already failed. Retryable.
    #[error("Failed to search news. Please try again.")]
    SearchFailed(#[source] ProviderError),
}

/// Tries the primary provider and escalates to the secondary one when the
/// primary reply is missing or judged unusable.
///
/// Calls are strictly sequential: the secondary is never contacted while
/// the primary call is in flight, and never when the primary answer is
/// usable.
pub struct QueryOrchestrator {
    primary: Box<dyn AnswerProvider>,
    secondary: Box<dyn AnswerProvider>,
    detector: Box<dyn FallbackDetector>,
}

impl QueryOrchestrator {
    pub fn new(primary: Box<dyn AnswerProvider>, secondary: Box<dyn AnswerProvider>) -> Self {
        Self {
            primary,
            secondary,
            detector: Box::new(PhraseDetector::default()),
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn FallbackDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Primary only; an unusable reply becomes [`QueryError::PrimaryUnavailable`].
    pub async fn ask_primary_only(&self, query: &str) -> Result<QueryAnswer, QueryError> {
        self.ask(query, Escalation::Disabled).await
    }

    /// Primary first, secondary on failure.
    pub async fn ask_with_fallback(&self, query: &str) -> Result<QueryAnswer, QueryError> {
        self.ask(query, Escalation::Auto).await
    }

    /// Runs the primary-then-secondary protocol for `query`.
    ///
    /// A primary transport error, error status or malformed body counts the
    /// same as an unusable reply. `elapsed_secs` covers only the call that
    /// produced the returned answer.
    ///
    /// # Errors
    ///
    /// - [`QueryError::EmptyQuery`] for a blank query, before any call
    /// - [`QueryError::PrimaryUnavailable`] when the primary fails under
    ///   [`Escalation::Disabled`]
    /// - [`QueryError::SearchFailed`] when both providers fail
    pub async fn ask(&self, query: &str, escalation: Escalation) -> Result<QueryAnswer, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let started = Instant::now();
        match self.primary.answer(query).await {
            Ok(reply) if self.detector.is_usable(&reply.text) => {
                let elapsed_secs = started.elapsed().as_secs_f64();
                tracing::info!(provider = %self.primary.kind(), elapsed_secs, "Query answered");
                return Ok(QueryAnswer {
                    provider: self.primary.kind(),
                    answer: reply.text,
                    query: reply.query,
                    elapsed_secs,
                    results: Vec::new(),
                });
            }
            Ok(_) => {
                tracing::info!(provider = %self.primary.kind(), "Primary reply not usable");
            }
            Err(e) => {
                tracing::warn!(provider = %self.primary.kind(), error = %e, "Primary provider failed");
            }
        }

        if escalation == Escalation::Disabled {
            return Err(QueryError::PrimaryUnavailable);
        }

        tracing::info!(provider = %self.secondary.kind(), "Escalating query");
        let started = Instant::now();
        let reply = self.secondary.answer(query).await.map_err(|e| {
            tracing::error!(provider = %self.secondary.kind(), error = %e, "Secondary provider failed");
            QueryError::SearchFailed(e)
        })?;
        let elapsed_secs = started.elapsed().as_secs_f64();
        tracing::info!(
            provider = %self.secondary.kind(),
            elapsed_secs,
            results = reply.results.len(),
            "Query answered"
        );

        Ok(QueryAnswer {
            provider: self.secondary.kind(),
            answer: reply.text,
            query: reply.query,
            elapsed_secs,
            results: reply.results,
        })
    }
}

/// Canned query for a category shortcut. Unknown categories get a generic
/// headlines query.
pub fn category_query(category: &str) -> &'static str {
    match category {
        "World Events" => "latest world news global developments international affairs current events",
        "Politics" => "political news government elections policy latest political updates",
        "Technology" => "latest technology news AI software development cybersecurity tech trends",
        "Business" => "business news finance markets economy corporate earnings stock market",
        "Health" => "health news medical research wellness fitness nutrition healthcare",
        "Science" => "science news research discoveries climate space exploration scientific breakthroughs",
        "Sports" => "sports news football basketball soccer tennis latest scores championships",
        "Entertainment" => "entertainment news movies music celebrities hollywood awards shows",
        _ => "latest breaking news current events worldwide",
    }
}
