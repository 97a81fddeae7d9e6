//! Shared data model for the feed pipeline and the query orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned when no rule matches.
pub const DEFAULT_CATEGORY: &str = "General";

// ============================================================================
// Feed Types
// ============================================================================

/// A configured remote feed.
///
/// Owned by whoever persists the feed list. The aggregator only reads the
/// active ones for the duration of a refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    /// URL of the RSS document.
    pub url: String,
    /// Display name, copied onto every item from this source.
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Source {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            category: None,
            is_active: true,
        }
    }
}

/// One normalized entry from a source.
///
/// `link` is the dedup key across sources. `id` is only a stable key for
/// display purposes and carries a random component, so it never matches
/// between refresh cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Publication date exactly as the feed reported it.
    pub pub_date: String,
    /// Parsed form of `pub_date`, `None` when the feed value is unparseable.
    pub published: Option<DateTime<Utc>>,
    pub category: String,
    /// Display name of the source this item came from.
    pub source: String,
    pub image: Option<String>,
    pub is_favorite: bool,
}

// ============================================================================
// Query Types
// ============================================================================

/// Which answer provider produced a [`QueryAnswer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Generative model answering from the prompt alone.
    Primary,
    /// News search with snippets and an inline summary.
    Secondary,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Primary => write!(f, "primary"),
            Provider::Secondary => write!(f, "secondary"),
        }
    }
}

/// A search hit backing a secondary answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Relevance in `[0, 1]`.
    pub score: f64,
    pub published: Option<String>,
    pub image: Option<String>,
}

/// The unified response returned to callers regardless of which provider
/// answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub provider: Provider,
    pub answer: String,
    pub query: String,
    /// Wall-clock time spent in the provider call that produced the answer.
    pub elapsed_secs: f64,
    /// Always empty for [`Provider::Primary`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<SupportingResult>,
}
