//! Configuration file parser for ~/.config/glean/config.toml.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`, which includes a built-in source list and the
//! default category rules. Unknown top-level keys are accepted but logged.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::classify::{default_rules, CategoryRule, Classifier};
use crate::feed::{
    FetchSettings, ParseOptions, DEFAULT_DESCRIPTION_CHARS, DEFAULT_MAX_SOURCES, DEFAULT_PROXY_URL,
};
use crate::query::{generative, search, PhraseDetector, SearchOptions};
use crate::types::Source;

pub const PRIMARY_API_KEY_ENV: &str = "GLEAN_PRIMARY_API_KEY";
pub const SECONDARY_API_KEY_ENV: &str = "GLEAN_SECONDARY_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The `Debug` impls of the provider sections redact API keys.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fetch proxy endpoint. Must be HTTPS unless it points at localhost.
    pub proxy_url: String,

    /// Active sources fetched per refresh cycle, in list order.
    pub max_sources_per_cycle: usize,

    /// Display width descriptions are truncated to.
    pub description_chars: usize,

    /// Per-request timeout applied by the shared HTTP client.
    pub request_timeout_secs: u64,

    /// Phrases added to the built-in refusal list.
    pub extra_fallback_phrases: Vec<String>,

    pub primary: PrimaryConfig,

    pub secondary: SecondaryConfig,

    /// Ordered source list. Replaces the built-in list when present.
    pub sources: Vec<Source>,

    /// Ordered category rules. Replaces the built-in rules when present.
    pub categories: Vec<CategoryRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            max_sources_per_cycle: DEFAULT_MAX_SOURCES,
            description_chars: DEFAULT_DESCRIPTION_CHARS,
            request_timeout_secs: 20,
            extra_fallback_phrases: Vec::new(),
            primary: PrimaryConfig::default(),
            secondary: SecondaryConfig::default(),
            sources: default_sources(),
            categories: default_rules(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// `[primary]`: the generative answer provider.
#[derive(Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    pub base_url: String,
    pub model: String,
    /// Overridden by `GLEAN_PRIMARY_API_KEY`.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            base_url: generative::DEFAULT_BASE_URL.to_string(),
            model: generative::DEFAULT_MODEL.to_string(),
            api_key: None,
            max_output_tokens: generative::DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: generative::DEFAULT_TEMPERATURE,
        }
    }
}

impl std::fmt::Debug for PrimaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// `[secondary]`: the news search provider.
#[derive(Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    pub base_url: String,
    /// Overridden by `GLEAN_SECONDARY_API_KEY`.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub search_depth: String,
    pub max_results: u32,
    pub days: u32,
    pub include_images: bool,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            base_url: search::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            search_depth: options.search_depth,
            max_results: options.max_results,
            days: options.days,
            include_images: options.include_images,
        }
    }
}

impl std::fmt::Debug for SecondaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("search_depth", &self.search_depth)
            .field("max_results", &self.max_results)
            .field("days", &self.days)
            .field("include_images", &self.include_images)
            .finish()
    }
}

impl SecondaryConfig {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            search_depth: self.search_depth.clone(),
            max_results: self.max_results,
            days: self.days,
            include_images: self.include_images,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "proxy_url",
        "max_sources_per_cycle",
        "description_chars",
        "request_timeout_secs",
        "extra_fallback_phrases",
        "primary",
        "secondary",
        "sources",
        "categories",
    ];

    /// Load configuration from a TOML file, then apply API key overrides
    /// from the environment.
    ///
    /// - Missing file → defaults
    /// - Empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Over 1 MB → `Err(ConfigError::TooLarge)`
    /// - Unknown top-level keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            categories = config.categories.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Environment values take precedence over keys from the file. Empty
    /// values are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(PRIMARY_API_KEY_ENV) {
            self.primary.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = non_empty(SECONDARY_API_KEY_ENV) {
            self.secondary.api_key = Some(SecretString::from(key));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            proxy_url: self.proxy_url.clone(),
            parse: ParseOptions {
                description_chars: self.description_chars,
            },
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.categories.clone())
    }

    pub fn detector(&self) -> PhraseDetector {
        PhraseDetector::default().with_extra_phrases(&self.extra_fallback_phrases)
    }
}

/// Built-in source list used when the config file has no `[[sources]]`.
pub fn default_sources() -> Vec<Source> {
    [
        ("1", "http://feeds.abcnews.com/abcnews/usheadlines", "ABC News US"),
        ("2", "http://rss.cnn.com/rss/cnn_topstories.rss", "CNN Top Stories"),
        ("3", "http://feeds.bbci.co.uk/news/world/rss.xml", "BBC World News"),
        ("4", "http://rss.nytimes.com/services/xml/rss/nyt/Politics.xml", "NY Times Politics"),
        ("5", "http://rss.nytimes.com/services/xml/rss/nyt/Business.xml", "NY Times Business"),
        ("6", "https://techcrunch.com/feed/", "TechCrunch"),
        ("7", "https://www.wired.com/feed/rss", "Wired"),
        ("8", "http://feeds.bbci.co.uk/news/health/rss.xml", "BBC Health"),
        ("9", "http://feeds.bbci.co.uk/news/science_and_environment/rss.xml", "BBC Science"),
        ("10", "https://www.espn.com/espn/rss/news", "ESPN"),
    ]
    .into_iter()
    .map(|(id, url, title)| Source::new(id, url, title))
    .collect()
}

// ============================================================================
// Tests
// ============================================================================
