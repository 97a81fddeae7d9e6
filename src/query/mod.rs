//! Free-text queries answered by a primary provider with a secondary
//! fallback.
//!
//! - [`provider`] - The [`AnswerProvider`] seam and shared HTTP decoding
//! - [`generative`] - Primary: hosted generative model
//! - [`search`] - Secondary: news search with ranked results
//! - [`detector`] - Judges whether a primary reply is a refusal
//! - [`orchestrator`] - The primary-then-secondary state machine
//!
//! # Example
//!
//! ```ignore
//! use glean::query::{Escalation, QueryOrchestrator};
//!
//! let orchestrator = QueryOrchestrator::new(Box::new(primary), Box::new(secondary));
//! let answer = orchestrator.ask("chip exports", Escalation::Auto).await?;
//! println!("[{}] {}", answer.provider, answer.answer);
//! ```

pub mod detector;
pub mod generative;
pub mod orchestrator;
pub mod provider;
pub mod search;

pub use detector::{FallbackDetector, PhraseDetector, DEFAULT_FALLBACK_PHRASES};
pub use generative::GenerativeClient;
pub use orchestrator::{category_query, Escalation, QueryError, QueryOrchestrator};
pub use provider::{AnswerProvider, ProviderError, ProviderReply};
pub use search::{SearchClient, SearchOptions};
