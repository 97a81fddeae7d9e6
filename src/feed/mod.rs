//! Feed aggregation: fetching, parsing, merging and viewing RSS items.
//!
//! - **Fetching**: proxied retrieval of one source, failures folded into an
//!   empty contribution
//! - **Parsing**: RSS `<item>` extraction with an Atom fallback, producing
//!   classified [`Item`](crate::types::Item)s
//! - **Merging**: dedup by link, newest-first ordering, favorite carry-over
//! - **Filtering**: category, text and favorites views over a merged collection
//!
//! # Architecture
//!
//! - [`aggregator`] - Concurrent refresh cycle over the active sources
//! - [`fetcher`] - Proxy envelope handling and per-source error isolation
//! - [`parser`] - quick-xml event parsing and item normalization
//! - [`merge`] - Pure functions combining per-source batches
//! - [`filter`] - Read-only views for display
//!
//! # Example
//!
//! ```ignore
//! use glean::feed::{Aggregator, FetchSettings};
//!
//! let aggregator = Aggregator::new(client, FetchSettings::default());
//! let items = aggregator.refresh(&sources, &previous).await?;
//! ```

pub mod aggregator;
pub mod fetcher;
pub mod filter;
pub mod merge;
pub mod parser;

pub use aggregator::{AggregateError, Aggregator, DEFAULT_MAX_SOURCES};
pub use fetcher::{fetch_document, fetch_source, FetchError, FetchSettings, DEFAULT_PROXY_URL};
pub use filter::{category_counts, toggle_favorite, ItemFilter};
pub use merge::merge;
pub use parser::{parse_items, parse_pub_date, ParseError, ParseOptions, DEFAULT_DESCRIPTION_CHARS};
