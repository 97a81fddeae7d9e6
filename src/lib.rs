//! News aggregation over many RSS sources, plus free-text questions answered
//! by a generative provider with a search fallback.
//!
//! - [`feed`] - Refresh cycles: fetch, parse, classify, merge
//! - [`query`] - Primary/secondary answer orchestration
//! - [`classify`] - Keyword category rules
//! - [`config`] - TOML configuration
//! - [`types`] - Shared data model

pub mod classify;
pub mod config;
pub mod feed;
pub mod query;
pub mod types;
pub mod util;
