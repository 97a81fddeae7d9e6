//! Utility functions shared by the feed pipeline and the provider clients.
//!
//! - **Text**: markup stripping, entity decoding and width-aware truncation
//!   for feed titles and descriptions
//! - **URLs**: validation of source locators and service endpoints
//!
//! # Examples
//!
//! ```
//! use glean::util::{strip_markup, truncate_with_marker, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! let text = strip_markup("<p>Breaking <em>news</em></p>");
//! assert_eq!(truncate_with_marker(&text, 8), "Breaking...");
//! ```

mod text;
mod url_validator;

pub use text::{strip_control_chars, strip_markup, truncate_with_marker, TRUNCATION_MARKER};
pub use url_validator::{validate_endpoint, validate_url, UrlValidationError};
