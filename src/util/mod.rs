//! Utility functions for common operations.
//!
//! - **Text processing**: markup stripping and character-based truncation for
//!   feed summaries
//! - **URL validation**: scheme checks for feed URLs before fetching
//!
//! # Examples
//!
//! ```
//! use hn_digest::util::{clean_summary, truncate_chars, validate_feed_url};
//!
//! assert_eq!(clean_summary("<p>Hello\nworld</p>"), "Hello world");
//! assert_eq!(truncate_chars("Hello World", 8), "Hello...");
//! assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
//! ```

mod text;
mod url_validator;

pub use text::{clean_summary, decode_entities, strip_tags, truncate_chars, SUMMARY_MAX_CHARS};
pub use url_validator::{validate_feed_url, UrlValidationError};
