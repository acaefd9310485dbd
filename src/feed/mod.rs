//! Feed retrieval: loading the feed list, fetching feeds concurrently, and
//! parsing RSS/Atom entries into articles.
//!
//! - [`list`] - the `{name, xmlUrl}` feed list (JSON, OPML, or the bundled default)
//! - [`fetcher`] - bounded-concurrency fetching with per-request and overall timeouts
//! - [`parser`] - `feed-rs` parsing, date resolution, and entry normalisation
//!
//! # Example
//!
//! ```ignore
//! use hn_digest::feed::{build_client, bundled_feeds, fetch_all, FetchOptions, USER_AGENT};
//!
//! let feeds = bundled_feeds()?;
//! let client = build_client(USER_AGENT)?;
//! let report = fetch_all(&client, &feeds, &FetchOptions::default()).await;
//! println!("{}", serde_json::to_string_pretty(&report.articles)?);
//! ```

mod fetcher;
mod list;
mod opml;
mod parser;

pub use fetcher::{
    build_client, fetch_all, fetch_feed, FeedFetchResult, FetchError, FetchOptions, FetchReport,
    USER_AGENT,
};
pub use list::{bundled_feeds, load_feeds, parse_feed_list_json, FeedDescriptor, FeedListError};
pub use opml::parse_opml;
pub use parser::{parse_feed, parse_timestamp, ParseResult, ParsedEntry};
