//! Fetch recent articles from a list of RSS/Atom feeds and render them as a
//! daily digest.
//!
//! The two halves only meet through a JSON array of [`Article`]:
//!
//! - [`feed`] fetches every feed concurrently under an overall deadline and
//!   produces the article list (`fetch-feeds` binary)
//! - [`digest`] renders that list as Markdown or a chat message
//!   (`generate-digest` binary)

pub mod article;
pub mod config;
pub mod digest;
pub mod feed;
pub mod util;

pub use article::Article;
