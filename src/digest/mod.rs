//! Digest rendering: turns the fetcher's article list into a Markdown
//! document or a chat-message variant for bot destinations, in English or
//! Chinese.

mod render;
mod templates;

pub use render::{
    display_summary, format_timestamp, group_by_feed, DigestFormat, Grouping, RenderOptions,
    Renderer, TimeStyle, DEFAULT_SUMMARY_MAX,
};
pub use templates::{Labels, Language};
