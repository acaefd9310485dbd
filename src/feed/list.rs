use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::opml::parse_opml;

/// Reference feed list compiled into the binary, used when no `--feeds`
/// path is given.
const BUNDLED_FEEDS: &str = include_str!("../../references/feeds.json");

/// Errors loading the feed list. All of them abort the run.
#[derive(Debug, Error)]
pub enum FeedListError {
    #[error("Failed to read feed list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON feed list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid OPML feed list: {0}")]
    Opml(String),
}

/// One configured feed source.
///
/// Serialised as `{"name": ..., "xmlUrl": ...}`; other keys in the feed list
/// (such as `htmlUrl`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub name: String,
    #[serde(rename = "xmlUrl")]
    pub url: String,
}

/// Loads the feed list from `path`.
///
/// Files ending in `.opml` or `.xml` are read as OPML, everything else as a
/// JSON array of `{name, xmlUrl}` objects.
pub async fn load_feeds(path: &Path) -> Result<Vec<FeedDescriptor>, FeedListError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FeedListError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let feeds = if is_opml_path(path) {
        parse_opml(&content)?
    } else {
        parse_feed_list_json(&content)?
    };

    tracing::debug!(path = %path.display(), feeds = feeds.len(), "Loaded feed list");
    Ok(feeds)
}

/// Parses the compiled-in reference feed list.
pub fn bundled_feeds() -> Result<Vec<FeedDescriptor>, FeedListError> {
    parse_feed_list_json(BUNDLED_FEEDS)
}

/// Parses a JSON array of `{name, xmlUrl}` objects.
pub fn parse_feed_list_json(content: &str) -> Result<Vec<FeedDescriptor>, FeedListError> {
    Ok(serde_json::from_str(content)?)
}

fn is_opml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("opml") || ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}
