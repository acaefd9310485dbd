//! The article record passed from the fetcher to the digest renderer.
//!
//! The JSON array of [`Article`] is the only interface between the two
//! binaries, so the serde shape here is the wire format.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single recent entry from one feed.
///
/// The fetcher only emits articles with a non-empty `title` and `link` and a
/// resolved `published` timestamp. When read back by the renderer every field
/// is optional, and an unparsable `published` value becomes `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(
        default,
        serialize_with = "serialize_published",
        deserialize_with = "deserialize_published"
    )]
    pub published: Option<DateTime<Utc>>,
    /// Display name of the feed the article came from.
    #[serde(default)]
    pub feed: String,
    #[serde(default)]
    pub summary: String,
}

fn serialize_published<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        // Explicit "+00:00" offset rather than "Z"
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_published<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_iso_timestamp))
}

/// Parses an ISO-8601 timestamp as written by the fetcher.
///
/// Accepts RFC 3339 (any offset), naive `YYYY-MM-DDTHH:MM[:SS]` or
/// `YYYY-MM-DD HH:MM[:SS]` (taken as UTC), and a bare date (midnight UTC).
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Sorts articles newest first. Articles without a date go last; ties keep
/// their relative order.
pub fn sort_newest_first(articles: &mut [Article]) {
    // Option orders None below Some, so reversing puts None at the end
    articles.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Keeps at most `limit` articles. A limit of zero means no limit.
pub fn apply_limit(articles: &mut Vec<Article>, limit: usize) {
    if limit > 0 {
        articles.truncate(limit);
    }
}
