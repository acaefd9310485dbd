use crate::article::{parse_iso_timestamp, Article};
use crate::util::clean_summary;
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser::{self, ParseFeedError};

/// One entry of a feed document before it is normalised into an [`Article`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Published date, falling back to the updated date.
    pub published: Option<DateTime<Utc>>,
    /// Raw summary (often HTML), falling back to the content body.
    pub summary: Option<String>,
}

/// Outcome of parsing one feed document.
#[derive(Debug)]
pub struct ParseResult {
    pub entries: Vec<ParsedEntry>,
    /// True when the document was malformed (typically cut off at the body
    /// size cap) and only the complete entries before the damage were kept.
    pub recovered: bool,
}

/// Parses RSS or Atom bytes into entries.
///
/// If the document does not parse as-is, it is closed after its last
/// complete `</item>` or `</entry>` and parsed again, so a feed truncated by
/// the body size cap still yields the entries that arrived in full. The
/// original error is returned only when that recovery also fails.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, ParseFeedError> {
    match parse_entries(bytes) {
        Ok(entries) => Ok(ParseResult {
            entries,
            recovered: false,
        }),
        Err(err) => match close_truncated_document(bytes) {
            Some(repaired) => match parse_entries(&repaired) {
                Ok(entries) if !entries.is_empty() => Ok(ParseResult {
                    entries,
                    recovered: true,
                }),
                _ => Err(err),
            },
            None => Err(err),
        },
    }
}

fn parse_entries(bytes: &[u8]) -> Result<Vec<ParsedEntry>, ParseFeedError> {
    let feed = parser::Builder::new()
        .timestamp_parser(parse_timestamp)
        .build()
        .parse(bytes)?;

    Ok(feed.entries.into_iter().map(ParsedEntry::from).collect())
}

impl From<Entry> for ParsedEntry {
    fn from(entry: Entry) -> Self {
        let link = preferred_link(&entry.links).map(|l| l.href.clone());
        let published = entry.published.or(entry.updated);
        let summary = entry
            .summary
            .map(|s| s.content)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.and_then(|c| c.body));
        let title = entry.title.map(|t| t.content);

        Self {
            title,
            link,
            published,
            summary,
        }
    }
}

/// Picks the entry's permalink: the first `alternate` (or rel-less) link,
/// otherwise the first link of any kind.
fn preferred_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}

impl ParsedEntry {
    /// Normalises the entry into an article, or `None` when it must be
    /// dropped: no resolvable date, older than `cutoff`, or missing a title
    /// or link.
    pub fn into_article(self, feed_name: &str, cutoff: DateTime<Utc>) -> Option<Article> {
        let published = self.published?;
        if published < cutoff {
            return None;
        }

        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        let link = self.link.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || link.is_empty() {
            return None;
        }

        Some(Article {
            title: title.to_string(),
            link: link.to_string(),
            published: Some(published),
            feed: feed_name.to_string(),
            summary: self.summary.as_deref().map(clean_summary).unwrap_or_default(),
        })
    }
}

/// Layouts tried after RFC 3339 and RFC 2822, all carrying a UTC offset.
const OFFSET_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%A, %d %B %Y %H:%M:%S %z",
];

/// Parses a feed date string into a UTC instant.
///
/// Installed as the `feed-rs` timestamp parser, so it sees every raw
/// `pubDate`/`published`/`updated` value. Tries RFC 3339 and RFC 2822 first,
/// then common free-text layouts seen in the wild (`UTC` zone names, missing
/// seconds, full day names), and finally offset-less ISO forms taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // "UTC" and "Z" are not valid RFC 2822 zones but show up regularly
    let normalised = normalise_zone_suffix(s);
    let candidate = normalised.as_deref().unwrap_or(s);
    if normalised.is_some() {
        if let Ok(dt) = DateTime::parse_from_rfc2822(candidate) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    parse_iso_timestamp(s)
}

fn normalise_zone_suffix(s: &str) -> Option<String> {
    ["UTC", "Z"]
        .iter()
        .find_map(|zone| s.strip_suffix(*zone))
        .filter(|head| head.ends_with(' '))
        .map(|head| format!("{}+0000", head))
}

/// Closes a truncated document after its last complete item so it can be
/// reparsed. Returns `None` when no complete item is present.
fn close_truncated_document(bytes: &[u8]) -> Option<Vec<u8>> {
    const RSS_ITEM_END: &[u8] = b"</item>";
    const ATOM_ENTRY_END: &[u8] = b"</entry>";

    let (end, closing): (usize, &[u8]) = if let Some(pos) = rfind_bytes(bytes, RSS_ITEM_END) {
        (pos + RSS_ITEM_END.len(), b"</channel></rss>")
    } else if let Some(pos) = rfind_bytes(bytes, ATOM_ENTRY_END) {
        (pos + ATOM_ENTRY_END.len(), b"</feed>")
    } else {
        return None;
    };

    let mut repaired = Vec::with_capacity(end + closing.len());
    repaired.extend_from_slice(&bytes[..end]);
    repaired.extend_from_slice(closing);
    Some(repaired)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
