use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use super::templates::{Labels, Language};
use crate::article::Article;
use crate::util::truncate_chars;

/// Default display length of a summary in the digest.
pub const DEFAULT_SUMMARY_MAX: usize = 300;

/// Offset used for the header date of chat-message digests (UTC+8).
const CHAT_DATE_OFFSET_SECS: i32 = 8 * 3600;

/// Overall shape of the rendered digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestFormat {
    /// Full Markdown document
    #[default]
    Markdown,
    /// Chat-message Markdown for DingTalk-style bots
    Dingtalk,
}

/// How articles are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// One chronological list
    #[default]
    Flat,
    /// One section per feed, biggest feed first
    ByFeed,
}

/// Granularity of the per-article time badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeStyle {
    /// `YYYY-MM-DD HH:MM`
    #[default]
    Full,
    /// `HH:MM`
    TimeOnly,
}

impl TimeStyle {
    /// Chat messages get the compact badge; documents get the full date.
    pub fn default_for(format: DigestFormat) -> Self {
        match format {
            DigestFormat::Markdown => TimeStyle::Full,
            DigestFormat::Dingtalk => TimeStyle::TimeOnly,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TimeStyle::Full => "%Y-%m-%d %H:%M",
            TimeStyle::TimeOnly => "%H:%M",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: DigestFormat,
    pub language: Language,
    pub grouping: Grouping,
    pub time_style: TimeStyle,
    pub show_summary: bool,
    /// Summaries longer than this are cut to exactly this many characters.
    pub summary_max: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: DigestFormat::default(),
            language: Language::default(),
            grouping: Grouping::default(),
            time_style: TimeStyle::default(),
            show_summary: true,
            summary_max: DEFAULT_SUMMARY_MAX,
        }
    }
}

/// Renders an article list into a digest document.
///
/// Articles are expected in the order the fetcher wrote them (newest first);
/// the renderer never reorders articles within a list or section.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Renders the digest dated today.
    pub fn render(&self, articles: &[Article]) -> String {
        self.render_at(articles, Utc::now())
    }

    /// Renders the digest with the header dated from `now`.
    ///
    /// An empty article list renders as the single localized "no new
    /// articles" sentence and nothing else.
    pub fn render_at(&self, articles: &[Article], now: DateTime<Utc>) -> String {
        let labels = self.options.language.labels();

        if articles.is_empty() {
            return labels.empty.to_string();
        }

        let mut lines: Vec<String> = Vec::new();
        let date = self.header_date(now);
        lines.push(format!("# {}", labels.heading.replace("{date}", &date)));
        lines.push(format!(
            "> {}",
            labels.intro.replace("{count}", &articles.len().to_string())
        ));
        push_separator(&mut lines);

        match self.options.grouping {
            Grouping::Flat => {
                for (i, article) in articles.iter().enumerate() {
                    self.push_entry(&mut lines, labels, i + 1, article, "##");
                }
            }
            Grouping::ByFeed => {
                let mut number = 0;
                for (feed, group) in group_by_feed(articles) {
                    lines.push(format!(
                        "## {}",
                        labels
                            .section
                            .replace("{feed}", feed)
                            .replace("{count}", &group.len().to_string())
                    ));
                    lines.push(String::new());
                    for article in group {
                        number += 1;
                        self.push_entry(&mut lines, labels, number, article, "###");
                    }
                }
            }
        }

        lines.push(labels.footer.to_string());
        lines.join("\n")
    }

    fn header_date(&self, now: DateTime<Utc>) -> String {
        match self.options.format {
            DigestFormat::Markdown => now.format("%Y-%m-%d").to_string(),
            DigestFormat::Dingtalk => match FixedOffset::east_opt(CHAT_DATE_OFFSET_SECS) {
                Some(offset) => now.with_timezone(&offset).format("%Y-%m-%d").to_string(),
                None => now.format("%Y-%m-%d").to_string(),
            },
        }
    }

    fn push_entry(
        &self,
        lines: &mut Vec<String>,
        labels: &Labels,
        number: usize,
        article: &Article,
        heading: &str,
    ) {
        lines.push(format!("{} {}. {}", heading, number, article.title));

        let time = format_timestamp(article.published, self.options.time_style);
        if time.is_empty() {
            lines.push(format!("> {} {}", labels.from, article.feed));
        } else {
            lines.push(format!("> {} {} {}", labels.from, article.feed, time));
        }
        lines.push(String::new());

        if self.options.show_summary {
            let summary = display_summary(&article.summary, self.options.summary_max);
            if !summary.is_empty() {
                lines.push(format!("{}{}", labels.summary, summary));
                lines.push(String::new());
            }
        }

        lines.push(format!("{}[{}]({})", labels.link, labels.read_more, article.link));
        push_separator(lines);
    }
}

fn push_separator(lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
}

/// Formats an article timestamp; unknown dates give an empty string.
pub fn format_timestamp(published: Option<DateTime<Utc>>, style: TimeStyle) -> String {
    published
        .map(|dt| dt.format(style.pattern()).to_string())
        .unwrap_or_default()
}

/// Trims a summary and cuts it to `max` characters (ellipsis included).
pub fn display_summary(summary: &str, max: usize) -> String {
    truncate_chars(summary.trim(), max).into_owned()
}

/// Groups articles by feed name.
///
/// Groups are ordered by size, largest first; equal-sized groups keep the
/// order in which their feed first appears. Articles keep their input order
/// within a group.
pub fn group_by_feed(articles: &[Article]) -> Vec<(&str, Vec<&Article>)> {
    let mut groups: Vec<(&str, Vec<&Article>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for article in articles {
        let feed = article.feed.as_str();
        match index.get(feed) {
            Some(&i) => groups[i].1.push(article),
            None => {
                index.insert(feed, groups.len());
                groups.push((feed, vec![article]));
            }
        }
    }

    // Stable sort keeps first-appearance order among ties
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups
}
