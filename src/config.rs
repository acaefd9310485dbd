//! Configuration file parser for ~/.config/hn-digest/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Command-line flags override whatever the file sets. Unknown keys are
//! accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::digest::{DigestFormat, Grouping, Language, RenderOptions, TimeStyle, DEFAULT_SUMMARY_MAX};
use crate::feed::{FetchOptions, USER_AGENT};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub digest: DigestConfig,
}

/// `[fetch]` section: defaults for `fetch-feeds`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Look back this many hours.
    pub hours: u32,
    /// Maximum articles to output (0 = unlimited).
    pub limit: usize,
    /// Feeds fetched concurrently.
    pub workers: usize,
    /// Overall budget for the run, in seconds.
    pub timeout_secs: u64,
    /// Budget for a single feed download, in seconds.
    pub request_timeout_secs: u64,
    /// Response bodies are cut off after this many bytes.
    pub max_body_bytes: usize,
    pub user_agent: String,
    /// Feed list path; the bundled list is used when unset.
    pub feeds: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let options = FetchOptions::default();
        Self {
            hours: 24,
            limit: options.limit,
            workers: options.concurrency,
            timeout_secs: options.overall_timeout.as_secs(),
            request_timeout_secs: options.request_timeout.as_secs(),
            max_body_bytes: options.max_body_bytes,
            user_agent: USER_AGENT.to_string(),
            feeds: None,
        }
    }
}

impl FetchConfig {
    pub fn to_fetch_options(&self) -> FetchOptions {
        FetchOptions {
            lookback: chrono::TimeDelta::hours(i64::from(self.hours)),
            limit: self.limit,
            concurrency: self.workers.max(1),
            overall_timeout: Duration::from_secs(self.timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// `[digest]` section: defaults for `generate-digest`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub format: DigestFormat,
    pub lang: Language,
    pub group_by_feed: bool,
    /// Show only `HH:MM` per article. Unset means time-only for chat
    /// messages and the full date for Markdown documents.
    pub time_only: Option<bool>,
    pub show_summary: bool,
    pub summary_max: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            format: DigestFormat::default(),
            lang: Language::default(),
            group_by_feed: false,
            time_only: None,
            show_summary: true,
            summary_max: DEFAULT_SUMMARY_MAX,
        }
    }
}

impl DigestConfig {
    pub fn to_render_options(&self) -> RenderOptions {
        RenderOptions {
            format: self.format,
            language: self.lang,
            grouping: if self.group_by_feed {
                Grouping::ByFeed
            } else {
                Grouping::Flat
            },
            time_style: match self.time_only {
                Some(true) => TimeStyle::TimeOnly,
                Some(false) => TimeStyle::Full,
                None => TimeStyle::default_for(self.format),
            },
            show_summary: self.show_summary,
            summary_max: self.summary_max,
        }
    }
}

const KNOWN_KEYS: [(&str, &[&str]); 2] = [
    (
        "fetch",
        &[
            "hours",
            "limit",
            "workers",
            "timeout_secs",
            "request_timeout_secs",
            "max_body_bytes",
            "user_agent",
            "feeds",
        ],
    ),
    (
        "digest",
        &[
            "format",
            "lang",
            "group_by_feed",
            "time_only",
            "show_summary",
            "summary_max",
        ],
    ),
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Default location: `$HOME/.config/hn-digest/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("hn-digest")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise the default path if it exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (key, value) in raw {
        let Some((_, section_keys)) = KNOWN_KEYS.iter().find(|(name, _)| *name == key.as_str()) else {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            continue;
        };
        if let Some(table) = value.as_table() {
            for sub in table.keys() {
                if !section_keys.contains(&sub.as_str()) {
                    tracing::warn!(section = %key, key = %sub, "Unknown key in config file, ignoring");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
