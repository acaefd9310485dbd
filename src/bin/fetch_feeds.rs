use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hn_digest::config::Config;
use hn_digest::feed::{build_client, bundled_feeds, fetch_all, load_feeds};

#[derive(Parser, Debug)]
#[command(
    name = "fetch-feeds",
    about = "Fetch recent articles from the configured RSS/Atom feeds as JSON"
)]
struct Args {
    /// Look back N hours (default 24)
    #[arg(long)]
    hours: Option<u32>,

    /// Max articles to output, 0 for no limit (default 50)
    #[arg(long)]
    limit: Option<usize>,

    /// Concurrent workers (default 10)
    #[arg(long)]
    workers: Option<usize>,

    /// Path to the feed list (JSON or OPML); defaults to the bundled list
    #[arg(long, value_name = "FILE")]
    feeds: Option<PathBuf>,

    /// Overall timeout in seconds (default 60)
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file (default ~/.config/hn-digest/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries only the JSON array
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut settings = Config::load_or_default(args.config.as_deref())
        .context("Failed to load config file")?
        .fetch;
    if let Some(hours) = args.hours {
        settings.hours = hours;
    }
    if let Some(limit) = args.limit {
        settings.limit = limit;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    if args.feeds.is_some() {
        settings.feeds = args.feeds;
    }

    let feeds = match &settings.feeds {
        Some(path) => load_feeds(path)
            .await
            .with_context(|| format!("Failed to load feed list from {}", path.display()))?,
        None => bundled_feeds().context("Bundled feed list is invalid")?,
    };

    let client = build_client(&settings.user_agent).context("Failed to build HTTP client")?;
    let report = fetch_all(&client, &feeds, &settings.to_fetch_options()).await;

    tracing::info!(
        feeds = feeds.len(),
        failed = report.failed(),
        abandoned = report.abandoned,
        articles = report.articles.len(),
        "Done"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report.articles).context("Failed to write JSON")?;
    writeln!(out)?;

    Ok(())
}
