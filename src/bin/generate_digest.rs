use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hn_digest::config::Config;
use hn_digest::digest::{DigestFormat, Language, Renderer};
use hn_digest::Article;

#[derive(Parser, Debug)]
#[command(
    name = "generate-digest",
    about = "Generate a daily digest from fetched articles"
)]
struct Args {
    /// Input JSON file (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output format (default: markdown)
    #[arg(short, long, value_enum)]
    format: Option<DigestFormat>,

    /// Output language (default: cn)
    #[arg(short, long, value_enum)]
    lang: Option<Language>,

    /// Group articles into one section per feed, biggest feed first
    #[arg(long)]
    group_by_feed: bool,

    /// Show only HH:MM instead of the full date (default for dingtalk)
    #[arg(long, conflicts_with = "full_time")]
    time_only: bool,

    /// Show the full date even in dingtalk messages
    #[arg(long)]
    full_time: bool,

    /// Leave out article summaries
    #[arg(long)]
    no_summary: bool,

    /// Config file (default ~/.config/hn-digest/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut settings = Config::load_or_default(args.config.as_deref())
        .context("Failed to load config file")?
        .digest;
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(lang) = args.lang {
        settings.lang = lang;
    }
    if args.group_by_feed {
        settings.group_by_feed = true;
    }
    if args.time_only {
        settings.time_only = Some(true);
    } else if args.full_time {
        settings.time_only = Some(false);
    }
    if args.no_summary {
        settings.show_summary = false;
    }
    let options = settings.to_render_options();

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
    };
    let articles: Vec<Article> =
        serde_json::from_str(&raw).context("Input is not a JSON array of articles")?;

    tracing::debug!(articles = articles.len(), format = ?options.format, "Rendering digest");

    println!("{}", Renderer::new(options).render(&articles));
    Ok(())
}
