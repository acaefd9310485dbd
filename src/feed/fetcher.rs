use crate::article::{apply_limit, sort_newest_first, Article};
use crate::feed::list::FeedDescriptor;
use crate::feed::parser::{parse_feed, ParseResult};
use crate::util::{validate_feed_url, UrlValidationError};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// `User-Agent` sent with every feed request.
pub const USER_AGENT: &str = "HN-RSS-Digest/1.0";

const MAX_REDIRECTS: usize = 5;

/// Upper bound for the overall budget; larger values mean "no deadline".
const MAX_OVERALL_TIMEOUT: Duration = Duration::from_secs(86400 * 365 * 30);

/// Errors that can occur while fetching a single feed.
///
/// None of these abort a run: the orchestrator logs them against the feed
/// name and carries on with the other feeds.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed URL is unparsable or not http(s)
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-request timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Tuning knobs for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// How far back an entry may be published and still count as recent.
    pub lookback: TimeDelta,
    /// Maximum number of articles in the final list; 0 means unlimited.
    pub limit: usize,
    /// Number of feeds fetched at the same time.
    pub concurrency: usize,
    /// Wall-clock budget for the whole run.
    pub overall_timeout: Duration,
    /// Budget for downloading one feed, independent of `overall_timeout`.
    pub request_timeout: Duration,
    /// Bodies longer than this are cut off, not rejected.
    pub max_body_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            lookback: TimeDelta::hours(24),
            limit: 50,
            concurrency: 10,
            overall_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            max_body_bytes: 512 * 1024,
        }
    }
}

/// Outcome for one feed.
#[derive(Debug)]
pub struct FeedFetchResult {
    /// Name of the feed that was fetched
    pub feed: String,
    /// Number of recent articles found, or the error that occurred
    pub result: Result<usize, FetchError>,
}

/// Everything a fetch run produced.
#[derive(Debug)]
pub struct FetchReport {
    /// Recent articles, newest first, capped at the configured limit.
    pub articles: Vec<Article>,
    /// One entry per feed that finished before the deadline, in completion order.
    pub results: Vec<FeedFetchResult>,
    /// True when the overall budget ran out before every feed finished.
    pub timed_out: bool,
    /// Number of feeds dropped unfinished when the budget ran out.
    pub abandoned: usize,
}

impl FetchReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_err()).count()
    }
}

/// Builds the HTTP client shared by all feed fetches.
///
/// Sets the identifying `User-Agent` and a redirect policy that stops after
/// a few hops or when a URL repeats.
pub fn build_client(user_agent: &str) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(redirect_policy())
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {})", MAX_REDIRECTS));
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Fetches all feeds concurrently and returns the recent articles.
///
/// The cutoff (`now - lookback`) is computed once and shared by every fetch.
/// Up to `concurrency` feeds are in flight at once; each one is independent
/// and its failure only costs that feed's articles. Failures are logged as
/// warnings naming the feed.
///
/// When `overall_timeout` elapses, feeds still in flight are dropped, which
/// cancels their requests, and the run continues with what has arrived.
/// The final list is sorted newest first and truncated to `limit`.
pub async fn fetch_all(
    client: &reqwest::Client,
    feeds: &[FeedDescriptor],
    options: &FetchOptions,
) -> FetchReport {
    let now = Utc::now();
    let cutoff = now
        .checked_sub_signed(options.lookback)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    tracing::info!(
        feeds = feeds.len(),
        cutoff = %cutoff,
        workers = options.concurrency,
        "Fetching feeds"
    );

    let deadline = run_deadline(tokio::time::Instant::now(), options.overall_timeout);
    let mut articles = Vec::new();
    let mut results = Vec::with_capacity(feeds.len());
    let mut timed_out = false;

    {
        let mut pending = stream::iter(feeds)
            .map(|feed| async move {
                let result = fetch_feed(client, feed, cutoff, options).await;
                (feed, result)
            })
            .buffer_unordered(options.concurrency.max(1));

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((feed, result))) => {
                    let result = match result {
                        Ok(mut found) => {
                            let count = found.len();
                            articles.append(&mut found);
                            Ok(count)
                        }
                        Err(e) => {
                            tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Failed to fetch feed");
                            Err(e)
                        }
                    };
                    results.push(FeedFetchResult {
                        feed: feed.name.clone(),
                        result,
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }
        // `pending` is dropped here, cancelling any unfinished fetches
    }

    let abandoned = feeds.len() - results.len();
    if timed_out {
        tracing::warn!(
            completed = results.len(),
            abandoned = abandoned,
            timeout_secs = options.overall_timeout.as_secs(),
            "Overall timeout reached, proceeding with collected articles"
        );
    }

    let collected = articles.len();
    sort_newest_first(&mut articles);
    apply_limit(&mut articles, options.limit);

    let report = FetchReport {
        articles,
        results,
        timed_out,
        abandoned,
    };

    tracing::info!(
        collected = collected,
        emitted = report.articles.len(),
        failed = report.failed(),
        "Fetch complete"
    );

    report
}

/// Deadline for a run starting at `start`, saturating instead of overflowing
/// for absurdly large budgets.
fn run_deadline(start: tokio::time::Instant, budget: Duration) -> tokio::time::Instant {
    let budget = budget.min(MAX_OVERALL_TIMEOUT);
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + Duration::from_secs(86400))
}

/// Fetches one feed and returns its entries published at or after `cutoff`.
///
/// Makes a single attempt: the download (request and body) is bounded by
/// `options.request_timeout` and the body is cut at `options.max_body_bytes`.
/// Entries without a resolvable date, title, or link are skipped.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - URL is unparsable or not http(s)
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::Timeout`] - Download exceeded `request_timeout`
/// - [`FetchError::Parse`] - Invalid RSS/Atom XML with nothing recoverable
pub async fn fetch_feed(
    client: &reqwest::Client,
    feed: &FeedDescriptor,
    cutoff: DateTime<Utc>,
    options: &FetchOptions,
) -> Result<Vec<Article>, FetchError> {
    let url = validate_feed_url(&feed.url)?;

    let bytes = tokio::time::timeout(
        options.request_timeout,
        download(client, url, options.max_body_bytes),
    )
    .await
    .map_err(|_| FetchError::Timeout)??;

    let ParseResult { entries, recovered } =
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    if recovered {
        tracing::debug!(
            feed = %feed.name,
            entries = entries.len(),
            "Feed document was malformed, kept entries before the damage"
        );
    }

    let total = entries.len();
    let articles: Vec<Article> = entries
        .into_iter()
        .filter_map(|entry| entry.into_article(&feed.name, cutoff))
        .collect();

    tracing::debug!(
        feed = %feed.name,
        entries = total,
        recent = articles.len(),
        "Parsed feed"
    );

    Ok(articles)
}

async fn download(client: &reqwest::Client, url: Url, limit: usize) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_capped_bytes(response, limit).await
}

/// Reads at most `limit` bytes of the body and stops there; the rest of the
/// response is never pulled off the wire.
async fn read_capped_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    let initial = response
        .content_length()
        .map(|len| (len as usize).min(limit))
        .unwrap_or(0);
    let mut bytes = Vec::with_capacity(initial);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit - bytes.len();
        if chunk.len() >= room {
            bytes.extend_from_slice(&chunk[..room]);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss_with_items(items: &[(&str, DateTime<Utc>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, published)| {
                format!(
                    "<item><title>{title}</title><link>https://example.com/{title}</link>\
                     <pubDate>{}</pubDate><description>About {title}</description></item>",
                    published.to_rfc2822()
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{body}</channel></rss>"#)
    }

    fn descriptor(server: &MockServer) -> FeedDescriptor {
        FeedDescriptor {
            name: "Test Feed".into(),
            url: format!("{}/feed", server.uri()),
        }
    }

    fn day_ago() -> DateTime<Utc> {
        Utc::now() - TimeDelta::hours(24)
    }

    #[tokio::test]
    async fn test_fetch_filters_by_cutoff() {
        let now = Utc::now();
        let body = rss_with_items(&[
            ("fresh", now - TimeDelta::hours(1)),
            ("stale", now - TimeDelta::hours(48)),
        ]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = build_client(USER_AGENT).unwrap();
        let articles = fetch_feed(&client, &descriptor(&server), day_ago(), &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "fresh");
        assert_eq!(articles[0].feed, "Test Feed");
        assert_eq!(articles[0].summary, "About fresh");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1) // single attempt, no retries
            .mount(&server)
            .await;

        let client = build_client(USER_AGENT).unwrap();
        let result = fetch_feed(&client, &descriptor(&server), day_ago(), &FetchOptions::default()).await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&server)
            .await;

        let client = build_client(USER_AGENT).unwrap();
        let result = fetch_feed(&client, &descriptor(&server), day_ago(), &FetchOptions::default()).await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss_with_items(&[])))
            .mount(&server)
            .await;

        let client = build_client(USER_AGENT).unwrap();
        let articles = fetch_feed(&client, &descriptor(&server), day_ago(), &FetchOptions::default())
            .await
            .unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(rss_with_items(&[]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let options = FetchOptions {
            request_timeout: Duration::from_millis(200),
            ..FetchOptions::default()
        };
        let client = build_client(USER_AGENT).unwrap();
        let result = fetch_feed(&client, &descriptor(&server), day_ago(), &options).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_body_cap_keeps_complete_items() {
        let now = Utc::now();
        let items: Vec<(String, DateTime<Utc>)> = (0..40)
            .map(|i| (format!("post{i}"), now - TimeDelta::minutes(i)))
            .collect();
        let refs: Vec<(&str, DateTime<Utc>)> = items.iter().map(|(t, d)| (t.as_str(), *d)).collect();
        let body = rss_with_items(&refs);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
            .mount(&server)
            .await;

        let options = FetchOptions {
            max_body_bytes: body.len() / 2,
            ..FetchOptions::default()
        };
        let client = build_client(USER_AGENT).unwrap();
        let articles = fetch_feed(&client, &descriptor(&server), day_ago(), &options)
            .await
            .unwrap();

        assert!(!articles.is_empty());
        assert!(articles.len() < 40);
        assert_eq!(articles[0].title, "post0");
    }

    #[tokio::test]
    async fn test_invalid_scheme_rejected_before_request() {
        let feed = FeedDescriptor {
            name: "Local file".into(),
            url: "file:///etc/passwd".into(),
        };
        let client = build_client(USER_AGENT).unwrap();
        let result = fetch_feed(&client, &feed, day_ago(), &FetchOptions::default()).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_run_deadline_saturates() {
        let start = tokio::time::Instant::now();
        assert_eq!(
            run_deadline(start, Duration::from_secs(60)),
            start + Duration::from_secs(60)
        );
        assert_eq!(
            run_deadline(start, Duration::from_secs(u64::MAX)),
            start + MAX_OVERALL_TIMEOUT
        );
    }

    #[tokio::test]
    async fn test_fetch_all_huge_timeout_does_not_panic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(rss_with_items(&[("ok", Utc::now() - TimeDelta::minutes(5))])),
            )
            .mount(&server)
            .await;

        let options = FetchOptions {
            overall_timeout: Duration::from_secs(u64::MAX),
            ..FetchOptions::default()
        };
        let client = build_client(USER_AGENT).unwrap();
        let report = fetch_all(&client, &[descriptor(&server)], &options).await;

        assert!(!report.timed_out);
        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_list() {
        let client = build_client(USER_AGENT).unwrap();
        let report = fetch_all(&client, &[], &FetchOptions::default()).await;
        assert!(report.articles.is_empty());
        assert!(report.results.is_empty());
        assert!(!report.timed_out);
        assert_eq!(report.abandoned, 0);
    }
}
