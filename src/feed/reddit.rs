use crate::feed::fetcher::{FetchKind, Fetcher};
use crate::feed::parser::{parse_feed_with_limit, FeedItem};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Icon shown for every subreddit feed.
pub const REDDIT_ICON_URL: &str =
    "https://www.redditstatic.com/desktop2x/img/favicon/android-icon-192x192.png";
/// Character cap for a post's self text.
pub const SELF_TEXT_LIMIT: usize = 300;
const UNKNOWN_AUTHOR: &str = "unknown";

/// A subreddit exposed as a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditFeed {
    /// Normalized name, without the `r/` prefix
    pub subreddit: String,
    pub feed_url: String,
    pub title: String,
    pub description: Option<String>,
    pub icon_url: String,
    pub posts: Vec<RedditPost>,
    pub is_followed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub title: String,
    pub link: String,
    pub author: String,
    pub subreddit: String,
    pub published_at: Option<NaiveDateTime>,
    pub self_text: Option<String>,
}

impl RedditPost {
    fn from_item(item: FeedItem, subreddit: &str) -> Self {
        Self {
            title: item.title,
            link: item.link,
            author: item.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            subreddit: subreddit.to_string(),
            published_at: item.published_at,
            self_text: item.description,
        }
    }
}

/// Trims the name and drops a leading `r/`.
///
/// ```
/// use feedscout::feed::normalize_subreddit;
///
/// assert_eq!(normalize_subreddit("  r/rust "), "rust");
/// assert_eq!(normalize_subreddit("programming"), "programming");
/// ```
pub fn normalize_subreddit(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("r/").unwrap_or(name).trim()
}

/// RSS endpoint of a subreddit under `base_url`.
pub fn subreddit_feed_url(base_url: &str, subreddit: &str) -> String {
    format!("{}/r/{}/.rss", base_url.trim_end_matches('/'), subreddit)
}

/// Reads subreddit feeds from Reddit's public RSS endpoints.
#[derive(Debug, Clone)]
pub struct RedditReader {
    fetcher: Fetcher,
    base_url: String,
}

impl RedditReader {
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Fetches and maps a subreddit's feed.
    ///
    /// Returns `None` for an empty name or when the feed cannot be fetched or
    /// parsed; the cause is logged. `is_followed` is left `false` for the
    /// caller to fill in.
    pub async fn fetch(&self, name: &str) -> Option<SubredditFeed> {
        let subreddit = normalize_subreddit(name);
        if subreddit.is_empty() {
            return None;
        }

        let feed_url = subreddit_feed_url(&self.base_url, subreddit);

        let bytes = match self.fetcher.fetch(&feed_url, FetchKind::Feed).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(subreddit = %subreddit, error = %e, "Failed to fetch subreddit feed");
                return None;
            }
        };

        let parsed = match parse_feed_with_limit(&bytes, SELF_TEXT_LIMIT) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(subreddit = %subreddit, error = %e, "Failed to parse subreddit feed");
                return None;
            }
        };

        let posts = parsed
            .items
            .into_iter()
            .map(|item| RedditPost::from_item(item, subreddit))
            .collect();

        tracing::info!(subreddit = %subreddit, "Parsed subreddit feed");

        Some(SubredditFeed {
            subreddit: subreddit.to_string(),
            feed_url,
            title: parsed.title.unwrap_or_else(|| format!("r/{subreddit}")),
            description: parsed.description,
            icon_url: REDDIT_ICON_URL.to_string(),
            posts,
            is_followed: false,
        })
    }
}
