//! Collaborators the explorer depends on, behind async traits.
//!
//! - [`NewsSource`] - a news provider's source directory and articles ([`newsapi`])
//! - [`WebSearch`] - general web search ([`google`])
//! - [`FeedCatalog`] - curated popular feeds (`storage::Database`)
//! - [`FollowStore`] - a user's followed feed URLs (`storage::Database`)

use crate::config::Config;
use crate::feed::fetcher::{read_limited_bytes, MAX_BODY_SIZE};
use crate::feed::{FeedItem, FetchError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use thiserror::Error;

pub mod google;
pub mod newsapi;

pub use google::GoogleSearchClient;
pub use newsapi::NewsApiClient;

/// Upper bound on the error body kept in [`SourceError::Upstream`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider answered with a non-2xx status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Credentials or settings for the provider are missing
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            // API URLs can carry credentials in their query
            SourceError::Network(err.without_url().to_string())
        }
    }
}

impl From<FetchError> for SourceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => SourceError::Timeout,
            FetchError::Network(e) => SourceError::from(e),
            FetchError::Unreachable(_) => SourceError::Network("Host unreachable".into()),
            FetchError::HttpStatus(status) => SourceError::Upstream {
                status,
                message: String::new(),
            },
            FetchError::TooLarge => SourceError::Decode("Response too large".into()),
        }
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        SourceError::Storage(err.to_string())
    }
}

/// A source listed by a news provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSourceEntry {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl NewsSourceEntry {
    /// Case-insensitive substring match on title, description or category.
    /// A blank keyword matches everything.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return true;
        }

        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&keyword))
    }
}

/// A curated feed from the popular-feed catalog.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogFeed {
    pub feed_url: String,
    pub site_url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub category: Option<String>,
    pub subscriber_count: Option<i64>,
}

/// Filters for a top-headlines lookup. Blank fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlineQuery {
    /// Two-letter country code; the provider default applies when `None`
    pub country: Option<String>,
    pub category: Option<String>,
    pub keyword: Option<String>,
}

/// One web search result. Providers may omit any field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Every source, or only those in `category`.
    async fn sources(&self, category: Option<&str>) -> Result<Vec<NewsSourceEntry>, SourceError>;

    /// Sources matching `keyword`, optionally narrowed to a category.
    async fn search(
        &self,
        keyword: &str,
        category: Option<&str>,
    ) -> Result<Vec<NewsSourceEntry>, SourceError> {
        let sources = self.sources(category).await?;
        Ok(sources.into_iter().filter(|s| s.matches(keyword)).collect())
    }

    async fn categories(&self) -> Result<Vec<String>, SourceError>;

    /// Current headlines as feed items.
    async fn top_headlines(&self, query: &HeadlineQuery) -> Result<Vec<FeedItem>, SourceError>;

    /// Latest articles of one provider source, by the provider's source id.
    async fn articles_by_source(&self, source_id: &str) -> Result<Vec<FeedItem>, SourceError>;

    /// Articles matching `keyword`, newest first.
    async fn search_articles(&self, keyword: &str) -> Result<Vec<FeedItem>, SourceError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait FeedCatalog: Send + Sync {
    async fn find_by_query(&self, query: &str) -> Result<Vec<CatalogFeed>, SourceError>;

    /// Feeds in `category`, or every feed by subscriber count when `None`.
    async fn find_by_category(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CatalogFeed>, SourceError>;

    async fn categories(&self) -> Result<Vec<String>, SourceError>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    async fn followed_urls(&self, user_id: i64) -> Result<HashSet<String>, SourceError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// At most 10 hits, in provider ranking order.
    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, SourceError>;

    fn name(&self) -> &'static str;
}

/// Builds the HTTP client used by the API adapters.
pub(crate) fn api_client(config: &Config) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.feed_connect_timeout())
        .read_timeout(config.feed_read_timeout())
        .build()
        .map_err(SourceError::from)
}

/// Sends `request` and decodes a JSON body, mapping non-2xx answers to
/// [`SourceError::Upstream`]. Bodies share the fetcher's size cap.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    let body = read_limited_bytes(response, MAX_BODY_SIZE).await?;

    if !status.is_success() {
        let message = String::from_utf8_lossy(&body);
        return Err(SourceError::Upstream {
            status: status.as_u16(),
            message: crate::util::truncate_chars(message.trim(), MAX_ERROR_BODY).into_owned(),
        });
    }

    serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(title: &str, description: Option<&str>, category: Option<&str>) -> NewsSourceEntry {
        NewsSourceEntry {
            url: format!("https://{}.example.com", title.to_lowercase()),
            title: title.to_string(),
            description: description.map(str::to_string),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_entry_matches_any_field_case_insensitive() {
        let e = entry("TechCrunch", Some("Startup news"), Some("technology"));
        assert!(e.matches("techcrunch"));
        assert!(e.matches("STARTUP"));
        assert!(e.matches("tech"));
        assert!(e.matches("  nology "));
        assert!(!e.matches("sports"));
    }

    #[test]
    fn test_blank_keyword_matches_everything() {
        assert!(entry("Anything", None, None).matches("   "));
    }

    struct FixedNews(Vec<NewsSourceEntry>);

    #[async_trait]
    impl NewsSource for FixedNews {
        async fn sources(
            &self,
            category: Option<&str>,
        ) -> Result<Vec<NewsSourceEntry>, SourceError> {
            Ok(self
                .0
                .iter()
                .filter(|e| category.is_none() || e.category.as_deref() == category)
                .cloned()
                .collect())
        }

        async fn categories(&self) -> Result<Vec<String>, SourceError> {
            Ok(Vec::new())
        }

        async fn top_headlines(
            &self,
            _query: &HeadlineQuery,
        ) -> Result<Vec<FeedItem>, SourceError> {
            Ok(Vec::new())
        }

        async fn articles_by_source(&self, _source_id: &str) -> Result<Vec<FeedItem>, SourceError> {
            Ok(Vec::new())
        }

        async fn search_articles(&self, _keyword: &str) -> Result<Vec<FeedItem>, SourceError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_default_search_filters_sources() {
        let news = FixedNews(vec![
            entry("Wired", Some("Gadgets and culture"), Some("technology")),
            entry("ESPN", Some("Sports coverage"), Some("sports")),
            entry("Ars", Some("Tech culture"), Some("technology")),
        ]);

        let hits = news.search("culture", None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Wired");

        let hits = news.search("culture", Some("sports")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_json_caps_body_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b' '; MAX_BODY_SIZE + 1]))
            .mount(&server)
            .await;

        let client = api_client(&Config::default()).unwrap();
        let err = fetch_json::<serde_json::Value>(client.get(server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Decode(ref m) if m.contains("too large")));
    }
}
