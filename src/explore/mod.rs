//! Feed exploration: merges news, catalog, web and Reddit results for one request.
//!
//! Every operation is best-effort. Each collaborator lookup runs under
//! [`Config::lookup_timeout`] and a failing lookup is logged and skipped; only
//! aggregate-level messages reach the caller.

mod follow;
mod merge;
mod types;

pub use follow::{annotate_follow_state, FollowSnapshot, Followable};
pub use merge::{dedup_by_feed_url, dedup_hits_by_host, normalize_categories};
pub use types::{
    DiscoverResult, DiscoveredFeed, KeywordSearchResponse, RecommendedSite,
    SubredditSearchResult, UNKNOWN_FEED_TITLE,
};

use crate::config::Config;
use crate::feed::{
    parse_feed, FeedItem, FetchError, FetchKind, Fetcher, RedditReader, SiteDiscoverer, SiteFeed,
    SubredditFeed,
};
use crate::sources::{
    FeedCatalog, FollowStore, HeadlineQuery, NewsSource, SearchHit, SourceError, WebSearch,
};
use crate::util::{favicon_for_domain, host_of, sanitize, site_base_url, validate_url};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;

/// Web search hits kept after host dedup.
pub const MAX_RECOMMENDED_SITES: usize = 8;
/// Character cap for a recommended site's snippet.
pub const SITE_DESCRIPTION_LIMIT: usize = 150;

pub const ALL_SOURCES_UNAVAILABLE: &str = "All feed sources are currently unavailable";

/// Entry point for every discovery operation.
pub struct Explorer {
    config: Config,
    fetcher: Fetcher,
    discoverer: SiteDiscoverer,
    reddit: RedditReader,
    news: Arc<dyn NewsSource>,
    catalog: Arc<dyn FeedCatalog>,
    follows: Arc<dyn FollowStore>,
    web_search: Option<Arc<dyn WebSearch>>,
}

/// Result of one collaborator lookup inside an aggregate request.
enum Lookup<T> {
    Done(T),
    Failed,
    Skipped,
}

impl<T> Lookup<T> {
    fn from_option(value: Option<T>) -> Self {
        value.map_or(Lookup::Failed, Lookup::Done)
    }
}

impl Explorer {
    pub fn new(
        config: Config,
        news: Arc<dyn NewsSource>,
        catalog: Arc<dyn FeedCatalog>,
        follows: Arc<dyn FollowStore>,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&config)?;
        let discoverer = SiteDiscoverer::new(fetcher.clone(), config.feed_paths.clone())
            .block_private_hosts(config.block_private_hosts);
        let reddit = RedditReader::new(fetcher.clone(), config.reddit_base_url.clone());

        Ok(Self {
            config,
            fetcher,
            discoverer,
            reddit,
            news,
            catalog,
            follows,
            web_search: None,
        })
    }

    /// Enables web search for query discovery and keyword search.
    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web_search);
        self
    }

    // ========================================================================
    // Aggregated discovery
    // ========================================================================

    /// Searches news sources, the catalog and (when configured) the web for
    /// `query`, then merges the results in that order.
    pub async fn discover_by_query(&self, query: &str, category: Option<&str>) -> DiscoverResult {
        let query = query.trim();
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        tracing::debug!(query = %query, ?category, "Discovering feeds by query");

        let news = self.bounded(self.news.name(), self.news.search(query, category));
        let catalog = self.bounded("catalog", async {
            let feeds = self.catalog.find_by_query(query).await?;
            Ok(match category {
                Some(cat) => feeds
                    .into_iter()
                    .filter(|f| f.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(cat)))
                    .collect(),
                None => feeds,
            })
        });
        let web = async {
            let Some(web_search) = &self.web_search else {
                return Lookup::Skipped;
            };
            match self.bounded(web_search.name(), web_search.search(query)).await {
                Some(hits) => Lookup::Done(self.discover_from_hits(hits).await),
                None => Lookup::Failed,
            }
        };
        let snapshot = FollowSnapshot::load(self.follows.as_ref(), self.config.user_id);

        let (news, catalog, web, snapshot) = tokio::join!(news, catalog, web, snapshot);

        let lookups = vec![
            Lookup::from_option(news.map(|entries| {
                entries
                    .into_iter()
                    .map(DiscoveredFeed::from_news_source)
                    .collect::<Vec<_>>()
            })),
            Lookup::from_option(catalog.map(|feeds| {
                feeds
                    .into_iter()
                    .map(DiscoveredFeed::from_catalog)
                    .collect::<Vec<_>>()
            })),
            web,
        ];

        Self::fold_lookups(query, lookups, &snapshot)
    }

    /// News sources and catalog feeds for `category`, or everything when `None`.
    pub async fn discover_by_category(&self, category: Option<&str>) -> DiscoverResult {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        tracing::debug!(?category, "Discovering feeds by category");

        let news = self.bounded(self.news.name(), self.news.sources(category));
        let catalog = self.bounded("catalog", self.catalog.find_by_category(category));
        let snapshot = FollowSnapshot::load(self.follows.as_ref(), self.config.user_id);

        let (news, catalog, snapshot) = tokio::join!(news, catalog, snapshot);

        let lookups = vec![
            Lookup::from_option(news.map(|entries| {
                entries
                    .into_iter()
                    .map(DiscoveredFeed::from_news_source)
                    .collect::<Vec<_>>()
            })),
            Lookup::from_option(catalog.map(|feeds| {
                feeds
                    .into_iter()
                    .map(DiscoveredFeed::from_catalog)
                    .collect::<Vec<_>>()
            })),
        ];

        Self::fold_lookups(category.unwrap_or_default(), lookups, &snapshot)
    }

    /// Categories known to the news provider and the catalog.
    pub async fn list_categories(&self) -> Vec<String> {
        let (news, catalog) = tokio::join!(
            self.bounded(self.news.name(), self.news.categories()),
            self.bounded("catalog", self.catalog.categories()),
        );

        normalize_categories(news.into_iter().chain(catalog).flatten())
    }

    /// Concatenates successful lookups in provenance order, dedups by
    /// `feed_url` and annotates follow state.
    fn fold_lookups(
        query: &str,
        lookups: Vec<Lookup<Vec<DiscoveredFeed>>>,
        snapshot: &FollowSnapshot,
    ) -> DiscoverResult {
        let mut attempted = 0;
        let mut failed = 0;
        let mut feeds = Vec::new();

        for lookup in lookups {
            match lookup {
                Lookup::Done(found) => {
                    attempted += 1;
                    feeds.extend(found);
                }
                Lookup::Failed => {
                    attempted += 1;
                    failed += 1;
                }
                Lookup::Skipped => {}
            }
        }

        let mut feeds = dedup_by_feed_url(feeds);
        snapshot.annotate(&mut feeds);

        let message = if !feeds.is_empty() {
            None
        } else if attempted > 0 && failed == attempted {
            Some(ALL_SOURCES_UNAVAILABLE.to_string())
        } else {
            Some(format!("No feeds found for '{query}'"))
        };

        tracing::info!(query = %query, total = feeds.len(), failed, "Discovery finished");

        DiscoverResult {
            query: query.to_string(),
            total_count: feeds.len(),
            feeds,
            message,
        }
    }

    /// Host dedup → live discovery on each site. Sites are bounded one by
    /// one, so a slow site only loses its own feed.
    async fn discover_from_hits(&self, hits: Vec<SearchHit>) -> Vec<DiscoveredFeed> {
        let sites: Vec<String> = dedup_hits_by_host(hits)
            .into_iter()
            .take(MAX_RECOMMENDED_SITES)
            .filter_map(|hit| hit.link)
            .filter(|link| host_of(link).is_some())
            .map(|link| site_base_url(&link))
            .collect();

        stream::iter(sites)
            .map(|site| async move { self.discover_site(&site).await })
            .buffered(self.config.discovery_concurrency.max(1))
            .filter_map(|found| async move { found.map(DiscoveredFeed::from_site) })
            .collect()
            .await
    }

    /// Site discovery under the lookup timeout; a site that runs over counts
    /// as having no feed.
    async fn discover_site(&self, site: &str) -> Option<SiteFeed> {
        match tokio::time::timeout(self.config.lookup_timeout(), self.discoverer.discover(site))
            .await
        {
            Ok(found) => found,
            Err(_) => {
                tracing::warn!(site = %site, "Site discovery timed out");
                None
            }
        }
    }

    // ========================================================================
    // Single feed
    // ========================================================================

    /// Fetches and previews the feed at `feed_url`.
    pub async fn discover_feed_by_url(&self, feed_url: &str) -> Option<DiscoveredFeed> {
        let feed_url = feed_url.trim();

        if self.config.block_private_hosts {
            if let Err(e) = validate_url(feed_url) {
                tracing::warn!(url = %feed_url, error = %e, "Rejected feed URL");
                return None;
            }
        }

        let (fetched, snapshot) = tokio::join!(
            self.fetcher.fetch(feed_url, FetchKind::Feed),
            FollowSnapshot::load(self.follows.as_ref(), self.config.user_id),
        );

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %feed_url, error = %e, "Failed to fetch feed");
                return None;
            }
        };

        let parsed = match parse_feed(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %feed_url, error = %e, "Failed to parse feed");
                return None;
            }
        };

        let mut feed = DiscoveredFeed::from_parsed(feed_url.to_string(), parsed);
        feed.is_followed = snapshot.contains(&feed.feed_url);
        tracing::info!(url = %feed_url, title = %feed.title, "Parsed feed");
        Some(feed)
    }

    // ========================================================================
    // Reddit
    // ========================================================================

    pub async fn discover_subreddit(&self, name: &str) -> Option<SubredditFeed> {
        let (feed, snapshot) = tokio::join!(
            self.reddit.fetch(name),
            FollowSnapshot::load(self.follows.as_ref(), self.config.user_id),
        );

        feed.map(|mut feed| {
            feed.is_followed = snapshot.contains(&feed.feed_url);
            feed
        })
    }

    /// Feeds for the configured popular subreddits, in list order.
    /// Subreddits that cannot be fetched are left out.
    pub async fn discover_popular_subreddits(&self) -> Vec<SubredditFeed> {
        self.fetch_subreddits(&self.config.popular_subreddits).await
    }

    /// Suggested subreddits whose name contains `query` (case-insensitive).
    pub async fn search_subreddits(&self, query: &str) -> SubredditSearchResult {
        let needle = query.trim().to_lowercase();
        let matching: Vec<String> = self
            .config
            .subreddit_suggestions
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        tracing::debug!(query = %query, matches = matching.len(), "Subreddit suggestions");

        let suggestions = self.fetch_subreddits(&matching).await;

        SubredditSearchResult {
            query: query.trim().to_string(),
            count: suggestions.len(),
            suggestions,
        }
    }

    async fn fetch_subreddits(&self, names: &[String]) -> Vec<SubredditFeed> {
        let fetched = stream::iter(names)
            .map(|name| self.reddit.fetch(name))
            .buffered(self.config.discovery_concurrency.max(1))
            .filter_map(|feed| async move { feed });

        let (mut feeds, snapshot) = tokio::join!(
            fetched.collect::<Vec<_>>(),
            FollowSnapshot::load(self.follows.as_ref(), self.config.user_id),
        );

        snapshot.annotate(&mut feeds);
        feeds
    }

    // ========================================================================
    // Keyword site search
    // ========================================================================

    /// Searches the web for sites about `keyword` and looks for a feed on each.
    pub async fn search_by_keyword(&self, keyword: &str) -> KeywordSearchResponse {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return KeywordSearchResponse::empty(keyword, "Please enter a keyword");
        }

        let hits = match &self.web_search {
            Some(web_search) => {
                tracing::debug!(provider = web_search.name(), keyword = %keyword, "Keyword search");
                self.bounded_result(web_search.search(keyword)).await
            }
            None => Err(SourceError::NotConfigured("Web search")),
        };

        let hits = match hits {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(keyword = %keyword, error = %e, "Web search failed");
                return KeywordSearchResponse::empty(keyword, format!("Search failed: {e}"));
            }
        };

        if hits.is_empty() {
            return KeywordSearchResponse::empty(keyword, "No search results");
        }

        let sites: Vec<RecommendedSite> = stream::iter(
            dedup_hits_by_host(hits)
                .into_iter()
                .take(MAX_RECOMMENDED_SITES),
        )
        .map(|hit| self.recommend_site(hit))
        .buffered(self.config.discovery_concurrency.max(1))
        .collect()
        .await;

        tracing::info!(keyword = %keyword, sites = sites.len(), "Keyword search finished");

        KeywordSearchResponse {
            keyword: keyword.to_string(),
            total_results: sites.len(),
            sites,
            message: None,
        }
    }

    async fn recommend_site(&self, hit: SearchHit) -> RecommendedSite {
        let url = hit.link.unwrap_or_default();
        let domain = host_of(&url).unwrap_or_default();

        let site_feed = if domain.is_empty() {
            None
        } else {
            self.discover_site(&site_base_url(&url)).await
        };

        let title = hit
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| domain.clone());

        RecommendedSite {
            title,
            description: hit
                .snippet
                .map(|s| sanitize(&s, SITE_DESCRIPTION_LIMIT))
                .filter(|s| !s.is_empty()),
            favicon_url: favicon_for_domain(&domain),
            has_feed: site_feed.is_some(),
            preview_articles: site_feed
                .as_ref()
                .map(|site| site.preview_articles())
                .unwrap_or_default(),
            feed_url: site_feed.map(|site| site.feed_url),
            url,
        }
    }

    // ========================================================================
    // News articles
    // ========================================================================

    /// Current headlines from the news provider. Blank filters are dropped.
    pub async fn top_headlines(
        &self,
        country: Option<&str>,
        category: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<Vec<FeedItem>, SourceError> {
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let query = HeadlineQuery {
            country: non_blank(country),
            category: non_blank(category),
            keyword: non_blank(keyword),
        };

        self.article_lookup(self.news.top_headlines(&query)).await
    }

    /// Latest articles of one news source, by provider source id.
    pub async fn articles_by_source(&self, source_id: &str) -> Result<Vec<FeedItem>, SourceError> {
        let source_id = source_id.trim();
        if source_id.is_empty() {
            return Ok(Vec::new());
        }
        self.article_lookup(self.news.articles_by_source(source_id)).await
    }

    /// Articles matching `keyword` across the news provider, newest first.
    pub async fn search_articles(&self, keyword: &str) -> Result<Vec<FeedItem>, SourceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        self.article_lookup(self.news.search_articles(keyword)).await
    }

    async fn article_lookup<F>(&self, lookup: F) -> Result<Vec<FeedItem>, SourceError>
    where
        F: Future<Output = Result<Vec<FeedItem>, SourceError>>,
    {
        let result = self.bounded_result(lookup).await;
        let source = self.news.name();
        match &result {
            Ok(items) => tracing::info!(source, items = items.len(), "Fetched articles"),
            Err(e) => tracing::warn!(source, error = %e, "Article lookup failed"),
        }
        result
    }

    // ========================================================================
    // Lookup bounding
    // ========================================================================

    /// Runs a lookup under the lookup timeout; failures are logged and become `None`.
    async fn bounded<T, F>(&self, source: &'static str, lookup: F) -> Option<T>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        match self.bounded_result(lookup).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(source, error = %e, "Lookup failed, continuing without it");
                None
            }
        }
    }

    async fn bounded_result<T, F>(&self, lookup: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        tokio::time::timeout(self.config.lookup_timeout(), lookup)
            .await
            .unwrap_or(Err(SourceError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{CatalogFeed, NewsSourceEntry};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // --- Fake collaborators ---

    #[derive(Clone)]
    enum Behavior<T> {
        Answer(T),
        Fail,
        Hang,
    }

    impl<T: Clone> Behavior<T> {
        async fn run(&self) -> Result<T, SourceError> {
            match self {
                Behavior::Answer(value) => Ok(value.clone()),
                Behavior::Fail => Err(SourceError::Upstream {
                    status: 500,
                    message: "boom".into(),
                }),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    struct FakeNews {
        sources: Behavior<Vec<NewsSourceEntry>>,
        categories: Behavior<Vec<String>>,
        articles: Behavior<Vec<FeedItem>>,
        /// Article requests as received, e.g. `search:rust`
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeNews {
        async fn record(&self, call: String) -> Result<Vec<FeedItem>, SourceError> {
            self.calls.lock().unwrap().push(call);
            self.articles.run().await
        }
    }

    #[async_trait]
    impl NewsSource for FakeNews {
        async fn sources(
            &self,
            _category: Option<&str>,
        ) -> Result<Vec<NewsSourceEntry>, SourceError> {
            self.sources.run().await
        }

        async fn categories(&self) -> Result<Vec<String>, SourceError> {
            self.categories.run().await
        }

        async fn top_headlines(
            &self,
            query: &HeadlineQuery,
        ) -> Result<Vec<FeedItem>, SourceError> {
            self.record(format!(
                "headlines:{:?}:{:?}:{:?}",
                query.country, query.category, query.keyword
            ))
            .await
        }

        async fn articles_by_source(&self, source_id: &str) -> Result<Vec<FeedItem>, SourceError> {
            self.record(format!("source:{source_id}")).await
        }

        async fn search_articles(&self, keyword: &str) -> Result<Vec<FeedItem>, SourceError> {
            self.record(format!("search:{keyword}")).await
        }

        fn name(&self) -> &'static str {
            "fake-news"
        }
    }

    struct FakeCatalog {
        feeds: Behavior<Vec<CatalogFeed>>,
        categories: Behavior<Vec<String>>,
    }

    #[async_trait]
    impl FeedCatalog for FakeCatalog {
        async fn find_by_query(&self, _query: &str) -> Result<Vec<CatalogFeed>, SourceError> {
            self.feeds.run().await
        }

        async fn find_by_category(
            &self,
            category: Option<&str>,
        ) -> Result<Vec<CatalogFeed>, SourceError> {
            let feeds = self.feeds.run().await?;
            Ok(feeds
                .into_iter()
                .filter(|f| category.is_none() || f.category.as_deref() == category)
                .collect())
        }

        async fn categories(&self) -> Result<Vec<String>, SourceError> {
            self.categories.run().await
        }
    }

    struct FakeFollows(Behavior<HashSet<String>>);

    #[async_trait]
    impl FollowStore for FakeFollows {
        async fn followed_urls(&self, _user_id: i64) -> Result<HashSet<String>, SourceError> {
            self.0.run().await
        }
    }

    struct FakeWeb(Behavior<Vec<SearchHit>>);

    #[async_trait]
    impl WebSearch for FakeWeb {
        async fn search(&self, _keyword: &str) -> Result<Vec<SearchHit>, SourceError> {
            self.0.run().await
        }

        fn name(&self) -> &'static str {
            "fake-web"
        }
    }

    // --- Fixtures ---

    fn news_entry(url: &str, title: &str) -> NewsSourceEntry {
        NewsSourceEntry {
            url: url.to_string(),
            title: title.to_string(),
            description: Some(format!("{title} headlines")),
            category: Some("technology".to_string()),
        }
    }

    fn catalog_feed(url: &str, title: &str, category: &str) -> CatalogFeed {
        CatalogFeed {
            feed_url: url.to_string(),
            site_url: None,
            title: title.to_string(),
            description: None,
            favicon_url: None,
            category: Some(category.to_string()),
            subscriber_count: Some(10),
        }
    }

    fn hit(title: Option<&str>, link: &str, snippet: Option<&str>) -> SearchHit {
        SearchHit {
            title: title.map(str::to_string),
            link: Some(link.to_string()),
            snippet: snippet.map(str::to_string),
        }
    }

    fn test_config() -> Config {
        Config {
            lookup_timeout_secs: 2,
            block_private_hosts: false,
            ..Config::default()
        }
    }

    struct Setup {
        config: Config,
        news: Behavior<Vec<NewsSourceEntry>>,
        news_categories: Behavior<Vec<String>>,
        articles: Behavior<Vec<FeedItem>>,
        news_calls: Arc<Mutex<Vec<String>>>,
        catalog: Behavior<Vec<CatalogFeed>>,
        catalog_categories: Behavior<Vec<String>>,
        follows: Behavior<HashSet<String>>,
        web: Option<Behavior<Vec<SearchHit>>>,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                config: test_config(),
                news: Behavior::Answer(Vec::new()),
                news_categories: Behavior::Answer(Vec::new()),
                articles: Behavior::Answer(Vec::new()),
                news_calls: Arc::default(),
                catalog: Behavior::Answer(Vec::new()),
                catalog_categories: Behavior::Answer(Vec::new()),
                follows: Behavior::Answer(HashSet::new()),
                web: None,
            }
        }
    }

    impl Setup {
        fn build(self) -> Explorer {
            let explorer = Explorer::new(
                self.config,
                Arc::new(FakeNews {
                    sources: self.news,
                    categories: self.news_categories,
                    articles: self.articles,
                    calls: self.news_calls,
                }),
                Arc::new(FakeCatalog {
                    feeds: self.catalog,
                    categories: self.catalog_categories,
                }),
                Arc::new(FakeFollows(self.follows)),
            )
            .unwrap();

            match self.web {
                Some(web) => explorer.with_web_search(Arc::new(FakeWeb(web))),
                None => explorer,
            }
        }
    }

    const RSS_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Mock Site</title>
  <link>https://mock.example</link>
  <description>A mocked feed</description>
  <item><title>First</title><link>https://mock.example/1</link></item>
  <item><title>Second</title><link>https://mock.example/2</link></item>
  <item><title>Third</title><link>https://mock.example/3</link></item>
  <item><title>Fourth</title><link>https://mock.example/4</link></item>
</channel></rss>"#;

    async fn mount_site_with_feed(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head></html>"#,
            ))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
            .mount(server)
            .await;
    }

    // --- discover_by_query ---

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_news_does_not_block_catalog() {
        let explorer = Setup {
            news: Behavior::Hang,
            catalog: Behavior::Answer(vec![
                catalog_feed("https://a.example/rss", "A", "tech"),
                catalog_feed("https://b.example/rss", "B", "tech"),
                catalog_feed("https://c.example/rss", "C", "tech"),
            ]),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("tech", None).await;

        assert_eq!(result.total_count, 3);
        assert_eq!(result.feeds.len(), 3);
        assert_eq!(result.message, None);
    }

    #[tokio::test]
    async fn test_every_source_failing_reports_unavailable() {
        let explorer = Setup {
            news: Behavior::Fail,
            catalog: Behavior::Fail,
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("rust", None).await;

        assert!(result.feeds.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.message.as_deref(), Some(ALL_SOURCES_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_empty_without_failures_reports_no_feeds() {
        let explorer = Setup::default().build();

        let result = explorer.discover_by_query("  rust ", None).await;

        assert_eq!(result.query, "rust");
        assert_eq!(result.message.as_deref(), Some("No feeds found for 'rust'"));
    }

    #[tokio::test]
    async fn test_news_entry_wins_duplicate_and_order_is_provenance() {
        let explorer = Setup {
            news: Behavior::Answer(vec![news_entry("https://x.example/rss", "From news")]),
            catalog: Behavior::Answer(vec![
                catalog_feed("https://y.example/rss", "Only in catalog", "tech"),
                catalog_feed("https://x.example/rss", "From catalog", "tech"),
            ]),
            follows: Behavior::Answer(["https://y.example/rss".to_string()].into()),
            ..Setup::default()
        }
        .build();

        // Matches the news entry's title; the fake catalog ignores the query
        let result = explorer.discover_by_query("from", None).await;

        let titles: Vec<&str> = result.feeds.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["From news", "Only in catalog"]);
        assert_eq!(result.total_count, 2);
        assert!(!result.feeds[0].is_followed);
        assert!(result.feeds[1].is_followed);
    }

    #[tokio::test]
    async fn test_follow_store_failure_still_returns_feeds() {
        let explorer = Setup {
            catalog: Behavior::Answer(vec![catalog_feed("https://a.example/rss", "A", "tech")]),
            follows: Behavior::Fail,
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("a", None).await;

        assert_eq!(result.total_count, 1);
        assert!(!result.feeds[0].is_followed);
    }

    #[tokio::test]
    async fn test_category_narrows_catalog_matches() {
        let explorer = Setup {
            catalog: Behavior::Answer(vec![
                catalog_feed("https://a.example/rss", "A", "technology"),
                catalog_feed("https://b.example/rss", "B", "sports"),
            ]),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("a", Some("Technology")).await;

        assert_eq!(result.total_count, 1);
        assert_eq!(result.feeds[0].feed_url, "https://a.example/rss");
    }

    #[tokio::test]
    async fn test_web_discovery_appended_after_catalog() {
        let server = MockServer::start().await;
        mount_site_with_feed(&server).await;

        let explorer = Setup {
            catalog: Behavior::Answer(vec![catalog_feed("https://a.example/rss", "A", "tech")]),
            web: Some(Behavior::Answer(vec![
                hit(Some("Mock"), &format!("{}/some/article", server.uri()), None),
                hit(Some("Same host"), &format!("{}/other", server.uri()), None),
            ])),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("mock", None).await;

        assert_eq!(result.total_count, 2);
        assert_eq!(result.feeds[0].feed_url, "https://a.example/rss");
        let discovered = &result.feeds[1];
        assert_eq!(discovered.feed_url, format!("{}/feed.xml", server.uri()));
        assert_eq!(discovered.title, "Mock Site");
        assert!(discovered
            .site_url
            .as_deref()
            .is_some_and(|s| s.starts_with("https://mock.example")));
        assert_eq!(discovered.items.len(), 4);
    }

    #[tokio::test]
    async fn test_slow_site_does_not_drop_fast_site_feed() {
        let fast = MockServer::start().await;
        mount_site_with_feed(&fast).await;

        // Distinct host from the fast server, so host dedup keeps both hits
        let listener = std::net::TcpListener::bind("127.0.0.2:0").unwrap();
        let slow = MockServer::builder().listener(listener).start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RSS_FEED)
                    .set_delay(Duration::from_secs(4)),
            )
            .mount(&slow)
            .await;

        let explorer = Setup {
            web: Some(Behavior::Answer(vec![
                hit(Some("Slow"), &format!("{}/post", slow.uri()), None),
                hit(Some("Fast"), &format!("{}/post", fast.uri()), None),
            ])),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("mock", None).await;

        assert_eq!(result.message, None);
        assert_eq!(result.total_count, 1);
        assert_eq!(result.feeds[0].feed_url, format!("{}/feed.xml", fast.uri()));
    }

    #[tokio::test]
    async fn test_web_failure_alone_is_not_total_failure() {
        let explorer = Setup {
            web: Some(Behavior::Fail),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_query("rust", None).await;
        assert_eq!(result.message.as_deref(), Some("No feeds found for 'rust'"));
    }

    // --- discover_by_category / list_categories ---

    #[tokio::test]
    async fn test_discover_by_category_merges_both() {
        let explorer = Setup {
            news: Behavior::Answer(vec![news_entry("https://news.example", "News")]),
            catalog: Behavior::Answer(vec![
                catalog_feed("https://a.example/rss", "A", "technology"),
                catalog_feed("https://b.example/rss", "B", "sports"),
            ]),
            ..Setup::default()
        }
        .build();

        let result = explorer.discover_by_category(Some("technology")).await;

        assert_eq!(result.query, "technology");
        let urls: Vec<&str> = result.feeds.iter().map(|f| f.feed_url.as_str()).collect();
        assert_eq!(urls, vec!["https://news.example", "https://a.example/rss"]);

        let everything = explorer.discover_by_category(None).await;
        assert_eq!(everything.total_count, 3);
    }

    #[tokio::test]
    async fn test_list_categories_merged_and_sorted() {
        let explorer = Setup {
            news_categories: Behavior::Answer(vec!["technology".into(), "business".into()]),
            catalog_categories: Behavior::Answer(vec!["Programming".into(), "technology".into()]),
            ..Setup::default()
        }
        .build();

        assert_eq!(
            explorer.list_categories().await,
            vec!["Business", "Programming", "Technology"]
        );
    }

    #[tokio::test]
    async fn test_list_categories_skips_failures() {
        let explorer = Setup {
            news_categories: Behavior::Answer(vec!["health".into()]),
            catalog_categories: Behavior::Fail,
            ..Setup::default()
        }
        .build();

        assert_eq!(explorer.list_categories().await, vec!["Health"]);
    }

    // --- discover_feed_by_url ---

    #[tokio::test]
    async fn test_feed_by_url_maps_and_marks_followed() {
        let server = MockServer::start().await;
        mount_site_with_feed(&server).await;
        let feed_url = format!("{}/feed.xml", server.uri());

        let explorer = Setup {
            follows: Behavior::Answer([feed_url.clone()].into()),
            ..Setup::default()
        }
        .build();

        let feed = explorer.discover_feed_by_url(&feed_url).await.unwrap();

        assert_eq!(feed.feed_url, feed_url);
        assert_eq!(feed.title, "Mock Site");
        assert_eq!(feed.description.as_deref(), Some("A mocked feed"));
        assert_eq!(
            feed.favicon_url.as_deref(),
            Some("https://www.google.com/s2/favicons?domain=mock.example&sz=64")
        );
        assert!(feed.is_followed);
    }

    #[tokio::test]
    async fn test_feed_by_url_not_a_feed_is_none() {
        let server = MockServer::start().await;
        mount_site_with_feed(&server).await;

        let explorer = Setup::default().build();
        assert!(explorer.discover_feed_by_url(&server.uri()).await.is_none());
        assert!(explorer
            .discover_feed_by_url(&format!("{}/missing.xml", server.uri()))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_feed_by_url_blocks_private_hosts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
            .expect(0)
            .mount(&server)
            .await;

        let explorer = Setup {
            config: Config {
                block_private_hosts: true,
                ..test_config()
            },
            ..Setup::default()
        }
        .build();

        assert!(explorer
            .discover_feed_by_url(&format!("{}/feed.xml", server.uri()))
            .await
            .is_none());
    }

    // --- Reddit ---

    const SUBREDDIT_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Subreddit</title><id>s</id><updated>2024-03-01T10:00:00Z</updated>
  <entry><title>Post</title><id>p1</id><updated>2024-03-01T10:00:00Z</updated>
    <link href="https://www.reddit.com/r/x/comments/1/"/></entry>
</feed>"#;

    async fn mount_subreddits(server: &MockServer, names: &[&str]) {
        for name in names {
            Mock::given(method("GET"))
                .and(path(format!("/r/{name}/.rss")))
                .respond_with(ResponseTemplate::new(200).set_body_string(SUBREDDIT_FEED))
                .mount(server)
                .await;
        }
    }

    fn reddit_config(server: &MockServer, popular: &[&str], suggestions: &[&str]) -> Config {
        Config {
            reddit_base_url: server.uri(),
            popular_subreddits: popular.iter().map(|s| s.to_string()).collect(),
            subreddit_suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            ..test_config()
        }
    }

    #[tokio::test]
    async fn test_popular_subreddits_keep_order_and_drop_failures() {
        let server = MockServer::start().await;
        mount_subreddits(&server, &["rust", "golang"]).await;

        let explorer = Setup {
            config: reddit_config(&server, &["rust", "missing", "golang"], &[]),
            follows: Behavior::Answer([format!("{}/r/golang/.rss", server.uri())].into()),
            ..Setup::default()
        }
        .build();

        let feeds = explorer.discover_popular_subreddits().await;

        let names: Vec<&str> = feeds.iter().map(|f| f.subreddit.as_str()).collect();
        assert_eq!(names, vec!["rust", "golang"]);
        assert!(!feeds[0].is_followed);
        assert!(feeds[1].is_followed);
    }

    #[tokio::test]
    async fn test_search_subreddits_filters_suggestions() {
        let server = MockServer::start().await;
        mount_subreddits(&server, &["programming", "learnprogramming", "rust"]).await;

        let explorer = Setup {
            config: reddit_config(&server, &[], &["programming", "rust", "learnprogramming"]),
            ..Setup::default()
        }
        .build();

        let result = explorer.search_subreddits(" PROG ").await;

        assert_eq!(result.query, "PROG");
        assert_eq!(result.count, 2);
        let names: Vec<&str> = result.suggestions.iter().map(|f| f.subreddit.as_str()).collect();
        assert_eq!(names, vec!["programming", "learnprogramming"]);
    }

    #[tokio::test]
    async fn test_discover_subreddit_marks_follow_state() {
        let server = MockServer::start().await;
        mount_subreddits(&server, &["rust"]).await;

        let explorer = Setup {
            config: reddit_config(&server, &[], &[]),
            follows: Behavior::Answer([format!("{}/r/rust/.rss", server.uri())].into()),
            ..Setup::default()
        }
        .build();

        let feed = explorer.discover_subreddit("r/rust").await.unwrap();
        assert!(feed.is_followed);
        assert!(explorer.discover_subreddit("nope").await.is_none());
    }

    // --- search_by_keyword ---

    #[tokio::test]
    async fn test_keyword_messages() {
        let blank = Setup {
            web: Some(Behavior::Answer(Vec::new())),
            ..Setup::default()
        }
        .build();
        assert_eq!(
            blank.search_by_keyword("   ").await.message.as_deref(),
            Some("Please enter a keyword")
        );
        assert_eq!(
            blank.search_by_keyword("rust").await.message.as_deref(),
            Some("No search results")
        );

        let failing = Setup {
            web: Some(Behavior::Fail),
            ..Setup::default()
        }
        .build();
        let response = failing.search_by_keyword("rust").await;
        assert_eq!(response.total_results, 0);
        assert_eq!(
            response.message.as_deref(),
            Some("Search failed: Upstream returned 500: boom")
        );

        let unconfigured = Setup::default().build();
        assert_eq!(
            unconfigured.search_by_keyword("rust").await.message.as_deref(),
            Some("Search failed: Web search is not configured")
        );
    }

    #[tokio::test]
    async fn test_keyword_results_capped_at_eight() {
        let hits: Vec<SearchHit> = (0..10)
            .map(|i| hit(Some(&format!("Result {i}")), &format!("no-host-{i}"), None))
            .collect();
        let explorer = Setup {
            web: Some(Behavior::Answer(hits)),
            ..Setup::default()
        }
        .build();

        let response = explorer.search_by_keyword("rust").await;

        assert_eq!(response.total_results, MAX_RECOMMENDED_SITES);
        assert_eq!(response.sites.len(), MAX_RECOMMENDED_SITES);
        assert_eq!(response.sites[7].title, "Result 7");
        assert!(response.sites.iter().all(|s| !s.has_feed && s.feed_url.is_none()));
    }

    #[tokio::test]
    async fn test_keyword_site_with_feed_has_previews() {
        let server = MockServer::start().await;
        mount_site_with_feed(&server).await;
        let long_snippet = "snippet ".repeat(40);

        let explorer = Setup {
            web: Some(Behavior::Answer(vec![
                hit(None, &format!("{}/blog/post", server.uri()), Some(&long_snippet)),
                hit(Some("Duplicate host"), &format!("{}/else", server.uri()), None),
            ])),
            ..Setup::default()
        }
        .build();

        let response = explorer.search_by_keyword("mock").await;

        assert_eq!(response.total_results, 1);
        assert_eq!(response.message, None);
        let site = &response.sites[0];
        assert_eq!(site.title, "127.0.0.1");
        assert_eq!(site.url, format!("{}/blog/post", server.uri()));
        assert!(site.has_feed);
        assert_eq!(site.feed_url, Some(format!("{}/feed.xml", server.uri())));
        assert_eq!(site.preview_articles.len(), 3);
        assert_eq!(site.preview_articles[0].title, "First");
        assert!(site.description.as_ref().unwrap().chars().count() <= SITE_DESCRIPTION_LIMIT);
        assert_eq!(
            site.favicon_url,
            "https://www.google.com/s2/favicons?domain=127.0.0.1&sz=64"
        );
    }

    // --- News articles ---

    fn article(title: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            link: format!("https://news.example/{title}"),
            description: None,
            author: None,
            published_at: None,
            thumbnail_url: None,
            categories: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_top_headlines_drops_blank_filters() {
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();
        let explorer = Setup {
            articles: Behavior::Answer(vec![article("one"), article("two")]),
            news_calls: calls.clone(),
            ..Setup::default()
        }
        .build();

        let items = explorer
            .top_headlines(Some(" gb "), Some("  "), None)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            [r#"headlines:Some("gb"):None:None"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_article_queries_skip_provider() {
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();
        let explorer = Setup {
            articles: Behavior::Answer(vec![article("unused")]),
            news_calls: calls.clone(),
            ..Setup::default()
        }
        .build();

        assert!(explorer.search_articles("   ").await.unwrap().is_empty());
        assert!(explorer.articles_by_source("").await.unwrap().is_empty());
        assert!(calls.lock().unwrap().is_empty());

        explorer.search_articles(" rust ").await.unwrap();
        explorer.articles_by_source("bbc-news").await.unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            ["search:rust".to_string(), "source:bbc-news".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_article_lookup_errors_propagate() {
        let explorer = Setup {
            articles: Behavior::Fail,
            ..Setup::default()
        }
        .build();
        assert!(matches!(
            explorer.search_articles("rust").await,
            Err(SourceError::Upstream { status: 500, .. })
        ));

        let explorer = Setup {
            articles: Behavior::Hang,
            ..Setup::default()
        }
        .build();
        assert!(matches!(
            explorer.articles_by_source("bbc-news").await,
            Err(SourceError::Timeout)
        ));
    }
}
