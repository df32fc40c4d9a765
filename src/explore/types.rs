use crate::feed::parser::{FEED_DESCRIPTION_LIMIT, FeedItem, FeedType, ParsedFeed};
use crate::feed::{PreviewArticle, SiteFeed, SubredditFeed};
use crate::sources::{CatalogFeed, NewsSourceEntry};
use crate::util::{favicon_url, sanitize, site_base_url};
use serde::Serialize;

/// Title used when a fetched feed declares none.
pub const UNKNOWN_FEED_TITLE: &str = "Unknown Feed";

/// A feed candidate offered to the user. Identity is `feed_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredFeed {
    pub feed_url: String,
    pub site_url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub feed_type: FeedType,
    pub category: Option<String>,
    pub subscriber_count: Option<i64>,
    pub items: Vec<FeedItem>,
    pub is_followed: bool,
}

impl DiscoveredFeed {
    /// A news provider source; its site URL doubles as the feed URL.
    pub fn from_news_source(entry: NewsSourceEntry) -> Self {
        let site_url = site_base_url(&entry.url);
        Self {
            favicon_url: favicon_url(&site_url),
            site_url: Some(site_url),
            title: entry.title,
            description: non_empty_description(entry.description.as_deref()),
            feed_type: FeedType::Rss,
            category: entry.category,
            subscriber_count: None,
            items: Vec::new(),
            is_followed: false,
            feed_url: entry.url,
        }
    }

    pub fn from_catalog(feed: CatalogFeed) -> Self {
        let site_url = feed
            .site_url
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| site_base_url(&feed.feed_url));
        let favicon = feed
            .favicon_url
            .filter(|f| !f.trim().is_empty())
            .or_else(|| favicon_url(&site_url));

        Self {
            favicon_url: favicon,
            site_url: Some(site_url),
            title: feed.title,
            description: non_empty_description(feed.description.as_deref()),
            feed_type: FeedType::Rss,
            category: feed.category,
            subscriber_count: feed.subscriber_count,
            items: Vec::new(),
            is_followed: false,
            feed_url: feed.feed_url,
        }
    }

    /// A feed fetched live from `feed_url`.
    pub fn from_parsed(feed_url: String, feed: ParsedFeed) -> Self {
        let site_url = feed
            .site_link
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| site_base_url(&feed_url));

        Self {
            favicon_url: favicon_url(&site_url),
            site_url: Some(site_url),
            title: feed.title.unwrap_or_else(|| UNKNOWN_FEED_TITLE.to_string()),
            description: feed.description,
            feed_type: feed.feed_type,
            category: None,
            subscriber_count: None,
            items: feed.items,
            is_followed: false,
            feed_url,
        }
    }

    pub fn from_site(site: SiteFeed) -> Self {
        Self::from_parsed(site.feed_url, site.feed)
    }
}

fn non_empty_description(description: Option<&str>) -> Option<String> {
    description
        .map(|d| sanitize(d, FEED_DESCRIPTION_LIMIT))
        .filter(|d| !d.is_empty())
}

/// Outcome of a query or category lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResult {
    pub query: String,
    pub feeds: Vec<DiscoveredFeed>,
    pub total_count: usize,
    pub message: Option<String>,
}

/// A website found by keyword search, with its feed when one was discovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedSite {
    pub title: String,
    pub url: String,
    pub feed_url: Option<String>,
    pub description: Option<String>,
    pub favicon_url: String,
    pub preview_articles: Vec<PreviewArticle>,
    pub has_feed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSearchResponse {
    pub keyword: String,
    pub total_results: usize,
    pub sites: Vec<RecommendedSite>,
    pub message: Option<String>,
}

impl KeywordSearchResponse {
    pub(crate) fn empty(keyword: &str, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.to_string(),
            total_results: 0,
            sites: Vec::new(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditSearchResult {
    pub query: String,
    pub suggestions: Vec<SubredditFeed>,
    pub count: usize,
}
