use super::{api_client, fetch_json, HeadlineQuery, NewsSource, NewsSourceEntry, SourceError};
use crate::config::Config;
use crate::feed::parser::{ITEM_DESCRIPTION_LIMIT, UNTITLED};
use crate::feed::FeedItem;
use crate::util::sanitize;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Categories NewsAPI classifies its sources into.
pub const NEWS_API_CATEGORIES: &[&str] = &[
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    category: Option<String>,
}

impl NewsApiSource {
    fn into_entry(self) -> Option<NewsSourceEntry> {
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        let title = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| url.clone());

        Some(NewsSourceEntry {
            url,
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            category: self.category,
        })
    }
}

/// Country used for headlines when the caller gives none.
const DEFAULT_HEADLINE_COUNTRY: &str = "us";
const ARTICLE_PAGE_SIZE: &str = "20";
/// Title NewsAPI puts on articles withdrawn by their publisher.
const REMOVED_ARTICLE_TITLE: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<ArticleSourceRef>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSourceRef {
    name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewsApiArticle {
    fn into_item(self) -> Option<FeedItem> {
        let title = non_blank(self.title);
        if title.as_deref() == Some(REMOVED_ARTICLE_TITLE) {
            return None;
        }

        let description = self
            .description
            .or(self.content)
            .map(|d| sanitize(&d, ITEM_DESCRIPTION_LIMIT))
            .filter(|d| !d.is_empty());

        Some(FeedItem {
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            link: self.url.unwrap_or_default(),
            description,
            author: non_blank(self.author),
            published_at: self.published_at.as_deref().and_then(parse_published),
            thumbnail_url: non_blank(self.url_to_image),
            categories: self
                .source
                .and_then(|s| non_blank(s.name))
                .into_iter()
                .collect(),
        })
    }
}

/// RFC 3339 timestamp to local wall-clock time.
fn parse_published(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Client for the NewsAPI source directory (`/v2/top-headlines/sources`) and
/// its article endpoints (`/v2/top-headlines`, `/v2/everything`).
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl NewsApiClient {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            client: api_client(config)?,
            base_url: config.news_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.news_api_key.clone(),
        })
    }

    /// GETs `{base}{endpoint}` with the API key header and decodes the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(SourceError::NotConfigured("NewsAPI key"))?;

        let url = url::Url::parse_with_params(&format!("{}{endpoint}", self.base_url), params)
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let request = self
            .client
            .get(url)
            .header("X-Api-Key", api_key.expose_secret());
        fetch_json(request).await
    }

    async fn articles(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<FeedItem>, SourceError> {
        let response: ArticlesResponse = self.get(endpoint, params).await?;
        let items: Vec<FeedItem> = response
            .articles
            .into_iter()
            .filter_map(NewsApiArticle::into_item)
            .collect();
        tracing::debug!(endpoint, count = items.len(), "Fetched NewsAPI articles");
        Ok(items)
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn sources(&self, category: Option<&str>) -> Result<Vec<NewsSourceEntry>, SourceError> {
        let mut params = vec![("language", "en")];
        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            params.push(("category", category));
        }
        let response: SourcesResponse = self.get("/v2/top-headlines/sources", &params).await?;

        let entries: Vec<NewsSourceEntry> = response
            .sources
            .into_iter()
            .filter_map(NewsApiSource::into_entry)
            .collect();
        tracing::debug!(count = entries.len(), ?category, "Fetched NewsAPI sources");
        Ok(entries)
    }

    async fn categories(&self) -> Result<Vec<String>, SourceError> {
        Ok(NEWS_API_CATEGORIES.iter().map(|c| (*c).to_string()).collect())
    }

    async fn top_headlines(&self, query: &HeadlineQuery) -> Result<Vec<FeedItem>, SourceError> {
        let mut params = vec![
            (
                "country",
                query.country.as_deref().unwrap_or(DEFAULT_HEADLINE_COUNTRY),
            ),
            ("pageSize", ARTICLE_PAGE_SIZE),
        ];
        if let Some(category) = query.category.as_deref() {
            params.push(("category", category));
        }
        if let Some(keyword) = query.keyword.as_deref() {
            params.push(("q", keyword));
        }
        self.articles("/v2/top-headlines", &params).await
    }

    async fn articles_by_source(&self, source_id: &str) -> Result<Vec<FeedItem>, SourceError> {
        self.articles(
            "/v2/top-headlines",
            &[("sources", source_id), ("pageSize", ARTICLE_PAGE_SIZE)],
        )
        .await
    }

    async fn search_articles(&self, keyword: &str) -> Result<Vec<FeedItem>, SourceError> {
        self.articles(
            "/v2/everything",
            &[
                ("q", keyword),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", ARTICLE_PAGE_SIZE),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
