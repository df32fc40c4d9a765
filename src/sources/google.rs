use super::{api_client, fetch_json, SearchHit, SourceError, WebSearch};
use crate::config::Config;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Results requested per query; the Custom Search API maximum.
const RESULTS_PER_QUERY: &str = "10";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl From<SearchItem> for SearchHit {
    fn from(item: SearchItem) -> Self {
        Self {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
        }
    }
}

/// Google Custom Search JSON API client.
pub struct GoogleSearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    cx: String,
}

impl GoogleSearchClient {
    /// Returns `Ok(None)` when the API key or engine id is missing.
    pub fn from_config(config: &Config) -> Result<Option<Self>, SourceError> {
        let (Some(api_key), Some(cx)) = (&config.google_api_key, &config.google_search_cx) else {
            return Ok(None);
        };

        Ok(Some(Self {
            client: api_client(config)?,
            base_url: config.google_search_base_url.clone(),
            api_key: api_key.clone(),
            cx: cx.clone(),
        }))
    }
}

#[async_trait]
impl WebSearch for GoogleSearchClient {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, SourceError> {
        let url = url::Url::parse_with_params(
            &self.base_url,
            &[
                ("key", self.api_key.expose_secret()),
                ("cx", self.cx.as_str()),
                ("q", keyword),
                ("num", RESULTS_PER_QUERY),
            ],
        )
        .map_err(|e| SourceError::Network(e.to_string()))?;

        let response: SearchResponse = fetch_json(self.client.get(url)).await?;
        tracing::info!(keyword = %keyword, items = response.items.len(), "Web search answered");

        Ok(response.items.into_iter().map(SearchHit::from).collect())
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
