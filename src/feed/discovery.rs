use crate::feed::fetcher::{FetchKind, Fetcher};
use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::util::{resolve_url, validate_url};
use scraper::{Html, Selector};
use serde::Serialize;

/// Number of entries surfaced as preview articles for a discovered site.
pub const PREVIEW_ARTICLES: usize = 3;

/// A `{title, link}` pair shown as a preview of a discovered feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewArticle {
    pub title: String,
    pub link: String,
}

/// A feed located on a website, already fetched and parsed.
#[derive(Debug, Clone)]
pub struct SiteFeed {
    /// URL of the RSS/Atom feed itself
    pub feed_url: String,
    pub feed: ParsedFeed,
}

impl SiteFeed {
    /// The first [`PREVIEW_ARTICLES`] entries of the feed, in source order.
    pub fn preview_articles(&self) -> Vec<PreviewArticle> {
        self.feed
            .items
            .iter()
            .take(PREVIEW_ARTICLES)
            .map(|item| PreviewArticle {
                title: item.title.clone(),
                link: item.link.clone(),
            })
            .collect()
    }
}

/// Locates the feed of a website.
///
/// Candidates are evaluated lazily in priority order and the first one that
/// parses as a feed wins:
///
/// 1. `<link rel="alternate">` tags with an RSS/Atom type, in document order
/// 2. the conventional paths (`/feed`, `/rss`, ...) appended to the base URL
///
/// The conventional paths are only probed once every linked candidate has
/// failed. Finding nothing is an expected outcome, reported as `None`.
///
/// With [`SiteDiscoverer::block_private_hosts`] on, the site and every
/// candidate must pass [`validate_url`] before anything is fetched.
#[derive(Debug, Clone)]
pub struct SiteDiscoverer {
    fetcher: Fetcher,
    feed_paths: Vec<String>,
    block_private_hosts: bool,
}

impl SiteDiscoverer {
    pub fn new(fetcher: Fetcher, feed_paths: Vec<String>) -> Self {
        Self {
            fetcher,
            feed_paths,
            block_private_hosts: false,
        }
    }

    /// Refuses to fetch loopback, private and non-HTTP URLs when `block` is set.
    pub fn block_private_hosts(mut self, block: bool) -> Self {
        self.block_private_hosts = block;
        self
    }

    fn permits(&self, url: &str) -> bool {
        if !self.block_private_hosts {
            return true;
        }
        match validate_url(url) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping discovery URL");
                false
            }
        }
    }

    /// Discovers the feed of the site at `site_base_url`.
    pub async fn discover(&self, site_base_url: &str) -> Option<SiteFeed> {
        if !self.permits(site_base_url) {
            return None;
        }
        let base = site_base_url.trim_end_matches('/');

        let linked = self.linked_candidates(site_base_url).await;
        let conventional = self.feed_paths.iter().map(|path| format!("{base}{path}"));

        for candidate in linked
            .into_iter()
            .chain(conventional)
            .filter(|c| self.permits(c))
        {
            if let Some(feed) = self.probe(&candidate).await {
                tracing::debug!(site = %site_base_url, feed_url = %candidate, "Discovered feed");
                return Some(SiteFeed {
                    feed_url: candidate,
                    feed,
                });
            }
        }

        tracing::debug!(site = %site_base_url, "No feed found");
        None
    }

    /// Fetches and parses a single candidate URL, treating any failure as "not a feed".
    pub async fn probe(&self, candidate: &str) -> Option<ParsedFeed> {
        let bytes = match self.fetcher.fetch(candidate, FetchKind::Probe).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::trace!(url = %candidate, error = %e, "Candidate fetch failed");
                return None;
            }
        };

        match parse_feed(&bytes) {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::trace!(url = %candidate, error = %e, "Candidate is not a feed");
                None
            }
        }
    }

    /// Feed URLs advertised by the site's HTML. Empty when the page cannot be fetched.
    async fn linked_candidates(&self, page_url: &str) -> Vec<String> {
        match self.fetcher.fetch(page_url, FetchKind::Page).await {
            Ok(bytes) => find_feed_links(&String::from_utf8_lossy(&bytes), page_url),
            Err(e) => {
                tracing::debug!(site = %page_url, error = %e, "Site page unavailable, using conventional paths");
                Vec::new()
            }
        }
    }
}

/// Scans HTML for `<link rel="alternate">` tags whose `type` mentions RSS or
/// Atom and returns their resolved hrefs in document order, without duplicates.
pub fn find_feed_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("link[rel][href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for element in document.select(&selector) {
        let el = element.value();

        let is_alternate = el
            .attr("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("alternate")));
        let is_feed_type = el.attr("type").is_some_and(|t| {
            let t = t.to_ascii_lowercase();
            t.contains("rss") || t.contains("atom")
        });
        if !is_alternate || !is_feed_type {
            continue;
        }

        let Some(href) = el.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };

        let resolved = resolve_url(href, base_url);
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    links
}
