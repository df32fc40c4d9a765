use crate::util::{sanitize, strip_control_chars};
use chrono::{Local, NaiveDateTime};
use feed_rs::model::{Entry, Feed, Link};
use feed_rs::parser;
use serde::Serialize;
use thiserror::Error;

/// Only the first few entries of a feed are mapped; this is a preview, not an archive.
pub const MAX_ITEMS: usize = 5;
/// Character cap for item descriptions.
pub const ITEM_DESCRIPTION_LIMIT: usize = 200;
/// Character cap for channel descriptions.
pub const FEED_DESCRIPTION_LIMIT: usize = 300;
/// Placeholder used when an entry has no title.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes are not a valid RSS or Atom document
    #[error("Malformed feed: {0}")]
    Malformed(String),
}

/// Syndication format of a parsed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedType {
    #[serde(rename = "RSS")]
    Rss,
    Atom,
}

/// A single normalized feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    /// Empty when the source omits the link
    pub link: String,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Local wall-clock time of publication
    pub published_at: Option<NaiveDateTime>,
    pub thumbnail_url: Option<String>,
    pub categories: Vec<String>,
}

/// Channel metadata plus the mapped preview items.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    /// The site the feed belongs to, when the feed declares one
    pub site_link: Option<String>,
    pub feed_type: FeedType,
    pub items: Vec<FeedItem>,
}

/// Parses RSS 2.0 / Atom 1.0 bytes into channel metadata and at most
/// [`MAX_ITEMS`] normalized items, in source order.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] when the bytes are not a feed.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    parse_feed_with_limit(bytes, ITEM_DESCRIPTION_LIMIT)
}

/// Like [`parse_feed`], with a caller-chosen cap on item descriptions.
pub fn parse_feed_with_limit(
    bytes: &[u8],
    description_limit: usize,
) -> Result<ParsedFeed, ParseError> {
    let feed = parser::parse(bytes).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(map_feed(feed, description_limit))
}

fn map_feed(feed: Feed, description_limit: usize) -> ParsedFeed {
    let feed_type = match feed.feed_type {
        feed_rs::model::FeedType::Atom => FeedType::Atom,
        _ => FeedType::Rss,
    };

    let title = feed
        .title
        .map(|t| strip_control_chars(t.content.trim()).into_owned())
        .filter(|t| !t.is_empty());

    let description = feed
        .description
        .map(|d| sanitize(&d.content, FEED_DESCRIPTION_LIMIT))
        .filter(|d| !d.is_empty());

    let site_link = feed
        .links
        .iter()
        .find(|link| !matches!(link.rel.as_deref(), Some("self") | Some("hub")))
        .map(|link| link.href.clone());

    let items = feed
        .entries
        .into_iter()
        .take(MAX_ITEMS)
        .map(|entry| map_entry(entry, description_limit))
        .collect();

    ParsedFeed {
        title,
        description,
        site_link,
        feed_type,
        items,
    }
}

fn map_entry(entry: Entry, description_limit: usize) -> FeedItem {
    let title = entry
        .title
        .as_ref()
        .map(|t| strip_control_chars(t.content.trim()).into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let link = entry_link(&entry.links)
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .map(|html| sanitize(&html, description_limit))
        .filter(|d| !d.is_empty());

    let author = entry
        .authors
        .first()
        .map(|p| p.name.trim().to_string())
        .filter(|name| !name.is_empty());

    let published_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Local).naive_local());

    let categories = entry
        .categories
        .iter()
        .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()))
        .filter(|c| !c.trim().is_empty())
        .collect();

    FeedItem {
        title,
        link,
        description,
        author,
        published_at,
        thumbnail_url: image_enclosure(&entry),
        categories,
    }
}

/// Picks the entry's alternate link, falling back to its first link.
fn entry_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}

/// URL of the first enclosure whose declared media type is an image.
///
/// RSS `<enclosure>` and Media RSS land in `entry.media`; Atom enclosures are
/// `rel="enclosure"` links.
fn image_enclosure(entry: &Entry) -> Option<String> {
    let from_media = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find(|c| {
            c.content_type
                .as_ref()
                .is_some_and(|mime| mime.to_string().starts_with("image/"))
        })
        .and_then(|c| c.url.as_ref().map(|u| u.to_string()));

    from_media.or_else(|| {
        entry
            .links
            .iter()
            .find(|l| {
                l.rel.as_deref() == Some("enclosure")
                    && l.media_type.as_deref().is_some_and(|t| t.starts_with("image"))
            })
            .map(|l| l.href.clone())
    })
}
