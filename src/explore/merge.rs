use super::types::DiscoveredFeed;
use crate::sources::SearchHit;
use crate::util::host_of;
use std::collections::{BTreeSet, HashSet};

/// Drops every feed whose `feed_url` was already seen, keeping the first.
pub fn dedup_by_feed_url(feeds: Vec<DiscoveredFeed>) -> Vec<DiscoveredFeed> {
    let mut seen = HashSet::with_capacity(feeds.len());
    feeds
        .into_iter()
        .filter(|feed| seen.insert(feed.feed_url.clone()))
        .collect()
}

/// Keeps the first hit per host; hits whose link has no host are keyed by
/// the raw link.
pub fn dedup_hits_by_host(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::with_capacity(hits.len());
    hits.into_iter()
        .filter(|hit| {
            let link = hit.link.as_deref().unwrap_or_default();
            let key = host_of(link).unwrap_or_else(|| link.to_string());
            seen.insert(key)
        })
        .collect()
}

/// Upper-cases the first letter of each category, then dedups and sorts.
pub fn normalize_categories<I>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    categories
        .into_iter()
        .filter_map(|c| capitalize(c.trim()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn capitalize(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}
