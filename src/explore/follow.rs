use super::types::DiscoveredFeed;
use crate::feed::SubredditFeed;
use crate::sources::FollowStore;
use std::collections::HashSet;

/// Anything whose follow state is keyed by a feed URL.
pub trait Followable {
    fn feed_url(&self) -> &str;
    fn set_followed(&mut self, followed: bool);
}

impl Followable for DiscoveredFeed {
    fn feed_url(&self) -> &str {
        &self.feed_url
    }

    fn set_followed(&mut self, followed: bool) {
        self.is_followed = followed;
    }
}

impl Followable for SubredditFeed {
    fn feed_url(&self) -> &str {
        &self.feed_url
    }

    fn set_followed(&mut self, followed: bool) {
        self.is_followed = followed;
    }
}

/// Sets `is_followed` on every item from the followed-URL set.
pub fn annotate_follow_state<T: Followable>(items: &mut [T], followed: &HashSet<String>) {
    for item in items {
        let is_followed = followed.contains(item.feed_url());
        item.set_followed(is_followed);
    }
}

/// The user's followed feed URLs, read once per request.
#[derive(Debug, Clone, Default)]
pub struct FollowSnapshot {
    urls: HashSet<String>,
}

impl FollowSnapshot {
    /// Reads the snapshot. A failing store yields an empty snapshot so
    /// results are still returned, all marked unfollowed.
    pub async fn load(store: &dyn FollowStore, user_id: i64) -> Self {
        match store.followed_urls(user_id).await {
            Ok(urls) => Self { urls },
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Follow state unavailable, treating every feed as unfollowed");
                Self::default()
            }
        }
    }

    pub fn contains(&self, feed_url: &str) -> bool {
        self.urls.contains(feed_url)
    }

    pub fn annotate<T: Followable>(&self, items: &mut [T]) {
        annotate_follow_state(items, &self.urls);
    }
}
