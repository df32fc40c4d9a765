//! Fetching, parsing and locating syndicated feeds.
//!
//! - [`fetcher`] - HTTP retrieval with per-profile timeouts and a body size cap
//! - [`parser`] - RSS/Atom bytes into channel metadata and preview items (`feed-rs`)
//! - [`discovery`] - finds the feed of an arbitrary website
//! - [`reddit`] - subreddit RSS endpoints mapped to posts
//!
//! # Example
//!
//! ```ignore
//! use feedscout::config::Config;
//! use feedscout::feed::{Fetcher, SiteDiscoverer};
//!
//! let config = Config::default();
//! let discoverer = SiteDiscoverer::new(Fetcher::new(&config)?, config.feed_paths.clone());
//!
//! if let Some(site) = discoverer.discover("https://blog.rust-lang.org").await {
//!     println!("{} -> {} items", site.feed_url, site.feed.items.len());
//! }
//! ```

pub mod discovery;
pub mod fetcher;
pub mod parser;
pub mod reddit;

pub use discovery::{find_feed_links, PreviewArticle, SiteDiscoverer, SiteFeed};
pub use fetcher::{FetchError, FetchKind, Fetcher};
pub use parser::{parse_feed, FeedItem, FeedType, ParseError, ParsedFeed};
pub use reddit::{normalize_subreddit, subreddit_feed_url, RedditPost, RedditReader, SubredditFeed};
