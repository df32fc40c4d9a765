//! Configuration file parser for ~/.config/feedscout/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they are
//! usually typos. API keys may also come from the environment, which wins over
//! the file.
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; feedscout/0.1)";

/// Conventional feed locations probed when a site advertises no `<link>` feed.
pub const DEFAULT_FEED_PATHS: &[&str] = &[
    "/feed",
    "/rss",
    "/rss.xml",
    "/feed.xml",
    "/atom.xml",
    "/index.xml",
];

pub const DEFAULT_POPULAR_SUBREDDITS: &[&str] = &[
    "programming",
    "kotlin",
    "java",
    "javascript",
    "python",
    "webdev",
    "android",
    "technology",
    "news",
    "worldnews",
];

pub const DEFAULT_SUBREDDIT_SUGGESTIONS: &[&str] = &[
    "programming",
    "kotlin",
    "java",
    "javascript",
    "python",
    "webdev",
    "android",
    "ios",
    "devops",
    "linux",
    "technology",
    "tech",
    "coding",
    "learnprogramming",
];

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks the API keys to prevent secret leakage
/// in logs, error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User-Agent sent with every outgoing request.
    pub user_agent: String,

    /// Connect/read timeouts for full feed fetches (milliseconds).
    pub feed_connect_timeout_ms: u64,
    pub feed_read_timeout_ms: u64,

    /// Connect/read timeouts for discovery probes and site HTML (milliseconds).
    pub probe_connect_timeout_ms: u64,
    pub probe_read_timeout_ms: u64,

    /// Upper bound on a single aggregator lookup, in seconds.
    pub lookup_timeout_secs: u64,

    /// How many sites or subreddits are fetched at once.
    pub discovery_concurrency: usize,

    /// Paths appended to a site's base URL during fallback discovery, in probe order.
    pub feed_paths: Vec<String>,

    /// Subreddits returned by the popular-subreddits listing.
    pub popular_subreddits: Vec<String>,

    /// Subreddits matched against subreddit search queries.
    pub subreddit_suggestions: Vec<String>,

    /// Base URL for subreddit RSS endpoints.
    pub reddit_base_url: String,

    pub news_api_base_url: String,
    /// NewsAPI key (alternative to NEWS_API_KEY env var).
    #[serde(deserialize_with = "deserialize_secret")]
    pub news_api_key: Option<SecretString>,

    pub google_search_base_url: String,
    /// Google Custom Search key (alternative to GOOGLE_SEARCH_API_KEY env var).
    #[serde(deserialize_with = "deserialize_secret")]
    pub google_api_key: Option<SecretString>,
    /// Google Custom Search engine id (alternative to GOOGLE_SEARCH_CX env var).
    pub google_search_cx: Option<String>,

    /// SQLite database holding the feed catalog and follows.
    /// Defaults to `<config dir>/feedscout.db`.
    pub database_path: Option<PathBuf>,

    /// User whose follow state annotates results.
    pub user_id: i64,

    /// Reject user-supplied feed URLs pointing at localhost or private networks.
    pub block_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_connect_timeout_ms: 10_000,
            feed_read_timeout_ms: 15_000,
            probe_connect_timeout_ms: 5_000,
            probe_read_timeout_ms: 5_000,
            lookup_timeout_secs: 30,
            discovery_concurrency: 4,
            feed_paths: to_strings(DEFAULT_FEED_PATHS),
            popular_subreddits: to_strings(DEFAULT_POPULAR_SUBREDDITS),
            subreddit_suggestions: to_strings(DEFAULT_SUBREDDIT_SUGGESTIONS),
            reddit_base_url: "https://www.reddit.com".to_string(),
            news_api_base_url: "https://newsapi.org".to_string(),
            news_api_key: None,
            google_search_base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            google_api_key: None,
            google_search_cx: None,
            database_path: None,
            user_id: 1,
            block_private_hosts: true,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// SEC-015: Mask API keys in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user_agent", &self.user_agent)
            .field("feed_connect_timeout_ms", &self.feed_connect_timeout_ms)
            .field("feed_read_timeout_ms", &self.feed_read_timeout_ms)
            .field("probe_connect_timeout_ms", &self.probe_connect_timeout_ms)
            .field("probe_read_timeout_ms", &self.probe_read_timeout_ms)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("discovery_concurrency", &self.discovery_concurrency)
            .field("feed_paths", &self.feed_paths)
            .field("popular_subreddits", &self.popular_subreddits)
            .field("subreddit_suggestions", &self.subreddit_suggestions)
            .field("reddit_base_url", &self.reddit_base_url)
            .field("news_api_base_url", &self.news_api_base_url)
            .field(
                "news_api_key",
                &self.news_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("google_search_base_url", &self.google_search_base_url)
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("google_search_cx", &self.google_search_cx)
            .field("database_path", &self.database_path)
            .field("user_id", &self.user_id)
            .field("block_private_hosts", &self.block_private_hosts)
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "user_agent",
        "feed_connect_timeout_ms",
        "feed_read_timeout_ms",
        "probe_connect_timeout_ms",
        "probe_read_timeout_ms",
        "lookup_timeout_secs",
        "discovery_concurrency",
        "feed_paths",
        "popular_subreddits",
        "subreddit_suggestions",
        "reddit_base_url",
        "news_api_base_url",
        "news_api_key",
        "google_search_base_url",
        "google_api_key",
        "google_search_cx",
        "database_path",
        "user_id",
        "block_private_hosts",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            feed_paths = config.feed_paths.len(),
            popular_subreddits = config.popular_subreddits.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Overrides API credentials with `NEWS_API_KEY`, `GOOGLE_SEARCH_API_KEY`
    /// and `GOOGLE_SEARCH_CX` when they are set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("NEWS_API_KEY") {
            self.news_api_key = Some(SecretString::from(key));
        }
        if let Some(key) = non_empty("GOOGLE_SEARCH_API_KEY") {
            self.google_api_key = Some(SecretString::from(key));
        }
        if let Some(cx) = non_empty("GOOGLE_SEARCH_CX") {
            self.google_search_cx = Some(cx);
        }
        self
    }

    pub fn feed_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_connect_timeout_ms)
    }

    pub fn feed_read_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_read_timeout_ms)
    }

    pub fn probe_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_connect_timeout_ms)
    }

    pub fn probe_read_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_read_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
