use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use feedscout::config::Config;
use feedscout::explore::Explorer;
use feedscout::sources::{CatalogFeed, GoogleSearchClient, NewsApiClient};
use feedscout::storage::{Database, FollowRequest, StorageError};

/// Get the config directory path (~/.config/feedscout/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedscout"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedscout",
    about = "Discover RSS/Atom feeds from news sources, websites and Reddit"
)]
struct Args {
    /// Config file (default: ~/.config/feedscout/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides database_path from the config file)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find feeds matching a query across every source
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List feeds in a category (all feeds when omitted)
    Category { category: Option<String> },
    /// List known categories
    Categories,
    /// Preview a single feed by URL
    Feed { url: String },
    /// Preview a subreddit
    Subreddit { name: String },
    /// Preview the configured popular subreddits
    PopularSubreddits,
    /// Find suggested subreddits by name
    SubredditSearch { query: String },
    /// Search the web for sites about a keyword and look for their feeds
    Keyword { keyword: String },
    /// Current news headlines
    Headlines {
        /// Two-letter country code (default: us)
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    /// Latest articles of a news source, by source id
    SourceArticles { source_id: String },
    /// Search news articles
    Articles { query: String },
    /// Follow a feed
    Follow {
        feed_url: String,
        #[command(flatten)]
        meta: FeedMeta,
        /// "RSS" or "Atom"
        #[arg(long)]
        feed_type: Option<String>,
    },
    /// Stop following a feed
    Unfollow { feed_url: String },
    /// List followed feeds
    Following,
    /// Add or update a feed in the popular-feed catalog
    CatalogAdd {
        feed_url: String,
        #[command(flatten)]
        meta: FeedMeta,
        #[arg(long)]
        site_url: Option<String>,
        #[arg(long)]
        subscribers: Option<i64>,
    },
}

#[derive(clap::Args, Debug)]
struct FeedMeta {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    favicon_url: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| config_dir.join("feedscout.db"));
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    run(args.command, config, db).await
}

async fn run(command: Command, config: Config, db: Database) -> Result<()> {
    let user_id = config.user_id;
    let explorer = build_explorer(config, db.clone())?;

    match command {
        Command::Search { query, category } => {
            print_json(&explorer.discover_by_query(&query, category.as_deref()).await)
        }
        Command::Category { category } => {
            print_json(&explorer.discover_by_category(category.as_deref()).await)
        }
        Command::Categories => print_json(&explorer.list_categories().await),
        Command::Feed { url } => match explorer.discover_feed_by_url(&url).await {
            Some(feed) => print_json(&feed),
            None => anyhow::bail!("No readable feed at {url}"),
        },
        Command::Subreddit { name } => match explorer.discover_subreddit(&name).await {
            Some(feed) => print_json(&feed),
            None => anyhow::bail!("Subreddit '{name}' is unavailable"),
        },
        Command::PopularSubreddits => print_json(&explorer.discover_popular_subreddits().await),
        Command::SubredditSearch { query } => {
            print_json(&explorer.search_subreddits(&query).await)
        }
        Command::Keyword { keyword } => print_json(&explorer.search_by_keyword(&keyword).await),
        Command::Headlines {
            country,
            category,
            query,
        } => {
            let items = explorer
                .top_headlines(country.as_deref(), category.as_deref(), query.as_deref())
                .await
                .context("Failed to fetch headlines")?;
            print_json(&items)
        }
        Command::SourceArticles { source_id } => {
            let items = explorer
                .articles_by_source(&source_id)
                .await
                .with_context(|| format!("Failed to fetch articles for {source_id}"))?;
            print_json(&items)
        }
        Command::Articles { query } => {
            let items = explorer
                .search_articles(&query)
                .await
                .context("Failed to search articles")?;
            print_json(&items)
        }
        Command::Follow {
            feed_url,
            meta,
            feed_type,
        } => {
            let request = FollowRequest {
                feed_url,
                title: meta.title,
                description: meta.description,
                feed_type,
                favicon_url: meta.favicon_url,
                category: meta.category,
            };
            match db.follow_feed(user_id, &request).await {
                Ok(followed) => print_json(&followed),
                Err(StorageError::AlreadyFollowing(url)) => {
                    anyhow::bail!("Already following {url}")
                }
                Err(e) => Err(e).context("Failed to follow feed"),
            }
        }
        Command::Unfollow { feed_url } => {
            let removed = db
                .unfollow_feed(user_id, &feed_url)
                .await
                .context("Failed to unfollow feed")?;
            print_json(&serde_json::json!({ "feedUrl": feed_url, "removed": removed }))
        }
        Command::Following => {
            let feeds = db
                .followed_feeds(user_id)
                .await
                .context("Failed to list followed feeds")?;
            print_json(&feeds)
        }
        Command::CatalogAdd {
            feed_url,
            meta,
            site_url,
            subscribers,
        } => {
            let feed = CatalogFeed {
                feed_url,
                site_url,
                title: meta.title,
                description: meta.description,
                favicon_url: meta.favicon_url,
                category: meta.category,
                subscriber_count: subscribers,
            };
            db.add_popular_feed(&feed)
                .await
                .context("Failed to save catalog feed")?;
            print_json(&serde_json::json!({ "feedUrl": feed.feed_url, "saved": true }))
        }
    }
}

fn build_explorer(config: Config, db: Database) -> Result<Explorer> {
    let news = Arc::new(NewsApiClient::new(&config).context("Failed to build NewsAPI client")?);
    let web = GoogleSearchClient::from_config(&config)
        .context("Failed to build web search client")?;
    if web.is_none() {
        tracing::info!("Web search not configured, site discovery from search results disabled");
    }

    let db = Arc::new(db);
    let explorer = Explorer::new(config, news, db.clone(), db)
        .context("Failed to build HTTP client")?;

    Ok(match web {
        Some(web) => explorer.with_web_search(Arc::new(web)),
        None => explorer,
    })
}
