//! feedscout: discovers, fetches and merges RSS/Atom, Reddit and website feeds.
//!
//! The [`explore::Explorer`] is the entry point. It fans out to a news
//! provider, the popular-feed catalog, web search and live site discovery,
//! then merges the results and marks what the user already follows.

pub mod config;
pub mod explore;
pub mod feed;
pub mod sources;
pub mod storage;
pub mod util;
