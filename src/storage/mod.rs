mod catalog;
mod follows;
mod schema;
mod types;

pub use schema::Database;
pub use types::{FollowRequest, FollowedFeed, StorageError};
