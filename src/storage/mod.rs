mod feeds;
mod follows;
mod posts;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{
    DatabaseError, Feed, FeedFollow, FeedSource, FeedWithCreator, NewPost, Post, PostWithFeed,
    User,
};
