//! gator: a command-line RSS aggregator.
//!
//! Users register feeds and follow them; `gator agg` keeps a local SQLite
//! store of posts current by refreshing the stalest feed on a fixed
//! interval, and `gator browse` reads the newest posts back.

pub mod aggregator;
pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
