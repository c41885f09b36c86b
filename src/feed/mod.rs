//! Feed retrieval: HTTP fetching, RSS parsing and publication date handling.
//!
//! - [`client`] - bounded-time HTTP GET with a fixed `User-Agent`
//! - [`parser`] - RSS 2.0 channel/item extraction with entity decoding
//! - [`pubdate`] - the `Mon, 2 Jan 2006 15:04:05 -0700` date layout
//!
//! ```ignore
//! let client = FeedClient::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)?;
//! let doc = client.fetch("https://blog.example.com/index.xml").await?;
//! for item in &doc.items {
//!     let published = parse_pub_date(&item.pub_date)?;
//! }
//! ```

mod client;
mod parser;
mod pubdate;

pub use client::{FeedClient, FetchError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use parser::{parse_rss, FeedDocument, ParseError, RemoteItem};
pub use pubdate::{parse_pub_date, PubDateError};
