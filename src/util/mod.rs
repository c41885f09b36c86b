//! Small helpers shared by the command handlers.
//!
//! - **Feed URL validation**: only public http(s) hosts may be registered
//! - **Terminal text**: strip escape sequences from feed text, fit it to a width

mod feed_url;
mod text;

pub use feed_url::{validate_feed_url, UrlValidationError};
pub use text::{one_line_preview, strip_control_chars, truncate_to_width};
