use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_rss, FeedDocument, ParseError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_USER_AGENT: &str = "gator";
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving and parsing a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the client timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not an RSS document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// Transport-class failures (the document never arrived) as opposed to
    /// document-class failures (it arrived but was unusable).
    pub fn is_transport(&self) -> bool {
        !matches!(self, FetchError::Parse(_))
    }

    /// `"transport"` or `"document"`, for log fields.
    pub fn kind(&self) -> &'static str {
        if self.is_transport() {
            "transport"
        } else {
            "document"
        }
    }
}

/// HTTP client for RSS documents.
///
/// Performs exactly one GET per call, bounded by a fixed timeout that covers
/// both the request and reading the body. Retries are the caller's business.
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl FeedClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            timeout,
            max_body_bytes: MAX_FEED_SIZE,
        })
    }

    #[cfg(test)]
    fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Fetch `url` and parse it as RSS.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - connection, DNS or TLS failure
    /// - [`FetchError::Timeout`] - no complete response within the timeout
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::ResponseTooLarge`] - body over 10MB
    /// - [`FetchError::Parse`] - body is not an RSS document
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        Ok(parse_rss(&bytes)?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Network(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_body_bytes).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test Feed</title>
    <item>
        <title>Test</title>
        <link>https://example.com/test</link>
        <pubDate>Mon, 2 Jan 2006 15:04:05 +0000</pubDate>
    </item>
</channel></rss>"#;

    fn client() -> FeedClient {
        FeedClient::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("User-Agent", "gator"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let doc = client()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(doc.channel_title, "Test Feed");
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].link, "https://example.com/test");
    }

    #[tokio::test]
    async fn test_fetch_404_is_http_status_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)), "got {:?}", err);
        assert!(err.is_transport());
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_fetch_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let err = client()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)), "got {:?}", err);
        assert!(!err.is_transport());
        assert_eq!(err.kind(), "document");
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = FeedClient::new(Duration::from_millis(200), DEFAULT_USER_AGENT).unwrap();
        let err = client
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&mock_server)
            .await;

        let client = client().with_max_body_bytes(1024);
        let err = client
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client()
            .fetch(&format!("http://{}/feed", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
    }
}
