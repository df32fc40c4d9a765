use crate::config::Config;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

pub(crate) const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// `Accept` header sent with every feed request.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";
/// `Accept` header sent when fetching a site's HTML for discovery.
pub const PAGE_ACCEPT: &str = "text/html, application/xhtml+xml";

/// Errors that can occur while fetching a remote resource.
///
/// Callers treat every variant as "source unavailable"; none of them is fatal
/// to an aggregate request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS resolution or TCP/TLS connect failed
    #[error("Host unreachable: {0}")]
    Unreachable(String),
    /// Connect or read deadline elapsed
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Any other transport-level failure
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    TooLarge,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Network(err)
        }
    }
}

/// Which timeout profile and `Accept` header a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// A full feed fetch (feed timeouts, feed `Accept`).
    Feed,
    /// A discovery candidate probed as a feed (probe timeouts, feed `Accept`).
    Probe,
    /// A site's HTML page (probe timeouts, HTML `Accept`).
    Page,
}

impl FetchKind {
    fn accept(self) -> &'static str {
        match self {
            FetchKind::Feed | FetchKind::Probe => FEED_ACCEPT,
            FetchKind::Page => PAGE_ACCEPT,
        }
    }
}

/// HTTP fetcher shared by the parser, discoverer and Reddit reader.
///
/// Holds one client per timeout profile: `reqwest` only exposes connect/read
/// timeouts on the client builder. Every request also runs under an overall
/// deadline of connect + read; when it elapses the request future is dropped.
///
/// Cloning is cheap (the clients are reference counted).
#[derive(Debug, Clone)]
pub struct Fetcher {
    feed_client: reqwest::Client,
    probe_client: reqwest::Client,
    feed_deadline: Duration,
    probe_deadline: Duration,
}

impl Fetcher {
    /// Builds a fetcher from the configured user agent and timeouts.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let feed_client = build_client(
            &config.user_agent,
            config.feed_connect_timeout(),
            config.feed_read_timeout(),
        )?;
        let probe_client = build_client(
            &config.user_agent,
            config.probe_connect_timeout(),
            config.probe_read_timeout(),
        )?;

        Ok(Self {
            feed_client,
            probe_client,
            feed_deadline: config.feed_connect_timeout() + config.feed_read_timeout(),
            probe_deadline: config.probe_connect_timeout() + config.probe_read_timeout(),
        })
    }

    /// Fetches `url` and returns the response body.
    ///
    /// No retries: the first failure is returned to the caller.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] - connect, read or overall deadline elapsed
    /// - [`FetchError::Unreachable`] - DNS or connect failure
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::TooLarge`] - body exceeded 10MB
    /// - [`FetchError::Network`] - any other transport error
    pub async fn fetch(&self, url: &str, kind: FetchKind) -> Result<Vec<u8>, FetchError> {
        let (client, deadline) = match kind {
            FetchKind::Feed => (&self.feed_client, self.feed_deadline),
            FetchKind::Probe | FetchKind::Page => (&self.probe_client, self.probe_deadline),
        };

        let request = async {
            let response = client
                .get(url)
                .header(reqwest::header::ACCEPT, kind.accept())
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, MAX_BODY_SIZE).await
        };

        let result = tokio::time::timeout(deadline, request)
            .await
            .map_err(|_| FetchError::Timeout)?;

        match &result {
            Ok(bytes) => tracing::debug!(url = %url, ?kind, bytes = bytes.len(), "Fetched"),
            Err(e) => tracing::debug!(url = %url, ?kind, error = %e, "Fetch failed"),
        }

        result
    }
}

fn build_client(
    user_agent: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .build()
        .map_err(FetchError::Network)
}

pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
