//! Submission retrieval
//!
//! A fetch is a single GET. It never returns an error to the caller: failures
//! come back inside [`Fetched`] together with whatever bytes were received, so
//! the orchestrator can still archive the partial content.

use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;

/// Content of one fetch attempt
#[must_use]
#[derive(Debug)]
pub struct Fetched {
    /// Bytes received (complete on success, possibly partial or empty on failure)
    pub body: Bytes,
    /// Why the fetch is considered failed
    pub failure: Option<FetchError>,
}

impl Fetched {
    /// A complete download
    pub fn complete(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            failure: None,
        }
    }

    /// A failed download with the bytes that did arrive
    pub fn failed(body: impl Into<Bytes>, failure: FetchError) -> Self {
        Self {
            body: body.into(),
            failure: Some(failure),
        }
    }

    /// Whether the download completed
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Trait for retrieving submitted files
#[async_trait]
pub trait SubmissionFetcher: Send + Sync {
    /// Make one retrieval attempt against `url`
    async fn fetch(&self, url: &str) -> Fetched;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// HTTP(S) fetcher backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout,
        }
    }

    fn client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    }
}

#[async_trait]
impl SubmissionFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Fetched {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => return Fetched::failed(Bytes::new(), e),
        };

        let mut response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out: {}", e)
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                return Fetched::failed(
                    Bytes::new(),
                    FetchError::Transport {
                        url: url.to_string(),
                        reason,
                    },
                );
            }
        };

        let status = response.status();
        let mut failure = (!status.is_success()).then(|| FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });

        // The body of an error response is kept as the partial content.
        let mut body = BytesMut::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    failure.get_or_insert(FetchError::Body {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        match failure {
            None => {
                tracing::debug!(url = %url, bytes = body.len(), "submission downloaded");
                Fetched::complete(body.freeze())
            }
            Some(failure) => Fetched::failed(body.freeze(), failure),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
