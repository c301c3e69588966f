//! HTTP tile fetching abstraction.
//!
//! The [`TileFetcher`] trait decouples the prefetch engine from reqwest so
//! tests can script responses. It is dyn-compatible via `Pin<Box<dyn Future>>`
//! so the engine can hold an `Arc<dyn TileFetcher>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// Default timeout for tile requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with tile requests; public tile servers reject
/// anonymous clients.
const USER_AGENT: &str = concat!("tilestash/", env!("CARGO_PKG_VERSION"));

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An HTTP response for a single tile request.
///
/// Carries the pieces the engine needs to classify the outcome: status,
/// declared content type, and body. Non-2xx responses are values here, not
/// errors; only transport failures surface as [`FetchError`].
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl TileResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors raised by a fetcher.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The fetcher itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Trait for fetching a single tile by URL.
pub trait TileFetcher: Send + Sync {
    /// Performs an HTTP GET for the given URL.
    ///
    /// Returns the response regardless of status code; `Err` only for
    /// transport-level failures (DNS, connect, timeout).
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TileResponse, FetchError>>;
}

/// Real fetcher backed by an async reqwest client.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

impl TileFetcher for ReqwestFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TileResponse, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            Ok(TileResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Mock fetcher returning a fixed response for every URL.
    pub struct MockFetcher {
        pub response: Result<TileResponse, FetchError>,
    }

    impl TileFetcher for MockFetcher {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<TileResponse, FetchError>> {
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn test_mock_fetcher_success() {
        let mock = MockFetcher {
            response: Ok(TileResponse {
                status: 200,
                content_type: Some("image/png".to_string()),
                body: Bytes::from_static(&[1, 2, 3]),
            }),
        };

        let response = mock.fetch("http://example.com").await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.body.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_transport_error() {
        let mock = MockFetcher {
            response: Err(FetchError::Transport("connection refused".to_string())),
        };

        let result = mock.fetch("http://example.com").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[test]
    fn test_is_success_range() {
        let response = |status| TileResponse {
            status,
            content_type: None,
            body: Bytes::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(199).is_success());
        assert!(!response(304).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn test_reqwest_fetcher_builds() {
        assert!(ReqwestFetcher::new().is_ok());
    }
}
