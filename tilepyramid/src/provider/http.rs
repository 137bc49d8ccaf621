//! Async HTTP client abstraction.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use super::types::FetchError;

/// Boxed future for dyn-compatible async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response of a tile request.
///
/// Non-success statuses are returned as responses, not errors, so callers
/// can tell "absent at origin" (404, 204) from transport failures.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub last_modified: Option<SystemTime>,
    pub body: Bytes,
}

impl HttpResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            content_type: None,
            last_modified: None,
            body: body.into(),
        }
    }

    /// A bodiless response with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            last_modified: None,
            body: Bytes::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.status != 204
    }

    /// The origin reports that no tile exists at this locator.
    pub fn is_absent(&self) -> bool {
        self.status == 404 || self.status == 204
    }
}

/// Async HTTP GET.
pub trait AsyncHttpClient: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tilepyramid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;

            let status = response.status().as_u16();
            let headers = response.headers();
            let content_type = headers
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let last_modified = headers
                .get(reqwest::header::LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_http_date);

            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(url, e))?;

            Ok(HttpResponse {
                status,
                content_type,
                last_modified,
                body,
            })
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Parses an HTTP-date such as `Wed, 21 Oct 2015 07:28:00 GMT`.
fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| SystemTime::from(dt.with_timezone(&chrono::Utc)))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Mock HTTP client that counts requests.
    ///
    /// Every request receives `response`; an optional delay holds the
    /// request open so concurrent callers overlap.
    pub struct MockHttpClient {
        response: Mutex<Result<HttpResponse, FetchError>>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
        urls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(response: Result<HttpResponse, FetchError>) -> Self {
            Self {
                response: Mutex::new(response),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Replaces the response served to subsequent requests.
        pub fn set_response(&self, response: Result<HttpResponse, FetchError>) {
            *self.response.lock() = response;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.urls.lock().push(url.to_string());
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.response.lock().clone()
            })
        }
    }

    #[tokio::test]
    async fn test_mock_client_counts_calls() {
        let mock = MockHttpClient::new(Ok(HttpResponse::ok(vec![1, 2, 3])));
        let response = mock.get("http://example.com/a").await.unwrap();
        assert_eq!(&response.body[..], &[1, 2, 3]);
        mock.get("http://example.com/b").await.unwrap();
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.urls()[1], "http://example.com/b");
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::new(Err(FetchError::Timeout("u".to_string())));
        assert!(mock.get("u").await.is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(HttpResponse::ok(vec![1]).is_success());
        assert!(!HttpResponse::status(204).is_success());
        assert!(HttpResponse::status(204).is_absent());
        assert!(HttpResponse::status(404).is_absent());
        assert!(!HttpResponse::status(500).is_absent());
        assert!(!HttpResponse::status(500).is_success());
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        let secs = parsed
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(secs, 1_445_412_480);
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
