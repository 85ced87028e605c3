//! Transport seam between the state fetcher and an HTTP library.

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use super::HttpError;

/// A state read addressed to the device.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Always `GET` for state reads
    pub method: Method,
    /// Fully substituted state endpoint
    pub url: Url,
    /// Headers to send, typically just `Authorization`
    pub headers: HeaderMap,
}

impl HttpRequest {
    /// Creates a header-less `GET` for a state endpoint.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Attaches the configured headers, replacing any already present.
    #[must_use]
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }
}

/// What the device answered, body fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status line code
    pub status: StatusCode,
    /// Raw JSON envelope (or whatever the device sent instead)
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Pairs a status with its buffered body.
    #[must_use]
    pub const fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Anything outside 2xx leaves the entity unavailable for the tick.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Sends state reads to the device.
///
/// [`HttpStateFetcher`](super::HttpStateFetcher) is generic over this trait
/// so URL building, auth, and `LL.value` decoding run against scripted
/// clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs one request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on connection failure, timeout, or a URL the
    /// client refuses.
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, HttpError>> + Send;
}
