//! Device state endpoint fetcher.
//!
//! Queries one HTTP endpoint per entity and extracts the state value from
//! the JSON envelope the device answers with:
//!
//! ```json
//! {"LL": {"control": "jdev/sps/io/0f1e/state", "value": "1", "Code": "200"}}
//! ```

use http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{HttpClient, HttpError, HttpRequest, StateFetcher, Unavailable};

/// Path segment replaced by the entity identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default state endpoint, relative to the device base URL.
pub const DEFAULT_STATE_PATH: &str = "jdev/sps/io/{id}/state";

/// Response envelope; only `LL.value` is inspected.
#[derive(Debug, Deserialize)]
struct StateEnvelope {
    #[serde(rename = "LL")]
    ll: StateBody,
}

#[derive(Debug, Deserialize)]
struct StateBody {
    value: Option<Value>,
}

/// [`StateFetcher`] backed by an HTTP device endpoint.
///
/// # Type Parameters
///
/// * `H` - The [`HttpClient`] used to issue requests
#[derive(Debug, Clone)]
pub struct HttpStateFetcher<H> {
    client: H,
    base_url: Url,
    state_path: String,
    headers: HeaderMap,
}

impl<H: HttpClient> HttpStateFetcher<H> {
    /// Creates a fetcher for the device at `base_url` using the default
    /// state path and no extra headers.
    #[must_use]
    pub fn new(client: H, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            state_path: DEFAULT_STATE_PATH.to_string(),
            headers: HeaderMap::new(),
        }
    }

    /// Overrides the state path template. Must contain an `{id}` segment.
    #[must_use]
    pub fn with_state_path(mut self, state_path: impl Into<String>) -> Self {
        self.state_path = state_path.into();
        self
    }

    /// Sets headers attached to every request (e.g. `Authorization`).
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Builds the state URL for one entity.
    ///
    /// The identifier is pushed as a single percent-encoded path segment.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable::Transport`] if the base URL cannot carry a path.
    pub fn state_url(&self, id: &str) -> Result<Url, Unavailable> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                Unavailable::Transport(HttpError::InvalidUrl(format!(
                    "{} cannot be a base URL",
                    self.base_url
                )))
            })?;
            segments.pop_if_empty();
            for segment in self.state_path.split('/').filter(|s| !s.is_empty()) {
                if segment == ID_PLACEHOLDER {
                    segments.push(id);
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }
}

impl<H: HttpClient> StateFetcher for HttpStateFetcher<H> {
    async fn fetch(&self, id: &str) -> Result<String, Unavailable> {
        let request = HttpRequest::get(self.state_url(id)?).with_headers(&self.headers);
        let response = self.client.request(request).await?;

        if !response.is_success() {
            return Err(Unavailable::Status(response.status));
        }

        parse_state(&response.body)
    }
}

/// Extracts `LL.value` from a response body as an opaque state string.
///
/// Strings are taken verbatim; numbers and booleans use their JSON text.
pub(super) fn parse_state(body: &[u8]) -> Result<String, Unavailable> {
    let envelope: StateEnvelope =
        serde_json::from_slice(body).map_err(|e| Unavailable::Malformed(e.to_string()))?;

    match envelope.ll.value {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) | None => Err(Unavailable::Malformed(
            "LL.value is missing or null".to_string(),
        )),
        Some(other) => Err(Unavailable::Malformed(format!(
            "LL.value is not a scalar: {other}"
        ))),
    }
}
