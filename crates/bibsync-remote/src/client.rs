//! Zotero Web API client
//!
//! Provides a typed HTTP client for the Zotero Web API v3. Handles the API
//! key and version headers, conditional requests, and retries for throttled
//! responses.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bibsync_remote::client::ZoteroClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ZoteroClient::new(Some("api-key-here".to_string()));
//! let key = bibsync_remote::account::current_key(&client).await?;
//! println!("Key belongs to user {}", key.id);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header::HeaderMap, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::RemoteError;

/// Base URL of the public Zotero Web API
pub const ZOTERO_BASE_URL: &str = "https://api.zotero.org";

/// API version sent with every request
const API_VERSION: &str = "3";

/// Request header carrying the API key
const API_KEY_HEADER: &str = "Zotero-API-Key";

/// Request header selecting the API version
const API_VERSION_HEADER: &str = "Zotero-API-Version";

/// Conditional request header; the server answers 304 when nothing changed
const IF_MODIFIED_SINCE_VERSION: &str = "If-Modified-Since-Version";

/// Response header carrying the library version
const LAST_MODIFIED_VERSION: &str = "Last-Modified-Version";

/// Response header carrying the total size of a paged result
const TOTAL_RESULTS: &str = "Total-Results";

/// Default retry-after duration when no header is present
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Default retries for throttled responses
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Longest server-requested wait that is honored
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Response bodies are cut to this many characters in error messages
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for Zotero Web API calls
///
/// Wraps `reqwest::Client` with the API headers and base URL construction.
/// Throttled responses (429, 503) are retried up to `max_retries` times,
/// waiting for the longer of `Retry-After` and `Backoff`.
#[derive(Debug, Clone)]
pub struct ZoteroClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// API key, absent for anonymous access to public libraries
    api_key: Option<String>,
    /// Retry budget for throttled responses
    max_retries: u32,
}

impl ZoteroClient {
    /// Creates a client for the public API
    ///
    /// # Arguments
    /// * `api_key` - API key, or `None` for anonymous access
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, ZOTERO_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `api_key` - API key, or `None` for anonymous access
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the retry budget for throttled responses
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true if requests carry an API key
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the retry budget for throttled responses
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Creates a request builder for the given method and path
    ///
    /// Prepends the base URL and adds the API version and key headers.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/users/1/items")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, &url)
            .header(API_VERSION_HEADER, API_VERSION);
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Executes a GET request with throttling retries
    ///
    /// # Arguments
    /// * `path` - API path relative to base URL
    /// * `query` - Query parameters
    /// * `if_modified_since` - Sent as `If-Modified-Since-Version` when present
    ///
    /// # Returns
    /// The response for any 2xx status or for `304 Not Modified`. Every other
    /// status is returned as a [`RemoteError`] once retries are exhausted.
    pub async fn execute_with_retry(
        &self,
        path: &str,
        query: &[(&str, String)],
        if_modified_since: Option<u64>,
    ) -> Result<Response> {
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.request(Method::GET, path).query(query);
            if let Some(version) = if_modified_since {
                request = request.header(IF_MODIFIED_SINCE_VERSION, version.to_string());
            }

            let response = request
                .send()
                .await
                .map_err(RemoteError::from)
                .with_context(|| format!("Failed to send request to {path}"))?;
            let status = response.status();

            if is_throttled(status) {
                let retry_after = retry_delay(response.headers());
                if attempt < self.max_retries {
                    info!(
                        path,
                        status = status.as_u16(),
                        attempt,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Throttled, backing off"
                    );
                    tokio::time::sleep(retry_after).await;
                    attempt += 1;
                    continue;
                }

                warn!(path, attempts = attempt + 1, "Throttling retry limit exhausted");
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(RemoteError::TooManyRequests {
                        attempts: attempt + 1,
                        retry_after,
                    }
                    .into());
                }
            }

            if status.is_success() || status == StatusCode::NOT_MODIFIED {
                if attempt > 0 {
                    info!(path, attempt, "Request succeeded after retry");
                }
                debug!(path, status = status.as_u16(), "Request complete");
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, truncate(body)))
                .with_context(|| format!("GET {path} failed"));
        }
    }

    /// Executes a GET request and decodes the JSON body
    ///
    /// A `304 Not Modified` response is an error here, since no conditional
    /// header is sent.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap)> {
        let response = self.execute_with_retry(path, query, None).await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Err(RemoteError::InvalidResponse(format!(
                "unexpected 304 Not Modified for {path}"
            ))
            .into());
        }

        let headers = response.headers().clone();
        let body = response
            .json::<T>()
            .await
            .map_err(RemoteError::from)
            .with_context(|| format!("Failed to parse response JSON from {path}"))?;
        Ok((body, headers))
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn truncate(mut body: String) -> String {
    if let Some((index, _)) = body.char_indices().nth(MAX_ERROR_BODY) {
        body.truncate(index);
    }
    body
}

/// Reads the library version from `Last-Modified-Version`
pub fn last_modified_version(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, LAST_MODIFIED_VERSION)
}

/// Reads the total result count of a paged response from `Total-Results`
pub fn total_results(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, TOTAL_RESULTS)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Delay before retrying a throttled request
///
/// The longer of `Retry-After` and `Backoff`, or the default when neither
/// header is usable.
fn retry_delay(headers: &HeaderMap) -> Duration {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after)
    };
    match (parse("Retry-After"), parse("Backoff")) {
        (Some(a), Some(b)) => a.max(b),
        (Some(d), None) | (None, Some(d)) => d,
        (None, None) => DEFAULT_RETRY_AFTER,
    }
}

/// Parses a `Retry-After` or `Backoff` value
///
/// Accepts integer seconds (capped at one hour) or an HTTP-date. Dates in the
/// past or more than an hour away are rejected.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    match chrono::DateTime::parse_from_rfc2822(value) {
        Ok(date) => {
            let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
            let secs = u64::try_from(diff.num_seconds()).ok()?;
            let delay = Duration::from_secs(secs);
            (delay <= MAX_RETRY_AFTER).then_some(delay)
        }
        Err(_) => {
            warn!(value, "Could not parse retry delay header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_request_headers() {
        let client = ZoteroClient::new(Some("secret".to_string()));
        let request = client.request(Method::GET, "/keys/current").build().unwrap();

        assert_eq!(request.url().as_str(), "https://api.zotero.org/keys/current");
        assert_eq!(request.headers().get("zotero-api-key").unwrap(), "secret");
        assert_eq!(request.headers().get("zotero-api-version").unwrap(), "3");
    }

    #[test]
    fn test_anonymous_request_has_no_key() {
        let client = ZoteroClient::new(None);
        let request = client.request(Method::GET, "/groups/1/items").build().unwrap();
        assert!(request.headers().get("zotero-api-key").is_none());
        assert!(!client.has_api_key());
    }

    #[test]
    fn test_custom_base_url_strips_trailing_slash() {
        let client = ZoteroClient::with_base_url(None, "http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        let request = client.request(Method::GET, "/users/1").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/users/1");
    }

    #[test]
    fn test_with_max_retries() {
        let client = ZoteroClient::new(None).with_max_retries(7);
        assert_eq!(client.max_retries(), 7);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("99999"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_past_date() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_retry_delay_takes_longer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("2"));
        headers.insert("Backoff", HeaderValue::from_static("30"));
        assert_eq!(retry_delay(&headers), Duration::from_secs(30));

        assert_eq!(retry_delay(&HeaderMap::new()), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn test_last_modified_version() {
        let mut headers = HeaderMap::new();
        assert_eq!(last_modified_version(&headers), None);

        headers.insert("Last-Modified-Version", HeaderValue::from_static("1234"));
        assert_eq!(last_modified_version(&headers), Some(1234));

        headers.insert("Last-Modified-Version", HeaderValue::from_static("0"));
        assert_eq!(last_modified_version(&headers), Some(0));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(body).len(), MAX_ERROR_BODY);
        assert_eq!(truncate("short".into()), "short");
    }
}
