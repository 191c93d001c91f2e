//! bibsync Remote - Zotero Web API client
//!
//! Provides an async client for:
//! - Version-based delta queries (`?since=N&format=versions`, `/deleted`)
//! - Fetching full collection and item payloads by key
//! - API key introspection and group membership listing
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with API headers and throttling retries
//! - [`delta`] - Deletion feed and changed-key queries
//! - [`fetch`] - Chunked fetch-by-keys for collections and items
//! - [`account`] - `/keys/current` and `/users/{id}/groups`
//! - [`provider`] - [`IRemoteLibrary`](bibsync_core::ports::IRemoteLibrary) adapter

pub mod account;
pub mod client;
pub mod delta;
pub mod fetch;
pub mod provider;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Web API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API key is missing, invalid or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The API key lacks access to the requested library
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested library or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Throttled and the retry budget is spent
    #[error("Too many requests after {attempts} attempts, last retry-after {retry_after:?}")]
    TooManyRequests {
        /// Attempts made, including the first
        attempts: u32,
        /// Last delay requested by the server
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error {status}: {body}")]
    ServerError {
        /// HTTP status
        status: StatusCode,
        /// Response body, possibly truncated
        body: String,
    },

    /// Any other unexpected status
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status
        status: StatusCode,
        /// Response body, possibly truncated
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Classifies a non-success status with its response body
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(body),
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            s if s.is_server_error() => Self::ServerError { status, body },
            _ => Self::UnexpectedStatus { status, body },
        }
    }
}
