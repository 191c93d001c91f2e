//! Version-based delta queries
//!
//! Implements the three change-stream queries of the Web API:
//!
//! 1. **Deletion feed**: `GET {prefix}/deleted?since=N` lists keys deleted
//!    since version `N`.
//! 2. **Collection versions**: `GET {prefix}/collections?since=N&format=versions`
//!    maps every changed collection key to its current version.
//! 3. **Item versions**: `GET {prefix}/items?since=N&format=versions&includeTrashed=1`
//!    does the same for items, including trashed ones.
//!
//! Every query sends `If-Modified-Since-Version: N`; a `304 Not Modified`
//! answer means "no changes" and maps to `Ok(None)`. The library version is
//! taken from `Last-Modified-Version` and is `None` when the header is absent.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use bibsync_core::domain::{EntityKey, LibraryId};
use bibsync_core::ports::{DeletedKeys, DeletionsResponse, VersionsResponse};

use crate::client::{last_modified_version, ZoteroClient};
use crate::RemoteError;

// ============================================================================
// Web API response types (JSON deserialization)
// ============================================================================

/// Raw body of `GET {prefix}/deleted`
///
/// The feed also lists deleted searches, tags and settings; those are not
/// replicated and are ignored.
#[derive(Debug, Deserialize)]
struct ApiDeletedResponse {
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    items: Vec<String>,
}

/// Which versioned object stream to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStream {
    /// `{prefix}/collections`
    Collections,
    /// `{prefix}/items`, trashed items included
    Items,
}

impl ObjectStream {
    fn segment(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Items => "items",
        }
    }
}

// ============================================================================
// Delta query functions
// ============================================================================

/// Fetches the keys deleted since `since`
///
/// # Returns
///
/// `None` when the server reports no changes (304), otherwise the deleted
/// collection and item keys with the library version.
///
/// # Errors
///
/// Returns an error if the request fails, the status is not successful, or
/// the body contains a malformed key.
pub async fn get_deletions(
    client: &ZoteroClient,
    library: &LibraryId,
    since: u64,
) -> Result<Option<DeletionsResponse>> {
    let path = format!("{}/deleted", library.path_prefix());
    let query = [("since", since.to_string())];

    let response = client
        .execute_with_retry(&path, &query, Some(since))
        .await?;
    if response.status() == StatusCode::NOT_MODIFIED {
        debug!(library = %library, since, "No deletions since cursor");
        return Ok(None);
    }

    let version = last_modified_version(response.headers());
    let raw: ApiDeletedResponse = response
        .json()
        .await
        .map_err(RemoteError::from)
        .context("Failed to parse deletions response JSON")?;

    let data = DeletedKeys {
        collections: parse_keys(raw.collections)?,
        items: parse_keys(raw.items)?,
    };

    debug!(
        library = %library,
        since,
        ?version,
        collections = data.collections.len(),
        items = data.items.len(),
        "Received deletions"
    );

    Ok(Some(DeletionsResponse { version, data }))
}

/// Fetches the keys of objects changed since `since`, with their versions
///
/// # Returns
///
/// `None` when the server reports no changes (304). Otherwise the changed
/// keys in response order, mapped to their current versions.
///
/// # Errors
///
/// Returns an error if the request fails, the status is not successful, or
/// the body is not a key→version object.
pub async fn get_versions(
    client: &ZoteroClient,
    library: &LibraryId,
    stream: ObjectStream,
    since: u64,
) -> Result<Option<VersionsResponse>> {
    let path = format!("{}/{}", library.path_prefix(), stream.segment());
    let mut query = vec![
        ("since", since.to_string()),
        ("format", "versions".to_string()),
    ];
    if stream == ObjectStream::Items {
        query.push(("includeTrashed", "1".to_string()));
    }

    let response = client
        .execute_with_retry(&path, &query, Some(since))
        .await?;
    if response.status() == StatusCode::NOT_MODIFIED {
        debug!(library = %library, stream = stream.segment(), since, "No changes since cursor");
        return Ok(None);
    }

    let version = last_modified_version(response.headers());
    let raw: IndexMap<String, u64> = response
        .json()
        .await
        .map_err(RemoteError::from)
        .with_context(|| format!("Failed to parse {} versions JSON", stream.segment()))?;

    let mut data = IndexMap::with_capacity(raw.len());
    for (key, key_version) in raw {
        data.insert(parse_key(key)?, key_version);
    }

    debug!(
        library = %library,
        stream = stream.segment(),
        since,
        ?version,
        changed = data.len(),
        "Received changed keys"
    );

    Ok(Some(VersionsResponse { version, data }))
}

fn parse_key(key: String) -> Result<EntityKey> {
    EntityKey::new(key)
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
        .context("Malformed key in response")
}

pub(crate) fn parse_keys(keys: Vec<String>) -> Result<Vec<EntityKey>> {
    keys.into_iter().map(parse_key).collect()
}
