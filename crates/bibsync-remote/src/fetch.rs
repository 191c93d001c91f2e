//! Fetch-by-keys for collections and items
//!
//! The Web API accepts up to 50 keys per request through the
//! `collectionKey` / `itemKey` parameters. Key lists are split into chunks
//! and the results are concatenated in request order, whatever order the
//! server returns them in.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use bibsync_core::config::MAX_KEYS_PER_REQUEST;
use bibsync_core::domain::{Collection, EntityKey, Item, LibraryId};

use crate::client::ZoteroClient;
use crate::delta::ObjectStream;
use crate::RemoteError;

/// One object of a `format=json` response
///
/// The envelope also carries `library`, `links` and `meta`, which are not
/// stored.
#[derive(Debug, Deserialize)]
struct ApiObject {
    key: String,
    version: u64,
    #[serde(default)]
    data: Value,
}

/// Fetches full collection payloads for `keys`, in `keys` order
pub async fn fetch_collections(
    client: &ZoteroClient,
    library: &LibraryId,
    keys: &[EntityKey],
    chunk_size: usize,
) -> Result<Vec<Collection>> {
    let objects = fetch_objects(client, library, ObjectStream::Collections, keys, chunk_size).await?;
    Ok(objects
        .into_iter()
        .map(|(key, obj)| Collection::new(key, obj.version, obj.data))
        .collect())
}

/// Fetches full item payloads for `keys`, in `keys` order
///
/// Trashed items are included; their payload carries `deleted: 1`.
pub async fn fetch_items(
    client: &ZoteroClient,
    library: &LibraryId,
    keys: &[EntityKey],
    chunk_size: usize,
) -> Result<Vec<Item>> {
    let objects = fetch_objects(client, library, ObjectStream::Items, keys, chunk_size).await?;
    Ok(objects
        .into_iter()
        .map(|(key, obj)| Item::new(key, obj.version, obj.data))
        .collect())
}

async fn fetch_objects(
    client: &ZoteroClient,
    library: &LibraryId,
    stream: ObjectStream,
    keys: &[EntityKey],
    chunk_size: usize,
) -> Result<Vec<(EntityKey, ApiObject)>> {
    let chunk_size = chunk_size.clamp(1, MAX_KEYS_PER_REQUEST);
    let (path, key_param) = match stream {
        ObjectStream::Collections => (
            format!("{}/collections", library.path_prefix()),
            "collectionKey",
        ),
        ObjectStream::Items => (format!("{}/items", library.path_prefix()), "itemKey"),
    };

    let mut fetched = Vec::with_capacity(keys.len());
    for (index, chunk) in keys.chunks(chunk_size).enumerate() {
        let joined = chunk
            .iter()
            .map(EntityKey::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let mut query = vec![
            (key_param, joined),
            ("format", "json".to_string()),
            ("limit", chunk.len().to_string()),
        ];
        if stream == ObjectStream::Items {
            query.push(("includeTrashed", "1".to_string()));
        }

        let (objects, _headers): (Vec<ApiObject>, _) = client
            .get_json(&path, &query)
            .await
            .with_context(|| format!("Failed to fetch chunk {index} of {path}"))?;

        let matched = match_request_order(chunk, objects)
            .with_context(|| format!("Unexpected objects in chunk {index} of {path}"))?;
        if !matched.missing.is_empty() {
            warn!(
                library = %library,
                path = %path,
                missing = matched.missing.len(),
                keys = ?matched.missing,
                "Requested keys not returned by the server"
            );
        }
        fetched.extend(matched.found);
    }

    debug!(
        library = %library,
        requested = keys.len(),
        fetched = fetched.len(),
        "Fetched objects by key"
    );
    Ok(fetched)
}

/// A chunk's objects in request order, plus the requested keys the server
/// left out
#[derive(Debug)]
struct ChunkMatch {
    found: Vec<(EntityKey, ApiObject)>,
    missing: Vec<EntityKey>,
}

/// Orders `objects` as `requested`; an object nobody asked for is an error
fn match_request_order(requested: &[EntityKey], objects: Vec<ApiObject>) -> Result<ChunkMatch> {
    let mut by_key: HashMap<String, ApiObject> = objects
        .into_iter()
        .map(|obj| (obj.key.clone(), obj))
        .collect();

    let mut found = Vec::with_capacity(requested.len());
    let mut missing = Vec::new();
    for key in requested {
        match by_key.remove(key.as_str()) {
            Some(obj) => found.push((key.clone(), obj)),
            None => missing.push(key.clone()),
        }
    }

    if !by_key.is_empty() {
        return Err(RemoteError::InvalidResponse(format!(
            "{} unrequested objects returned",
            by_key.len()
        ))
        .into());
    }

    Ok(ChunkMatch { found, missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_object_envelope() {
        let json = r#"{
            "key": "ABCD2345",
            "version": 1932,
            "library": {"type": "user", "id": 475425, "name": "someone"},
            "links": {"self": {"href": "https://api.zotero.org/users/475425/items/ABCD2345"}},
            "meta": {"numChildren": 0},
            "data": {"key": "ABCD2345", "version": 1932, "itemType": "book", "title": "Dune", "deleted": 1}
        }"#;

        let obj: ApiObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.key, "ABCD2345");
        assert_eq!(obj.version, 1932);

        let item = Item::new(EntityKey::new(obj.key).unwrap(), obj.version, obj.data);
        assert!(item.is_deleted());
        assert_eq!(item.title(), Some("Dune"));
    }

    #[test]
    fn test_deserialize_object_without_data() {
        let obj: ApiObject = serde_json::from_str(r#"{"key": "K1", "version": 3}"#).unwrap();
        assert!(obj.data.is_null());
    }

    fn object(key: &str) -> ApiObject {
        ApiObject {
            key: key.to_string(),
            version: 1,
            data: Value::Null,
        }
    }

    fn keys(raw: &[&str]) -> Vec<EntityKey> {
        raw.iter().map(|k| EntityKey::new(k.to_string()).unwrap()).collect()
    }

    #[test]
    fn test_match_reports_missing_keys() {
        let requested = keys(&["K1", "K2", "K3"]);
        let matched = match_request_order(&requested, vec![object("K3"), object("K1")]).unwrap();

        let found: Vec<&str> = matched.found.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(found, vec!["K1", "K3"]);
        assert_eq!(matched.missing, keys(&["K2"]));
    }

    #[test]
    fn test_match_rejects_unrequested_objects() {
        let requested = keys(&["K1"]);
        let err = match_request_order(&requested, vec![object("K1"), object("K9")]).unwrap_err();
        assert!(format!("{err:#}").contains("1 unrequested objects"));
    }
}
