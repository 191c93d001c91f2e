//! API key introspection and group membership
//!
//! - `GET /keys/current` resolves the user behind the configured API key.
//! - `GET /users/{id}/groups` lists the groups the user belongs to, with the
//!   metadata each group library is synchronized under.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use bibsync_core::domain::{Group, GroupId, GroupMetadata, UserId, UserIdentity};

use crate::client::{total_results, ZoteroClient};
use crate::RemoteError;

/// Page size for the group listing
const GROUPS_PAGE_SIZE: usize = 100;

/// Raw body of `GET /keys/current`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyResponse {
    #[serde(rename = "userID")]
    user_id: u64,
    #[serde(default)]
    username: Option<String>,
}

/// One entry of `GET /users/{id}/groups`
#[derive(Debug, Deserialize)]
struct ApiGroup {
    id: u64,
    #[serde(default)]
    version: u64,
    data: ApiGroupData,
}

#[derive(Debug, Deserialize)]
struct ApiGroupData {
    name: String,
    #[serde(default)]
    owner: Option<u64>,
    #[serde(default)]
    description: Option<String>,
}

impl From<ApiGroup> for Group {
    fn from(group: ApiGroup) -> Self {
        Group {
            id: GroupId::new(group.id),
            metadata: GroupMetadata {
                name: group.data.name,
                version: group.version,
                owner: group.data.owner.map(UserId::new),
                description: group.data.description.filter(|d| !d.is_empty()),
            },
        }
    }
}

/// Identity of the user owning the client's API key
///
/// # Errors
///
/// Returns an error if the client has no API key or the key is rejected
pub async fn current_key(client: &ZoteroClient) -> Result<UserIdentity> {
    if !client.has_api_key() {
        return Err(RemoteError::Unauthorized("no API key configured".to_string()).into());
    }

    let (key, _): (ApiKeyResponse, _) = client
        .get_json("/keys/current", &[])
        .await
        .context("Failed to resolve API key")?;

    debug!(user_id = key.user_id, "Resolved API key");

    let identity = UserIdentity::new(UserId::new(key.user_id));
    Ok(match key.username {
        Some(username) => identity.with_username(username),
        None => identity,
    })
}

/// All groups `user` is a member of, in server order
///
/// Follows paging via `start` until `Total-Results` entries were read.
pub async fn user_groups(client: &ZoteroClient, user: &UserId) -> Result<Vec<Group>> {
    let path = format!("/users/{user}/groups");
    let mut groups: Vec<Group> = Vec::new();

    loop {
        let query = [
            ("start", groups.len().to_string()),
            ("limit", GROUPS_PAGE_SIZE.to_string()),
        ];
        let (page, headers): (Vec<ApiGroup>, _) = client
            .get_json(&path, &query)
            .await
            .context("Failed to list groups")?;

        let page_len = page.len();
        groups.extend(page.into_iter().map(Group::from));

        let total = total_results(&headers).unwrap_or(groups.len() as u64);
        if page_len == 0 || groups.len() as u64 >= total {
            break;
        }
    }

    debug!(user_id = %user, count = groups.len(), "Listed groups");
    Ok(groups)
}
