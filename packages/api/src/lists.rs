//! # Lists
//!
//! Operations behind the `/list` routes. Route guards have already established
//! the caller's right to be here (viewer, editor or owner); the functions below only
//! refine that, e.g. group-sharing flags can be changed by the owner alone.
//!
//! The dashboard and the group-shared roll-up are the only places the group's
//! "sharing enabled" setting is consulted.

use serde::{Deserialize, Serialize};
use store::{
    Collection, GroupSharedList, GroupSharing, Item, List, ListId, ListUpdate, NewList, Store,
    UserId,
};

use crate::error::{ApiError, ApiResult};
use crate::{groups, permissions};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEdit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub share_with_group: bool,
    #[serde(default)]
    pub group_can_edit: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub lists: Vec<List>,
    pub collections: Vec<Collection>,
    pub group_shared: Vec<GroupSharedList>,
    pub group_sharing_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDetail {
    pub list: List,
    pub items: Vec<Item>,
    pub can_edit: bool,
    pub is_owner: bool,
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn clean_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    Ok(name.to_string())
}

pub async fn dashboard(store: &dyn Store, user: UserId) -> ApiResult<Dashboard> {
    let group = groups::group_id_of(store, user).await?;
    let group_sharing_enabled = groups::sharing_enabled_for(store, group).await?;
    let group_shared = if group_sharing_enabled {
        store.group_shared_lists(user).await?
    } else {
        Vec::new()
    };
    Ok(Dashboard {
        lists: store.lists_owned_by(user).await?,
        collections: store.collections_owned_by(user).await?,
        group_shared,
        group_sharing_enabled,
    })
}

/// Lists other members share with the caller's group; empty while the group has sharing off.
pub async fn group_shared(store: &dyn Store, user: UserId) -> ApiResult<Vec<GroupSharedList>> {
    let group = groups::group_id_of(store, user).await?;
    if !groups::sharing_enabled_for(store, group).await? {
        return Ok(Vec::new());
    }
    Ok(store.group_shared_lists(user).await?)
}

pub async fn name_taken(store: &dyn Store, owner: UserId, name: &str) -> ApiResult<bool> {
    Ok(store.list_name_taken(owner, name.trim(), None).await?)
}

pub async fn create_list(store: &dyn Store, owner: UserId, form: ListForm) -> ApiResult<List> {
    let name = clean_name(&form.name)?;
    if store.list_name_taken(owner, &name, None).await? {
        return Err(ApiError::Conflict("List name already in use".into()));
    }
    let list = store
        .create_list(NewList {
            owner_id: owner,
            name,
            description: clean_description(form.description),
        })
        .await?;
    tracing::debug!("User {} created list {}", owner, list.id);
    Ok(list)
}

pub async fn detail(store: &dyn Store, user: UserId, list_id: ListId) -> ApiResult<ListDetail> {
    let list = permissions::list(store, list_id).await?;
    let can_edit = permissions::user_can_edit_list(store, user, list_id).await?;
    Ok(ListDetail {
        is_owner: list.owner_id == user,
        items: store.items(list_id).await?,
        list,
        can_edit,
    })
}

/// Rename or re-describe a list. The group-sharing flags are applied only when the
/// caller owns the list; group editors keep whatever the owner chose.
pub async fn update_list(
    store: &dyn Store,
    user: UserId,
    list_id: ListId,
    edit: ListEdit,
) -> ApiResult<List> {
    let list = permissions::list(store, list_id).await?;
    let name = clean_name(&edit.name)?;
    if store
        .list_name_taken(list.owner_id, &name, Some(list_id))
        .await?
    {
        return Err(ApiError::Conflict("List name already in use".into()));
    }
    let sharing = (list.owner_id == user).then_some(GroupSharing {
        share_with_group: edit.share_with_group,
        group_can_edit: edit.share_with_group && edit.group_can_edit,
    });
    Ok(store
        .update_list(
            list_id,
            ListUpdate {
                name,
                description: clean_description(edit.description),
                sharing,
            },
        )
        .await?)
}

/// Delete a list and its items once `confirm_name` matches the list's name.
pub async fn delete_list(store: &dyn Store, list_id: ListId, confirm_name: &str) -> ApiResult<()> {
    if !store.delete_list_confirmed(list_id, confirm_name).await? {
        return Err(ApiError::Conflict(
            "Confirmation name did not match list name".into(),
        ));
    }
    tracing::info!("Deleted list {}", list_id);
    Ok(())
}
