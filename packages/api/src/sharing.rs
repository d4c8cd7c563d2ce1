//! # Publishing by share code
//!
//! Publishing gives a list or collection a share code (see [`crate::share_code`]);
//! unpublishing clears it, which frees the code for reuse. Publishing something that
//! already has a code returns that code unchanged.
//!
//! Publishing a collection also publishes each member list that has no code yet, the
//! same effect [`crate::cascade::add_list_to_collection`] has for lists added later.
//!
//! The public views resolve codes for anonymous visitors. A collection view only
//! exposes member lists that are themselves published.

use serde::Serialize;
use store::{CollectionId, Item, ListId, ShareTarget, Store};

use crate::error::{ApiError, ApiResult};
use crate::permissions;
use crate::share_code::ShareCodeAllocator;

/// A published list as an anonymous visitor sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedList {
    pub name: String,
    pub description: Option<String>,
    pub share_code: String,
    pub items: Vec<Item>,
}

/// Summary of a published member list inside a shared collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedListLink {
    pub name: String,
    pub description: Option<String>,
    pub share_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCollection {
    pub name: String,
    pub description: Option<String>,
    pub share_code: String,
    pub lists: Vec<SharedListLink>,
}

fn unknown_list(code: &str) -> ApiError {
    ApiError::NotFound(format!("No shared list found for code {code}"))
}

fn unknown_collection(code: &str) -> ApiError {
    ApiError::NotFound(format!("No shared collection found for code {code}"))
}

pub async fn publish_list(
    store: &dyn Store,
    codes: &ShareCodeAllocator,
    list_id: ListId,
) -> ApiResult<String> {
    let list = permissions::list(store, list_id).await?;
    if let Some(code) = list.share_code {
        return Ok(code);
    }
    codes.allocate(store, ShareTarget::List(list_id)).await
}

pub async fn unpublish_list(store: &dyn Store, list_id: ListId) -> ApiResult<()> {
    store.clear_list_share_code(list_id).await?;
    tracing::info!("Unpublished list {}", list_id);
    Ok(())
}

pub async fn publish_collection(
    store: &dyn Store,
    codes: &ShareCodeAllocator,
    collection_id: CollectionId,
) -> ApiResult<String> {
    let collection = permissions::collection(store, collection_id).await?;
    let code = match collection.share_code {
        Some(code) => code,
        None => {
            codes
                .allocate(store, ShareTarget::Collection(collection_id))
                .await?
        }
    };
    for list in store.collection_lists(collection_id).await? {
        if list.share_code.is_none() {
            codes.allocate(store, ShareTarget::List(list.id)).await?;
        }
    }
    Ok(code)
}

pub async fn unpublish_collection(store: &dyn Store, collection_id: CollectionId) -> ApiResult<()> {
    store.clear_collection_share_code(collection_id).await?;
    tracing::info!("Unpublished collection {}", collection_id);
    Ok(())
}

pub async fn shared_list(store: &dyn Store, code: &str) -> ApiResult<SharedList> {
    let list = store
        .list_by_share_code(code)
        .await?
        .ok_or_else(|| unknown_list(code))?;
    Ok(SharedList {
        items: store.items(list.id).await?,
        name: list.name,
        description: list.description,
        share_code: code.to_string(),
    })
}

pub async fn shared_collection(store: &dyn Store, code: &str) -> ApiResult<SharedCollection> {
    let collection = store
        .collection_by_share_code(code)
        .await?
        .ok_or_else(|| unknown_collection(code))?;
    let lists = store
        .collection_lists(collection.id)
        .await?
        .into_iter()
        .filter_map(|list| {
            list.share_code.map(|share_code| SharedListLink {
                name: list.name,
                description: list.description,
                share_code,
            })
        })
        .collect();
    Ok(SharedCollection {
        name: collection.name,
        description: collection.description,
        share_code: code.to_string(),
        lists,
    })
}

/// A shared list reached through a shared collection. Unknown codes and lists that
/// are not members of the collection are both not found.
pub async fn shared_list_in_collection(
    store: &dyn Store,
    collection_code: &str,
    list_code: &str,
) -> ApiResult<SharedList> {
    let collection = store
        .collection_by_share_code(collection_code)
        .await?
        .ok_or_else(|| unknown_collection(collection_code))?;
    let list = store
        .list_by_share_code(list_code)
        .await?
        .ok_or_else(|| unknown_list(list_code))?;
    if !store.membership_exists(collection.id, list.id).await? {
        return Err(unknown_list(list_code));
    }
    shared_list(store, list_code).await
}
