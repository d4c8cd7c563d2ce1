//! Collections: named bundles of a user's lists.

use serde::{Deserialize, Serialize};
use store::{Collection, CollectionId, CollectionUpdate, ListId, NewCollection, Store, UserId};

use crate::cascade;
use crate::error::{ApiError, ApiResult};
use crate::permissions;
use crate::share_code::ShareCodeAllocator;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    pub collection: Collection,
    pub lists: Vec<ListId>,
}

fn clean(form: CollectionForm) -> ApiResult<(String, Option<String>)> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Collection name cannot be empty".into()));
    }
    let description = form
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    Ok((name, description))
}

pub async fn owned(store: &dyn Store, owner: UserId) -> ApiResult<Vec<Collection>> {
    Ok(store.collections_owned_by(owner).await?)
}

pub async fn name_taken(store: &dyn Store, owner: UserId, name: &str) -> ApiResult<bool> {
    Ok(store.collection_name_taken(owner, name.trim(), None).await?)
}

pub async fn create_collection(
    store: &dyn Store,
    owner: UserId,
    form: CollectionForm,
) -> ApiResult<Collection> {
    let (name, description) = clean(form)?;
    if store.collection_name_taken(owner, &name, None).await? {
        return Err(ApiError::Conflict("Collection name already in use".into()));
    }
    Ok(store
        .create_collection(NewCollection {
            owner_id: owner,
            name,
            description,
        })
        .await?)
}

pub async fn detail(store: &dyn Store, collection_id: CollectionId) -> ApiResult<CollectionDetail> {
    Ok(CollectionDetail {
        collection: permissions::collection(store, collection_id).await?,
        lists: store.collection_list_ids(collection_id).await?,
    })
}

pub async fn update_collection(
    store: &dyn Store,
    collection_id: CollectionId,
    form: CollectionForm,
) -> ApiResult<Collection> {
    let collection = permissions::collection(store, collection_id).await?;
    let (name, description) = clean(form)?;
    if store
        .collection_name_taken(collection.owner_id, &name, Some(collection_id))
        .await?
    {
        return Err(ApiError::Conflict("Collection name already in use".into()));
    }
    Ok(store
        .update_collection(collection_id, CollectionUpdate { name, description })
        .await?)
}

/// Delete a collection (not its lists) once `confirm_name` matches its name.
pub async fn delete_collection(
    store: &dyn Store,
    collection_id: CollectionId,
    confirm_name: Option<&str>,
) -> ApiResult<()> {
    let confirm_name = confirm_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Confirmation name is required".into()))?;
    if !store
        .delete_collection_confirmed(collection_id, confirm_name)
        .await?
    {
        return Err(ApiError::Conflict(
            "Confirmation name did not match collection name".into(),
        ));
    }
    tracing::info!("Deleted collection {}", collection_id);
    Ok(())
}

/// Add every list in `raw_ids` the caller owns. Malformed, missing and foreign ids
/// are skipped. Returns how many lists were processed.
pub async fn add_lists(
    store: &dyn Store,
    codes: &ShareCodeAllocator,
    owner: UserId,
    collection_id: CollectionId,
    raw_ids: &[String],
) -> ApiResult<usize> {
    let mut added = 0;
    for raw in raw_ids {
        let Ok(list_id) = raw.trim().parse::<ListId>() else {
            tracing::warn!("Skipping malformed list id {:?}", raw);
            continue;
        };
        match permissions::user_owns_list(store, owner, list_id).await {
            Ok(true) => {}
            Ok(false) | Err(ApiError::NotFound(_)) => {
                tracing::warn!("User {} cannot add list {} to a collection", owner, list_id);
                continue;
            }
            Err(err) => return Err(err),
        }
        cascade::add_list_to_collection(store, codes, collection_id, list_id).await?;
        added += 1;
    }
    Ok(added)
}
