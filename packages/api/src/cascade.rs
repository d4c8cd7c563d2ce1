//! # Collection membership cascade
//!
//! Adding a list to a published collection publishes the list too, so every link
//! on the public collection page resolves. Removing a list never unpublishes it.
//! Neither operation checks ownership; callers guard that.

use store::{CollectionId, ListId, ShareTarget, Store};

use crate::error::ApiResult;
use crate::permissions;
use crate::share_code::ShareCodeAllocator;

/// Idempotent. Returns the code minted for the list, if one was.
pub async fn add_list_to_collection(
    store: &dyn Store,
    codes: &ShareCodeAllocator,
    collection_id: CollectionId,
    list_id: ListId,
) -> ApiResult<Option<String>> {
    let collection = permissions::collection(store, collection_id).await?;
    let list = permissions::list(store, list_id).await?;

    if store.add_membership(collection_id, list_id).await? {
        tracing::debug!("Added list {} to collection {}", list_id, collection_id);
    }

    if collection.share_code.is_some() && list.share_code.is_none() {
        let code = codes.allocate(store, ShareTarget::List(list_id)).await?;
        tracing::info!(
            "List {} published through published collection {}",
            list_id,
            collection_id
        );
        return Ok(Some(code));
    }
    Ok(None)
}

pub async fn remove_list_from_collection(
    store: &dyn Store,
    collection_id: CollectionId,
    list_id: ListId,
) -> ApiResult<()> {
    store.remove_membership(collection_id, list_id).await?;
    Ok(())
}
