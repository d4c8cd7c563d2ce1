use store::{Item, ItemDraft, ItemId, ListId, Store};

use crate::error::{ApiError, ApiResult};

fn clean(mut draft: ItemDraft) -> ApiResult<ItemDraft> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    draft.url = draft.url.filter(|u| !u.trim().is_empty());
    draft.notes = draft.notes.filter(|n| !n.trim().is_empty());
    Ok(draft)
}

/// The item, provided it belongs to `list_id`.
async fn item_of(store: &dyn Store, list_id: ListId, item_id: ItemId) -> ApiResult<Item> {
    match store.item(item_id).await? {
        Some(item) if item.list_id == list_id => Ok(item),
        _ => Err(ApiError::NotFound(format!(
            "item {item_id} not found in list {list_id}"
        ))),
    }
}

pub async fn items(store: &dyn Store, list_id: ListId) -> ApiResult<Vec<Item>> {
    Ok(store.items(list_id).await?)
}

pub async fn add_item(store: &dyn Store, list_id: ListId, draft: ItemDraft) -> ApiResult<Item> {
    Ok(store.create_item(list_id, clean(draft)?).await?)
}

pub async fn update_item(
    store: &dyn Store,
    list_id: ListId,
    item_id: ItemId,
    draft: ItemDraft,
) -> ApiResult<Item> {
    let draft = clean(draft)?;
    item_of(store, list_id, item_id).await?;
    Ok(store.update_item(item_id, draft).await?)
}

pub async fn delete_item(store: &dyn Store, list_id: ListId, item_id: ItemId) -> ApiResult<()> {
    item_of(store, list_id, item_id).await?;
    Ok(store.delete_item(item_id).await?)
}
