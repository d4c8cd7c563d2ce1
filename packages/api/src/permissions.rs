//! # Permission resolver
//!
//! Answers ownership, view and edit questions about one list or collection for one
//! user, always from fresh store reads.
//!
//! | Question | Rule |
//! |----------|------|
//! | owns list / collection | `owner_id == user` |
//! | can view list | owner, or `share_with_group` and same group as the owner |
//! | can edit list | owner, or viewable through the group and `group_can_edit` |
//! | can delete list | owner only |
//!
//! The group "sharing enabled" setting is not consulted here; it only
//! gates the dashboard roll-up (see [`crate::lists::dashboard`]).
//!
//! A missing list, collection or user surfaces as [`ApiError::NotFound`], never as `false`.

use store::{Collection, CollectionId, List, ListId, Store, UserId};

use crate::error::{ApiError, ApiResult};
use crate::groups;

pub(crate) async fn list(store: &dyn Store, id: ListId) -> ApiResult<List> {
    store
        .list(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("list {id} not found")))
}

pub(crate) async fn collection(store: &dyn Store, id: CollectionId) -> ApiResult<Collection> {
    store
        .collection(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("collection {id} not found")))
}

pub async fn user_owns_list(store: &dyn Store, user: UserId, list_id: ListId) -> ApiResult<bool> {
    Ok(list(store, list_id).await?.owner_id == user)
}

pub async fn user_owns_collection(
    store: &dyn Store,
    user: UserId,
    collection_id: CollectionId,
) -> ApiResult<bool> {
    Ok(collection(store, collection_id).await?.owner_id == user)
}

/// Non-owner access through group sharing.
async fn shared_through_group(store: &dyn Store, user: UserId, list: &List) -> ApiResult<bool> {
    if !list.share_with_group {
        return Ok(false);
    }
    let owner_group = groups::group_id_of(store, list.owner_id).await?;
    let user_group = groups::group_id_of(store, user).await?;
    Ok(owner_group == user_group)
}

pub async fn user_can_view_list(store: &dyn Store, user: UserId, list_id: ListId) -> ApiResult<bool> {
    let list = list(store, list_id).await?;
    if list.owner_id == user {
        return Ok(true);
    }
    shared_through_group(store, user, &list).await
}

pub async fn user_can_edit_list(store: &dyn Store, user: UserId, list_id: ListId) -> ApiResult<bool> {
    let list = list(store, list_id).await?;
    if list.owner_id == user {
        return Ok(true);
    }
    Ok(list.group_can_edit && shared_through_group(store, user, &list).await?)
}

/// Deletion is ownership-only, whatever the group flags say.
pub async fn user_can_delete_list(
    store: &dyn Store,
    user: UserId,
    list_id: ListId,
) -> ApiResult<bool> {
    user_owns_list(store, user, list_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{GroupSharing, ListUpdate, MemoryStore, NewList, NewUser};

    struct Fixture {
        store: MemoryStore,
        owner: UserId,
        peer: UserId,
        outsider: UserId,
        list: ListId,
    }

    async fn fixture(sharing: GroupSharing) -> Fixture {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for (group_id, email) in [(1, "owner@x.org"), (1, "peer@x.org"), (2, "out@x.org")] {
            let user = store
                .create_user(NewUser {
                    group_id,
                    email: email.into(),
                    name: email.into(),
                    password_hash: None,
                    admin: false,
                    instance_admin: false,
                    external: None,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let list = store
            .create_list(NewList {
                owner_id: ids[0],
                name: "Gifts".into(),
                description: None,
            })
            .await
            .unwrap();
        store
            .update_list(
                list.id,
                ListUpdate {
                    name: list.name.clone(),
                    description: None,
                    sharing: Some(sharing),
                },
            )
            .await
            .unwrap();
        Fixture {
            store,
            owner: ids[0],
            peer: ids[1],
            outsider: ids[2],
            list: list.id,
        }
    }

    #[tokio::test]
    async fn test_owner_has_every_right() {
        let f = fixture(GroupSharing::default()).await;
        assert!(user_owns_list(&f.store, f.owner, f.list).await.unwrap());
        assert!(user_can_view_list(&f.store, f.owner, f.list).await.unwrap());
        assert!(user_can_edit_list(&f.store, f.owner, f.list).await.unwrap());
        assert!(user_can_delete_list(&f.store, f.owner, f.list).await.unwrap());
        assert!(!user_owns_list(&f.store, f.peer, f.list).await.unwrap());
    }

    #[tokio::test]
    async fn test_unshared_list_is_private() {
        let f = fixture(GroupSharing::default()).await;
        assert!(!user_can_view_list(&f.store, f.peer, f.list).await.unwrap());
        assert!(!user_can_edit_list(&f.store, f.peer, f.list).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_view_without_edit() {
        let f = fixture(GroupSharing {
            share_with_group: true,
            group_can_edit: false,
        })
        .await;
        assert!(user_can_view_list(&f.store, f.peer, f.list).await.unwrap());
        assert!(!user_can_edit_list(&f.store, f.peer, f.list).await.unwrap());
        assert!(!user_can_view_list(&f.store, f.outsider, f.list).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_editor_cannot_delete() {
        let f = fixture(GroupSharing {
            share_with_group: true,
            group_can_edit: true,
        })
        .await;
        assert!(user_can_edit_list(&f.store, f.peer, f.list).await.unwrap());
        assert!(!user_can_delete_list(&f.store, f.peer, f.list).await.unwrap());
        assert!(!user_can_edit_list(&f.store, f.outsider, f.list).await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_flag_without_share_flag_grants_nothing() {
        let f = fixture(GroupSharing {
            share_with_group: false,
            group_can_edit: true,
        })
        .await;
        assert!(!user_can_edit_list(&f.store, f.peer, f.list).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_resources_are_not_found() {
        let f = fixture(GroupSharing::default()).await;
        assert!(matches!(
            user_can_view_list(&f.store, f.owner, 999).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            user_owns_collection(&f.store, f.owner, 999).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
