//! # Group & role model
//!
//! Read side over users and per-group settings. Every user belongs to exactly one
//! group; `admin` is scoped to that group while `instance_admin` spans all groups
//! and counts as admin everywhere.
//!
//! The group-admin rule, used by the `RequireGroupAdmin` guard:
//! the caller must be an admin, and must share the target's group unless the caller
//! is an instance admin.

use store::{GroupId, Store, User, UserId};

use crate::error::{ApiError, ApiResult};

pub(crate) async fn user(store: &dyn Store, id: UserId) -> ApiResult<User> {
    store
        .user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

/// Group admin, or instance admin (which implies admin in every group).
pub async fn is_group_admin(store: &dyn Store, id: UserId) -> ApiResult<bool> {
    let user = user(store, id).await?;
    Ok(user.admin || user.instance_admin)
}

pub async fn is_instance_admin(store: &dyn Store, id: UserId) -> ApiResult<bool> {
    Ok(user(store, id).await?.instance_admin)
}

pub async fn group_id_of(store: &dyn Store, id: UserId) -> ApiResult<GroupId> {
    Ok(user(store, id).await?.group_id)
}

pub async fn sharing_enabled_for(store: &dyn Store, group: GroupId) -> ApiResult<bool> {
    Ok(store.sharing_enabled(group).await?)
}

pub async fn set_sharing_enabled(store: &dyn Store, group: GroupId, enabled: bool) -> ApiResult<()> {
    store.set_sharing_enabled(group, enabled).await?;
    tracing::info!("Group {} sharing set to {}", group, enabled);
    Ok(())
}

/// Whether `caller` may administer `target` under the group-admin rule.
pub async fn can_manage_user(store: &dyn Store, caller: UserId, target: UserId) -> ApiResult<bool> {
    let caller = user(store, caller).await?;
    if !(caller.admin || caller.instance_admin) {
        return Ok(false);
    }
    let target = user(store, target).await?;
    if caller.instance_admin || caller.group_id == target.group_id {
        return Ok(true);
    }
    tracing::warn!(
        "Admin from group {} tried to access user from group {}",
        caller.group_id,
        target.group_id
    );
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, NewUser};

    async fn add(store: &MemoryStore, group_id: GroupId, admin: bool, instance_admin: bool) -> UserId {
        let n = store.all_users().await.unwrap().len();
        store
            .create_user(NewUser {
                group_id,
                email: format!("user{n}@x.org"),
                name: format!("user{n}"),
                password_hash: None,
                admin,
                instance_admin,
                external: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_group_admin_scope() {
        let store = MemoryStore::new();
        let a = add(&store, 1, true, false).await;
        let b = add(&store, 2, false, false).await;
        let c = add(&store, 1, false, false).await;
        let d = add(&store, 3, true, true).await;

        assert!(!can_manage_user(&store, a, b).await.unwrap());
        assert!(can_manage_user(&store, a, c).await.unwrap());
        assert!(can_manage_user(&store, d, b).await.unwrap());
        // Plain members manage nobody, not even themselves
        assert!(!can_manage_user(&store, c, c).await.unwrap());
    }

    #[tokio::test]
    async fn test_instance_admin_counts_as_group_admin() {
        let store = MemoryStore::new();
        let d = add(&store, 3, false, true).await;
        assert!(is_group_admin(&store, d).await.unwrap());
        assert!(is_instance_admin(&store, d).await.unwrap());
        assert_eq!(group_id_of(&store, d).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            is_group_admin(&store, 99).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sharing_toggle_upserts() {
        let store = MemoryStore::new();
        assert!(!sharing_enabled_for(&store, 5).await.unwrap());
        set_sharing_enabled(&store, 5, true).await.unwrap();
        set_sharing_enabled(&store, 5, true).await.unwrap();
        assert!(sharing_enabled_for(&store, 5).await.unwrap());
    }
}
