//! # User administration
//!
//! Group admins manage the users of their own group; instance admins manage
//! everyone. The route guards (`RequireAdmin`, `RequireGroupAdmin`,
//! `RequireInstanceAdmin`) decide who gets here. This module adds the rules that
//! depend on the request body:
//!
//! - nobody toggles their own admin or instance-admin flag;
//! - new users are never instance admins;
//! - an instance admin creating a user picks a fresh group (the user becomes its
//!   admin) or the group of an existing group admin.

use serde::{Deserialize, Serialize};
use store::{NewUser, Store, User, UserId};

use crate::auth::{hash_password, AccountForm};
use crate::error::{ApiError, ApiResult};
use crate::groups;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserForm {
    #[serde(flatten)]
    pub account: AccountForm,
    /// Checkbox value; `"on"` when ticked.
    #[serde(default)]
    pub admin: Option<String>,
    #[serde(default)]
    pub user_creation_type: Option<String>,
    #[serde(default)]
    pub existing_group_admin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserOptions {
    pub instance_admin: bool,
    pub group_admins: Vec<User>,
}

pub async fn group_users(store: &dyn Store, caller: UserId) -> ApiResult<Vec<User>> {
    let group = groups::group_id_of(store, caller).await?;
    Ok(store.users_in_group(group).await?)
}

pub async fn all_users(store: &dyn Store) -> ApiResult<Vec<User>> {
    Ok(store.all_users().await?)
}

/// What the create-user form offers the caller.
pub async fn create_user_options(store: &dyn Store, caller: UserId) -> ApiResult<CreateUserOptions> {
    let instance_admin = groups::is_instance_admin(store, caller).await?;
    let group_admins = if instance_admin {
        store.group_admins().await?
    } else {
        Vec::new()
    };
    Ok(CreateUserOptions {
        instance_admin,
        group_admins,
    })
}

pub async fn create_user(store: &dyn Store, caller: UserId, form: CreateUserForm) -> ApiResult<User> {
    let mut admin = form.admin.as_deref() == Some("on");

    // `None` means a fresh group, picked when the user is inserted
    let group_id = if groups::is_instance_admin(store, caller).await? {
        match form.user_creation_type.as_deref() {
            Some("newGroup") => {
                admin = true;
                None
            }
            Some("existingGroup") => {
                let raw = form
                    .existing_group_admin
                    .as_deref()
                    .filter(|raw| !raw.is_empty())
                    .ok_or_else(|| ApiError::BadRequest("No group selected".into()))?;
                let admin_id: UserId = raw
                    .parse()
                    .map_err(|_| ApiError::BadRequest("Invalid group selection".into()))?;
                match store.user(admin_id).await? {
                    Some(user) if user.admin => Some(user.group_id),
                    _ => return Err(ApiError::BadRequest("Invalid group selection".into())),
                }
            }
            _ => return Err(ApiError::BadRequest("Invalid user creation type".into())),
        }
    } else {
        Some(groups::group_id_of(store, caller).await?)
    };

    let (email, name) = form.account.validate()?;
    if store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("A user with this email already exists".into()));
    }
    let new_user = NewUser {
        group_id: group_id.unwrap_or_default(),
        email,
        name,
        password_hash: Some(hash_password(&form.account.password)?),
        admin,
        instance_admin: false,
        external: None,
    };
    let user = match group_id {
        Some(_) => store.create_user(new_user).await?,
        None => store.create_user_in_new_group(new_user).await?,
    };
    tracing::info!("User {} created user {} in group {}", caller, user.id, user.group_id);
    Ok(user)
}

pub async fn list_count(store: &dyn Store, target: UserId) -> ApiResult<i64> {
    Ok(store.count_lists(target).await?)
}

pub async fn delete_user(store: &dyn Store, caller: UserId, target: UserId) -> ApiResult<()> {
    store.delete_user(target).await?;
    tracing::info!("User {} deleted user {}", caller, target);
    Ok(())
}

/// Flip `target`'s group-admin flag. Returns the new value.
pub async fn toggle_admin(store: &dyn Store, caller: UserId, target: UserId) -> ApiResult<bool> {
    if caller == target {
        return Err(ApiError::Forbidden(
            "Cannot change your own admin status".into(),
        ));
    }
    let user = groups::user(store, target).await?;
    store.set_admin(target, !user.admin).await?;
    Ok(!user.admin)
}

/// Flip `target`'s instance-admin flag. Returns the new value.
pub async fn toggle_instance_admin(
    store: &dyn Store,
    caller: UserId,
    target: UserId,
) -> ApiResult<bool> {
    if caller == target {
        return Err(ApiError::Forbidden(
            "Cannot change your own instance admin status".into(),
        ));
    }
    let user = groups::user(store, target).await?;
    store.set_instance_admin(target, !user.instance_admin).await?;
    tracing::warn!(
        "User {} set instance admin of user {} to {}",
        caller,
        target,
        !user.instance_admin
    );
    Ok(!user.instance_admin)
}

pub async fn group_sharing(store: &dyn Store, caller: UserId) -> ApiResult<bool> {
    let group = groups::group_id_of(store, caller).await?;
    groups::sharing_enabled_for(store, group).await
}

/// Flip the caller's group sharing setting. Returns the new value.
pub async fn toggle_group_sharing(store: &dyn Store, caller: UserId) -> ApiResult<bool> {
    let group = groups::group_id_of(store, caller).await?;
    let enabled = !groups::sharing_enabled_for(store, group).await?;
    groups::set_sharing_enabled(store, group, enabled).await?;
    Ok(enabled)
}
