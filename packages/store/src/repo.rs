//! # Store: the persistence seam of the list-sharing service
//!
//! [`Store`] is the one async interface every higher layer talks to. The `api`
//! crate ships a PostgreSQL implementation; [`crate::MemoryStore`] implements the
//! same contract in memory for tests.
//!
//! ## Contract
//!
//! - Lookups by id return `Ok(None)` for a missing row; mutations of a missing row
//!   return [`StoreError::NotFound`](crate::StoreError::NotFound).
//! - `create_*` enforces name uniqueness per owner and email uniqueness per
//!   instance with [`StoreError::Conflict`](crate::StoreError::Conflict).
//! - Share codes are unique across lists **and** collections.
//!   [`claim_share_code`](Store::claim_share_code) checks both columns and writes
//!   the code as one atomic step, so two concurrent claims can never both win. A
//!   target that already has a code keeps it.
//! - `create_user_in_new_group` and `create_first_admin` decide and insert
//!   atomically: concurrent callers never share a new group or both bootstrap.
//! - `delete_*_confirmed` compares the confirmation name and deletes in one
//!   transaction; a mismatch leaves everything intact.
//! - Deleting a list removes its items and memberships; deleting a collection
//!   removes its memberships only; deleting a user removes everything they own.
//!
//! ## Method groups
//!
//! | Group | Methods |
//! |-------|---------|
//! | Users | `user`, `user_by_email`, `user_by_external`, `create_user`, `create_user_in_new_group`, `create_first_admin`, `delete_user`, `set_admin`, `set_instance_admin`, `set_password`, `link_external`, `unlink_external`, `users_in_group`, `all_users`, `group_admins`, `admin_exists` |
//! | Groups | `sharing_enabled`, `set_sharing_enabled` |
//! | Lists | `list`, `lists_owned_by`, `count_lists`, `list_name_taken`, `create_list`, `update_list`, `delete_list_confirmed`, `list_by_share_code`, `clear_list_share_code`, `group_shared_lists` |
//! | Collections | `collection`, `collections_owned_by`, `collection_name_taken`, `create_collection`, `update_collection`, `delete_collection_confirmed`, `collection_by_share_code`, `clear_collection_share_code` |
//! | Membership | `add_membership`, `remove_membership`, `membership_exists`, `collection_list_ids`, `collection_lists` |
//! | Share codes | `claim_share_code` |
//! | Items | `items`, `item`, `create_item`, `update_item`, `delete_item` |
//! | Reset tokens | `replace_reset_token`, `reset_token`, `delete_reset_token` |

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::*;

#[async_trait]
pub trait Store: Send + Sync {
    // users

    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_external(&self, provider: &str, subject: &str)
        -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Insert `user` into a group no one else is in yet, ignoring `user.group_id`.
    /// Picking the group and inserting are one atomic step.
    async fn create_user_in_new_group(&self, user: NewUser) -> StoreResult<User>;
    /// Insert `user` only while no admin exists. Returns `None` when one already does.
    async fn create_first_admin(&self, user: NewUser) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
    async fn set_admin(&self, id: UserId, admin: bool) -> StoreResult<()>;
    async fn set_instance_admin(&self, id: UserId, instance_admin: bool) -> StoreResult<()>;
    async fn set_password(&self, id: UserId, password_hash: &str) -> StoreResult<()>;
    /// Attach an external identity and refresh the display name.
    async fn link_external(&self, id: UserId, link: ExternalLink, name: &str) -> StoreResult<()>;
    async fn unlink_external(&self, id: UserId) -> StoreResult<()>;
    async fn users_in_group(&self, group: GroupId) -> StoreResult<Vec<User>>;
    async fn all_users(&self) -> StoreResult<Vec<User>>;
    /// Every user with the group-admin flag, across all groups.
    async fn group_admins(&self) -> StoreResult<Vec<User>>;
    async fn admin_exists(&self) -> StoreResult<bool>;

    // groups

    /// Defaults to `false` when the group has no settings row.
    async fn sharing_enabled(&self, group: GroupId) -> StoreResult<bool>;
    /// Upsert; never fails because the row is missing.
    async fn set_sharing_enabled(&self, group: GroupId, enabled: bool) -> StoreResult<()>;

    // lists

    async fn list(&self, id: ListId) -> StoreResult<Option<List>>;
    async fn lists_owned_by(&self, owner: UserId) -> StoreResult<Vec<List>>;
    async fn count_lists(&self, owner: UserId) -> StoreResult<i64>;
    async fn list_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<ListId>,
    ) -> StoreResult<bool>;
    async fn create_list(&self, list: NewList) -> StoreResult<List>;
    async fn update_list(&self, id: ListId, update: ListUpdate) -> StoreResult<List>;
    /// Returns `false` (and deletes nothing) when `confirm_name` does not match.
    async fn delete_list_confirmed(&self, id: ListId, confirm_name: &str) -> StoreResult<bool>;
    async fn list_by_share_code(&self, code: &str) -> StoreResult<Option<List>>;
    async fn clear_list_share_code(&self, id: ListId) -> StoreResult<()>;
    /// Lists other members of `viewer`'s group share with it, ordered by owner then list name.
    async fn group_shared_lists(&self, viewer: UserId) -> StoreResult<Vec<GroupSharedList>>;

    // collections

    async fn collection(&self, id: CollectionId) -> StoreResult<Option<Collection>>;
    async fn collections_owned_by(&self, owner: UserId) -> StoreResult<Vec<Collection>>;
    async fn collection_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<CollectionId>,
    ) -> StoreResult<bool>;
    async fn create_collection(&self, collection: NewCollection) -> StoreResult<Collection>;
    async fn update_collection(
        &self,
        id: CollectionId,
        update: CollectionUpdate,
    ) -> StoreResult<Collection>;
    async fn delete_collection_confirmed(
        &self,
        id: CollectionId,
        confirm_name: &str,
    ) -> StoreResult<bool>;
    async fn collection_by_share_code(&self, code: &str) -> StoreResult<Option<Collection>>;
    async fn clear_collection_share_code(&self, id: CollectionId) -> StoreResult<()>;

    // membership

    /// Returns `true` when a new row was inserted.
    async fn add_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<bool>;
    async fn remove_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<()>;
    async fn membership_exists(&self, collection: CollectionId, list: ListId)
        -> StoreResult<bool>;
    async fn collection_list_ids(&self, collection: CollectionId) -> StoreResult<Vec<ListId>>;
    /// Member lists ordered by name.
    async fn collection_lists(&self, collection: CollectionId) -> StoreResult<Vec<List>>;

    // share codes

    /// Write `code` to `target` unless the target already has a code or `code` is used
    /// by any list or collection. Both checks and the write are one atomic step.
    async fn claim_share_code(&self, target: ShareTarget, code: &str)
        -> StoreResult<ClaimOutcome>;

    // items

    async fn items(&self, list: ListId) -> StoreResult<Vec<Item>>;
    async fn item(&self, id: ItemId) -> StoreResult<Option<Item>>;
    async fn create_item(&self, list: ListId, draft: ItemDraft) -> StoreResult<Item>;
    async fn update_item(&self, id: ItemId, draft: ItemDraft) -> StoreResult<Item>;
    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;

    // password reset

    /// Store `token`, dropping any earlier token for the same email.
    async fn replace_reset_token(&self, token: ResetToken) -> StoreResult<()>;
    async fn reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>>;
    async fn delete_reset_token(&self, token: &str) -> StoreResult<()>;
}
