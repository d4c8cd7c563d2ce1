//! # Domain records for users, lists, collections and items
//!
//! Every type in this module is a plain value returned by (or handed to) a
//! [`crate::Store`] implementation. They are `Serialize` so the web layer can
//! answer JSON directly, and carry no behaviour beyond a few projections.
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`User`] | An account. Belongs to exactly one group; `admin` is scoped to that group, `instance_admin` is global. |
//! | [`List`] | A named list owned by one user, optionally published by share code and/or shared with the owner's group. |
//! | [`Collection`] | A named bundle of lists, with its own optional share code. |
//! | [`Item`] | An entry of a list. Inherits every access rule from its list. |
//! | [`GroupSharedList`] | A list another group member shares with the viewer's group, joined with its owner's name. |
//! | [`ResetToken`] | A single-use password reset token bound to an email address. |
//!
//! Share codes live in two columns (`List::share_code`, `Collection::share_code`) that
//! form one uniqueness domain; [`ShareTarget`] names which column a code is written to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type GroupId = i64;
pub type ListId = i64;
pub type CollectionId = i64;
pub type ItemId = i64;

/// A user account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub group_id: GroupId,
    pub email: String,
    pub name: String,
    pub admin: bool,
    pub instance_admin: bool,
    /// Argon2 PHC string. Absent for accounts created through an external identity.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub external: Option<ExternalLink>,
}

/// Fields needed to insert a user.
#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub group_id: GroupId,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub admin: bool,
    pub instance_admin: bool,
    pub external: Option<ExternalLink>,
}

/// A verified `(provider, subject)` pair from an external identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub provider: String,
    pub subject: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub share_code: Option<String>,
    pub share_with_group: bool,
    pub group_can_edit: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewList {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

/// Group visibility flags of a list. `group_can_edit` only matters when
/// `share_with_group` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSharing {
    pub share_with_group: bool,
    pub group_can_edit: bool,
}

/// Changes applied by [`crate::Store::update_list`]. `sharing` is left untouched when `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListUpdate {
    pub name: String,
    pub description: Option<String>,
    pub sharing: Option<GroupSharing>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub share_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewCollection {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CollectionUpdate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<i64>,
}

/// Item fields supplied by the caller on create and update.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<i64>,
}

/// A list shared with the viewer's group by another member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSharedList {
    pub id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub owner_name: String,
    pub group_can_edit: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResetToken {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The resource a share code is written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareTarget {
    List(ListId),
    Collection(CollectionId),
}

/// What [`Store::claim_share_code`](crate::Store::claim_share_code) did with a candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The candidate was written to the target.
    Claimed,
    /// Some list or collection already uses the candidate.
    Taken,
    /// The target already carries this code and was left untouched.
    AlreadyPublished(String),
}
