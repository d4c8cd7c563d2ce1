use async_trait::async_trait;
use store::UserId;

use super::{Decision, Guard, GuardContext};
use crate::error::{ApiError, ApiResult};
use crate::{groups, permissions};

/// The session must name a signed-in user that still exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireAuth;

impl RequireAuth {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<UserId> {
        let id = cx.user_id()?;
        match cx.store.user(id).await? {
            Some(user) => Ok(user.id),
            None => Err(ApiError::Unauthenticated),
        }
    }
}

#[async_trait]
impl Guard for RequireAuth {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        match self.check(cx).await {
            Ok(_) => Decision::Continue,
            Err(err) => Decision::Reject(err),
        }
    }
}

/// Caller owns the list named by the path parameter.
#[derive(Clone, Copy, Debug)]
pub struct ListIdOwner(pub &'static str);

impl ListIdOwner {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let list = cx.param_id(self.0)?;
        permissions::user_owns_list(cx.store, cx.user_id()?, list).await
    }
}

#[async_trait]
impl Guard for ListIdOwner {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

/// Caller may view the list: owner or same-group member of a group-shared list.
#[derive(Clone, Copy, Debug)]
pub struct ListIdViewer(pub &'static str);

impl ListIdViewer {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let list = cx.param_id(self.0)?;
        permissions::user_can_view_list(cx.store, cx.user_id()?, list).await
    }
}

#[async_trait]
impl Guard for ListIdViewer {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListIdEditor(pub &'static str);

impl ListIdEditor {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let list = cx.param_id(self.0)?;
        permissions::user_can_edit_list(cx.store, cx.user_id()?, list).await
    }
}

#[async_trait]
impl Guard for ListIdEditor {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

/// Caller may delete the list. Group edit rights never extend to deletion.
#[derive(Clone, Copy, Debug)]
pub struct ListIdDeleter(pub &'static str);

impl ListIdDeleter {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let list = cx.param_id(self.0)?;
        permissions::user_can_delete_list(cx.store, cx.user_id()?, list).await
    }
}

#[async_trait]
impl Guard for ListIdDeleter {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CollectionIdOwner(pub &'static str);

impl CollectionIdOwner {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let collection = cx.param_id(self.0)?;
        permissions::user_owns_collection(cx.store, cx.user_id()?, collection).await
    }
}

#[async_trait]
impl Guard for CollectionIdOwner {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequireAdmin;

impl RequireAdmin {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        groups::is_group_admin(cx.store, cx.user_id()?).await
    }
}

#[async_trait]
impl Guard for RequireAdmin {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

/// Caller is an admin of the target user's group, or an instance admin.
#[derive(Clone, Copy, Debug)]
pub struct RequireGroupAdmin(pub &'static str);

impl RequireGroupAdmin {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        let caller = cx.user_id()?;
        if !groups::is_group_admin(cx.store, caller).await? {
            return Ok(false);
        }
        let target = cx.param_id(self.0)?;
        groups::can_manage_user(cx.store, caller, target).await
    }
}

#[async_trait]
impl Guard for RequireGroupAdmin {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequireInstanceAdmin;

impl RequireInstanceAdmin {
    async fn check(&self, cx: &GuardContext<'_>) -> ApiResult<bool> {
        groups::is_instance_admin(cx.store, cx.user_id()?).await
    }
}

#[async_trait]
impl Guard for RequireInstanceAdmin {
    async fn admit(&self, cx: &GuardContext<'_>) -> Decision {
        Decision::from_check(self.check(cx).await)
    }
}
