use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Serialize;

use api::admin::{self, CreateUserForm, CreateUserOptions};
use api::{ApiResult, AppContext};
use store::{User, UserId};

use crate::gate::CurrentUser;

#[derive(Debug, Serialize)]
pub struct ListCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFlag {
    pub admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAdminFlag {
    pub instance_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct GroupSharing {
    pub enabled: bool,
}

pub async fn group_users(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(admin::group_users(ctx.store(), caller).await?))
}

pub async fn all_users(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(admin::all_users(ctx.store()).await?))
}

pub async fn create_user_options(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<CreateUserOptions>> {
    Ok(Json(admin::create_user_options(ctx.store(), caller).await?))
}

pub async fn create_user(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
    Form(form): Form<CreateUserForm>,
) -> ApiResult<impl IntoResponse> {
    let user = admin::create_user(ctx.store(), caller, form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_count(
    State(ctx): State<AppContext>,
    Path(target): Path<UserId>,
) -> ApiResult<Json<ListCount>> {
    let count = admin::list_count(ctx.store(), target).await?;
    Ok(Json(ListCount { count }))
}

pub async fn delete_user(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
    Path(target): Path<UserId>,
) -> ApiResult<StatusCode> {
    admin::delete_user(ctx.store(), caller, target).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_admin(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
    Path(target): Path<UserId>,
) -> ApiResult<Json<AdminFlag>> {
    let admin = admin::toggle_admin(ctx.store(), caller, target).await?;
    Ok(Json(AdminFlag { admin }))
}

pub async fn toggle_instance_admin(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
    Path(target): Path<UserId>,
) -> ApiResult<Json<InstanceAdminFlag>> {
    let instance_admin = admin::toggle_instance_admin(ctx.store(), caller, target).await?;
    Ok(Json(InstanceAdminFlag { instance_admin }))
}

pub async fn group_sharing(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<GroupSharing>> {
    let enabled = admin::group_sharing(ctx.store(), caller).await?;
    Ok(Json(GroupSharing { enabled }))
}

pub async fn toggle_group_sharing(
    State(ctx): State<AppContext>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<GroupSharing>> {
    let enabled = admin::toggle_group_sharing(ctx.store(), caller).await?;
    Ok(Json(GroupSharing { enabled }))
}
