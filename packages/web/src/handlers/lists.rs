use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::{Form, Json};
use serde::Serialize;

use api::lists::{self, Dashboard, ListDetail, ListEdit, ListForm};
use api::{items, sharing, ApiResult, AppContext};
use store::{GroupSharedList, Item, ItemDraft, ItemId, List, ListId};

use super::NameQuery;
use crate::gate::CurrentUser;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCode {
    pub share_code: String,
}

pub async fn home() -> Redirect {
    Redirect::to("/list")
}

pub async fn dashboard(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(lists::dashboard(ctx.store(), user).await?))
}

pub async fn group_shared(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<GroupSharedList>>> {
    Ok(Json(lists::group_shared(ctx.store(), user).await?))
}

/// 409 when the caller already has a list with that name.
pub async fn name_check(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NameQuery>,
) -> ApiResult<StatusCode> {
    let name = query.name.unwrap_or_default();
    Ok(match lists::name_taken(ctx.store(), user, &name).await? {
        true => StatusCode::CONFLICT,
        false => StatusCode::OK,
    })
}

pub async fn create(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ListForm>,
) -> ApiResult<impl IntoResponse> {
    let list = lists::create_list(ctx.store(), user, form).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn detail(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(list_id): Path<ListId>,
) -> ApiResult<Json<ListDetail>> {
    Ok(Json(lists::detail(ctx.store(), user, list_id).await?))
}

pub async fn update(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(list_id): Path<ListId>,
    Json(edit): Json<ListEdit>,
) -> ApiResult<Json<List>> {
    Ok(Json(lists::update_list(ctx.store(), user, list_id, edit).await?))
}

/// The body is the list's name as a JSON string.
pub async fn delete(
    State(ctx): State<AppContext>,
    Path(list_id): Path<ListId>,
    Json(confirm_name): Json<String>,
) -> ApiResult<StatusCode> {
    lists::delete_list(ctx.store(), list_id, &confirm_name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn items(
    State(ctx): State<AppContext>,
    Path(list_id): Path<ListId>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(items::items(ctx.store(), list_id).await?))
}

pub async fn add_item(
    State(ctx): State<AppContext>,
    Path(list_id): Path<ListId>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<impl IntoResponse> {
    let item = items::add_item(ctx.store(), list_id, draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(ctx): State<AppContext>,
    Path((list_id, item_id)): Path<(ListId, ItemId)>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<Json<Item>> {
    Ok(Json(
        items::update_item(ctx.store(), list_id, item_id, draft).await?,
    ))
}

pub async fn delete_item(
    State(ctx): State<AppContext>,
    Path((list_id, item_id)): Path<(ListId, ItemId)>,
) -> ApiResult<StatusCode> {
    items::delete_item(ctx.store(), list_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish(
    State(ctx): State<AppContext>,
    Path(list_id): Path<ListId>,
) -> ApiResult<Json<ShareCode>> {
    let share_code = sharing::publish_list(ctx.store(), &ctx.codes, list_id).await?;
    Ok(Json(ShareCode { share_code }))
}

pub async fn unpublish(
    State(ctx): State<AppContext>,
    Path(list_id): Path<ListId>,
) -> ApiResult<StatusCode> {
    sharing::unpublish_list(ctx.store(), list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
