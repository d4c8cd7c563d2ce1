use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Serialize;

use api::collections::{self, CollectionDetail, CollectionForm};
use api::{cascade, sharing, ApiResult, AppContext};
use store::{Collection, CollectionId, ListId};

use super::lists::ShareCode;
use super::NameQuery;
use crate::gate::CurrentUser;

/// Form keys accepted for the bulk add; browsers may append `[]`.
const LIST_ID_KEYS: [&str; 2] = ["listIds", "listIds[]"];

#[derive(Debug, Serialize)]
pub struct Added {
    pub added: usize,
}

pub async fn owned(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Collection>>> {
    Ok(Json(collections::owned(ctx.store(), user).await?))
}

pub async fn create(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CollectionForm>,
) -> ApiResult<impl IntoResponse> {
    let collection = collections::create_collection(ctx.store(), user, form).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn name_check(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NameQuery>,
) -> ApiResult<StatusCode> {
    let name = query.name.unwrap_or_default();
    Ok(match collections::name_taken(ctx.store(), user, &name).await? {
        true => StatusCode::CONFLICT,
        false => StatusCode::OK,
    })
}

pub async fn detail(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<CollectionId>,
) -> ApiResult<Json<CollectionDetail>> {
    Ok(Json(collections::detail(ctx.store(), collection_id).await?))
}

pub async fn update(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<CollectionId>,
    Json(form): Json<CollectionForm>,
) -> ApiResult<StatusCode> {
    collections::update_collection(ctx.store(), collection_id, form).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<CollectionId>,
    Query(query): Query<NameQuery>,
) -> ApiResult<StatusCode> {
    collections::delete_collection(ctx.store(), collection_id, query.name.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_lists(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<CollectionId>,
    Form(fields): Form<Vec<(String, String)>>,
) -> ApiResult<Json<Added>> {
    let raw_ids: Vec<String> = fields
        .into_iter()
        .filter(|(key, _)| LIST_ID_KEYS.contains(&key.as_str()))
        .map(|(_, value)| value)
        .collect();
    let added =
        collections::add_lists(ctx.store(), &ctx.codes, user, collection_id, &raw_ids).await?;
    Ok(Json(Added { added }))
}

pub async fn add_list(
    State(ctx): State<AppContext>,
    Path((collection_id, list_id)): Path<(CollectionId, ListId)>,
) -> ApiResult<StatusCode> {
    cascade::add_list_to_collection(ctx.store(), &ctx.codes, collection_id, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_list(
    State(ctx): State<AppContext>,
    Path((collection_id, list_id)): Path<(CollectionId, ListId)>,
) -> ApiResult<StatusCode> {
    cascade::remove_list_from_collection(ctx.store(), collection_id, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<CollectionId>,
) -> ApiResult<Json<ShareCode>> {
    let share_code = sharing::publish_collection(ctx.store(), &ctx.codes, collection_id).await?;
    Ok(Json(ShareCode { share_code }))
}

pub async fn unpublish(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<CollectionId>,
) -> ApiResult<StatusCode> {
    sharing::unpublish_collection(ctx.store(), collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
