//! Anonymous views of published lists and collections.
//!
//! An unknown code answers a 404 with a small JSON body naming the code, so the
//! front end can show its "nothing shared here" page instead of a bare error.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use api::sharing::{self, SharedList};
use api::{ApiError, AppContext};

#[derive(Debug, Serialize)]
pub struct NothingShared {
    pub error: &'static str,
    pub code: String,
}

fn not_shared(err: ApiError, what: &'static str, code: String) -> Response {
    match err {
        ApiError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(NothingShared { error: what, code }),
        )
            .into_response(),
        err => err.into_response(),
    }
}

pub async fn list(State(ctx): State<AppContext>, Path(code): Path<String>) -> Response {
    let found = sharing::shared_list(ctx.store(), &code).await;
    match found {
        Ok(list) => Json(list).into_response(),
        Err(err) => not_shared(err, "shared list not found", code),
    }
}

pub async fn list_items(State(ctx): State<AppContext>, Path(code): Path<String>) -> Response {
    let found = sharing::shared_list(ctx.store(), &code).await;
    match found {
        Ok(SharedList { items, .. }) => Json(items).into_response(),
        Err(err) => not_shared(err, "shared list not found", code),
    }
}

pub async fn collection(State(ctx): State<AppContext>, Path(code): Path<String>) -> Response {
    let found = sharing::shared_collection(ctx.store(), &code).await;
    match found {
        Ok(collection) => Json(collection).into_response(),
        Err(err) => not_shared(err, "shared collection not found", code),
    }
}

pub async fn list_in_collection(
    State(ctx): State<AppContext>,
    Path((collection_code, list_code)): Path<(String, String)>,
) -> Response {
    let found =
        sharing::shared_list_in_collection(ctx.store(), &collection_code, &list_code).await;
    match found {
        Ok(list) => Json(list).into_response(),
        Err(err) => not_shared(err, "shared list not found", list_code),
    }
}

pub async fn list_items_in_collection(
    State(ctx): State<AppContext>,
    Path((collection_code, list_code)): Path<(String, String)>,
) -> Response {
    let found =
        sharing::shared_list_in_collection(ctx.store(), &collection_code, &list_code).await;
    match found {
        Ok(SharedList { items, .. }) => Json(items).into_response(),
        Err(err) => not_shared(err, "shared list not found", list_code),
    }
}
