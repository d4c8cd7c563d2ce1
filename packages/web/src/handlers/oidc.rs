//! External sign-in through the configured [`IdentityVerifier`].
//!
//! `login` and `link` both park a [`PendingSignIn`] in the session and hand the
//! browser to the provider. `callback` consumes it: a plain sign-in upserts the
//! identity and signs that account in, a link attaches the identity to the account
//! that started it. Provider and verification failures go back to the login page
//! with `?error=oidc_failed`; a missing or mismatched `state` is a 400.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;

use api::auth::{self, IdentityVerifier, PendingSignIn, SESSION_PENDING_SIGN_IN_KEY};
use api::{ApiError, ApiResult, AppContext};
use store::UserId;

use super::auth::HOME_PATH;
use crate::gate::{session_data, session_error, sign_in, CurrentUser};

const FAILED_PATH: &str = "/auth?error=oidc_failed";

#[derive(Debug, Serialize)]
pub struct OidcStatus {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkStart {
    pub url: String,
}

fn verifier(ctx: &AppContext) -> ApiResult<Arc<dyn IdentityVerifier>> {
    ctx.verifier
        .clone()
        .ok_or_else(|| ApiError::NotFound("External sign-in is not configured".into()))
}

async fn begin(
    session: &Session,
    verifier: &dyn IdentityVerifier,
    link_to: Option<UserId>,
) -> ApiResult<String> {
    let pending = PendingSignIn::new(link_to);
    session
        .insert(SESSION_PENDING_SIGN_IN_KEY, &pending)
        .await
        .map_err(session_error)?;
    Ok(verifier.authorization_url(&pending.state))
}

fn failed() -> Response {
    Redirect::to(FAILED_PATH).into_response()
}

pub async fn status(State(ctx): State<AppContext>) -> Json<OidcStatus> {
    Json(OidcStatus {
        enabled: ctx.verifier.is_some(),
        provider: ctx.verifier.as_ref().map(|v| v.provider().to_string()),
    })
}

pub async fn login(State(ctx): State<AppContext>, session: Session) -> ApiResult<Redirect> {
    let verifier = verifier(&ctx)?;
    let url = begin(&session, verifier.as_ref(), None).await?;
    Ok(Redirect::temporary(&url))
}

pub async fn callback(
    State(ctx): State<AppContext>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let verifier = verifier(&ctx)?;
    let pending = session
        .remove::<PendingSignIn>(SESSION_PENDING_SIGN_IN_KEY)
        .await
        .map_err(session_error)?
        .ok_or_else(|| ApiError::BadRequest("Invalid session state".into()))?;
    pending.check(params.get("state").map(String::as_str), Utc::now())?;

    if let Some(error) = params.get("error") {
        tracing::warn!("Provider refused external sign-in: {}", error);
        return Ok(failed());
    }
    let code = params
        .get("code")
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".into()))?;
    let identity = match verifier.verify(code).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!("Could not verify external identity: {}", err);
            return Ok(failed());
        }
    };

    if let Some(user_id) = pending.link_to {
        if session_data(&session).await?.identity()? != user_id {
            return Err(ApiError::Unauthenticated);
        }
        auth::link_external_identity(ctx.store(), user_id, identity).await?;
        return Ok(Redirect::to(HOME_PATH).into_response());
    }

    let user = match auth::upsert_external_identity(ctx.store(), identity).await {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("External sign-in rejected: {}", err);
            return Ok(failed());
        }
    };
    sign_in(&session, user.id).await?;
    tracing::info!("User {} signed in through {}", user.id, verifier.provider());
    Ok(Redirect::to(HOME_PATH).into_response())
}

/// Start linking an identity to the caller; answers the URL to send the browser to.
pub async fn link(
    State(ctx): State<AppContext>,
    session: Session,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<LinkStart>> {
    let verifier = verifier(&ctx)?;
    let linked = ctx
        .store()
        .user(user_id)
        .await?
        .is_some_and(|user| user.external.is_some());
    if linked {
        return Err(ApiError::BadRequest(
            "An external identity is already linked".into(),
        ));
    }
    let url = begin(&session, verifier.as_ref(), Some(user_id)).await?;
    Ok(Json(LinkStart { url }))
}

pub async fn unlink(
    State(ctx): State<AppContext>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatusCode> {
    verifier(&ctx)?;
    auth::unlink_external_identity(ctx.store(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
