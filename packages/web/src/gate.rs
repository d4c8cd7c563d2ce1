//! Per-route guard enforcement.
//!
//! Every protected route carries a [`Gate`]: the guard [`Chain`] for that route plus
//! its [`RouteClass`]. The class only changes what an unauthenticated caller sees.
//! Browser pages redirect to the login page, API endpoints answer 401.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

use api::auth::{SessionData, SESSION_AUTHENTICATED_KEY, SESSION_USER_ID_KEY};
use api::guard::{Chain, Decision, GuardContext};
use api::{ApiError, ApiResult, AppContext};
use store::UserId;

pub const LOGIN_PATH: &str = "/auth";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Page,
    Api,
}

#[derive(Clone)]
pub struct Gate {
    pub ctx: AppContext,
    pub chain: Chain,
    pub class: RouteClass,
}

pub(crate) fn session_error(err: tower_sessions::session::Error) -> ApiError {
    ApiError::Unexpected(format!("session error: {err}"))
}

/// Read the sign-in state stored in the session. A fresh session is signed out.
pub async fn session_data(session: &Session) -> ApiResult<SessionData> {
    let authenticated = session
        .get::<bool>(SESSION_AUTHENTICATED_KEY)
        .await
        .map_err(session_error)?
        .unwrap_or(false);
    let user_id = session
        .get::<UserId>(SESSION_USER_ID_KEY)
        .await
        .map_err(session_error)?;
    Ok(SessionData {
        authenticated,
        user_id,
    })
}

/// Mark the session as signed in as `user_id`, under a fresh session id.
pub async fn sign_in(session: &Session, user_id: UserId) -> ApiResult<()> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_AUTHENTICATED_KEY, true)
        .await
        .map_err(session_error)?;
    session
        .insert(SESSION_USER_ID_KEY, user_id)
        .await
        .map_err(session_error)?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> ApiResult<()> {
    session.flush().await.map_err(session_error)
}

pub async fn enforce(
    State(gate): State<Gate>,
    session: Session,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let data = match session_data(&session).await {
        Ok(data) => data,
        Err(err) => return err.into_response(),
    };
    let params: HashMap<String, String> = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let cx = GuardContext::new(gate.ctx.store(), &data, &params);

    match gate.chain.admit(&cx).await {
        Decision::Continue => next.run(request).await,
        Decision::Reject(ApiError::Unauthenticated) if gate.class == RouteClass::Page => {
            Redirect::to(LOGIN_PATH).into_response()
        }
        Decision::Reject(err) => err.into_response(),
    }
}

/// The signed-in caller. Only used behind a gate, which already checked the session.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| ApiError::Unexpected(reason.to_string()))?;
        let data = session_data(&session).await?;
        Ok(Self(data.identity()?))
    }
}
